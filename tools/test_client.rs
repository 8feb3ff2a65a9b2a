//! Test Transaction Client
//!
//! Generates PaySim-style transactions and posts them to the scoring API.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Request body matching the `/predict` endpoint
#[derive(Debug, Clone, Serialize)]
struct Transaction {
    step: u32,
    #[serde(rename = "type")]
    tx_type: String,
    amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    old_balance_org: f64,
    #[serde(rename = "newbalanceOrig")]
    new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    new_balance_dest: f64,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    id: i64,
    status: String,
    anomaly_score: Option<f64>,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    step: u32,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            step: 1,
        }
    }

    /// Advance the simulated hour now and then
    fn next_step(&mut self) -> u32 {
        if self.rng.gen_bool(0.05) {
            self.step += 1;
        }
        self.step
    }

    /// Small transfer with balances that add up on both sides
    fn generate_legitimate(&mut self) -> Transaction {
        let step = self.next_step();
        let tx_type = self.random_choice(&["PAYMENT", "PAYMENT", "CASH_IN", "DEBIT"]);
        let old_balance_org: f64 = self.rng.gen_range(1000.0..50000.0);
        let amount = (old_balance_org * self.rng.gen_range(0.01..0.2)).round();

        let (old_balance_dest, new_balance_dest) = if tx_type == "PAYMENT" {
            // Merchant accounts carry no balance in PaySim
            (0.0, 0.0)
        } else {
            let dest: f64 = self.rng.gen_range(0.0..100000.0);
            (dest, dest + amount)
        };

        let new_balance_orig = if tx_type == "CASH_IN" {
            old_balance_org + amount
        } else {
            old_balance_org - amount
        };

        Transaction {
            step,
            tx_type: tx_type.to_string(),
            amount,
            old_balance_org,
            new_balance_orig,
            old_balance_dest,
            new_balance_dest,
        }
    }

    /// Account drained by a transfer or cash-out the destination never sees
    fn generate_suspicious(&mut self) -> Transaction {
        let step = self.next_step();
        let old_balance_org: f64 = self.rng.gen_range(100000.0..5000000.0);

        Transaction {
            step,
            tx_type: self.random_choice(&["TRANSFER", "CASH_OUT"]).to_string(),
            amount: old_balance_org,
            old_balance_org,
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0,
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or("http://localhost:5000");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        base_url = %base_url,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let health_url = format!("{base_url}/health");
    match client.get(&health_url).send().await {
        Ok(resp) => {
            let health: serde_json::Value = resp.json().await?;
            info!(status = %health["status"], "Connected to scoring service");
        }
        Err(e) => {
            warn!(error = %e, "Scoring service unreachable. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    }

    let predict_url = format!("{base_url}/predict");
    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to send {} transactions...", count);

    let mut sent_suspicious = 0;
    let mut flagged = 0;
    let mut unknown = 0;
    let mut rejected = 0;

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            sent_suspicious += 1;
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let resp = client.post(&predict_url).json(&transaction).send().await?;
        if resp.status().is_success() {
            let verdict: PredictResponse = resp.json().await?;
            match verdict.status.as_str() {
                "Suspicious" => {
                    flagged += 1;
                    info!(
                        id = verdict.id,
                        tx_type = %transaction.tx_type,
                        amount = transaction.amount,
                        anomaly_score = ?verdict.anomaly_score,
                        "Transaction flagged"
                    );
                }
                "Unknown" => unknown += 1,
                _ => {}
            }
        } else {
            rejected += 1;
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Transaction rejected");
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} transactions ({} flagged, {} unknown)",
                i + 1,
                count,
                flagged,
                unknown
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} transactions ({} generated as suspicious, {} flagged, {} unknown, {} rejected)",
        count, sent_suspicious, flagged, unknown, rejected
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no scoring service)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let json = serde_json::to_string_pretty(&transaction)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
