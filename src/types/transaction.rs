//! Transaction data structures for PaySim-style anomaly scoring

use serde::Serialize;

/// Transaction type as known to the trained model.
///
/// Discriminants are the integer codes the model was fit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionType {
    CashIn = 0,
    CashOut = 1,
    Debit = 2,
    #[default]
    Payment = 3,
    Transfer = 4,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::CashIn,
        TransactionType::CashOut,
        TransactionType::Debit,
        TransactionType::Payment,
        TransactionType::Transfer,
    ];

    /// Classify a free-form type string.
    ///
    /// Matching ignores case, spaces and underscores. Missing, empty and
    /// unrecognised values all fall back to `Payment`; they are never rejected.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return TransactionType::Payment;
        };

        let key: String = raw
            .to_uppercase()
            .chars()
            .filter(|c| *c != ' ' && *c != '_')
            .collect();

        match key.as_str() {
            "CASHIN" => TransactionType::CashIn,
            "CASHOUT" => TransactionType::CashOut,
            "DEBIT" => TransactionType::Debit,
            "PAYMENT" => TransactionType::Payment,
            "TRANSFER" => TransactionType::Transfer,
            _ => TransactionType::Payment,
        }
    }

    /// Integer code fed to the model
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Canonical dataset spelling
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::CashIn => "CASH_IN",
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Transfer => "TRANSFER",
        }
    }
}

/// Encode a raw type string into the model's integer code (0..=4)
pub fn encode_type(raw: Option<&str>) -> u8 {
    TransactionType::classify(raw).code()
}

/// A transaction whose seven required fields are present and whose numeric
/// fields are finite.
///
/// Values are kept exactly as received; no range checks are applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedTransaction {
    /// Simulation time unit
    pub step: f64,

    /// Type exactly as received (`None` when the input held null)
    #[serde(rename = "type")]
    pub raw_type: Option<String>,

    pub amount: f64,

    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_org: f64,

    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,

    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,

    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
}

impl ValidatedTransaction {
    /// Create a transaction with zero balances
    pub fn new(step: f64, raw_type: Option<&str>, amount: f64) -> Self {
        Self {
            step,
            raw_type: raw_type.map(str::to_string),
            amount,
            old_balance_org: 0.0,
            new_balance_orig: 0.0,
            old_balance_dest: 0.0,
            new_balance_dest: 0.0,
        }
    }

    /// Set the four balance fields
    pub fn with_balances(
        mut self,
        old_balance_org: f64,
        new_balance_orig: f64,
        old_balance_dest: f64,
        new_balance_dest: f64,
    ) -> Self {
        self.old_balance_org = old_balance_org;
        self.new_balance_orig = new_balance_orig;
        self.old_balance_dest = old_balance_dest;
        self.new_balance_dest = new_balance_dest;
        self
    }

    /// Classified transaction type
    pub fn transaction_type(&self) -> TransactionType {
        TransactionType::classify(self.raw_type.as_deref())
    }

    /// Step as stored by the persistence layer (truncated toward zero)
    pub fn step_as_int(&self) -> i64 {
        self.step.trunc() as i64
    }
}
