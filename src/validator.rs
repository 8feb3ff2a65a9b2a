//! Presence and numeric validation of raw transaction input.

use crate::error::FieldError;
use crate::types::transaction::ValidatedTransaction;
use serde_json::{Map, Value};

/// Required input fields, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "step",
    "type",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
];

/// Validates raw JSON input into a [`ValidatedTransaction`].
///
/// All fields are checked for presence before any numeric conversion, so a
/// missing field is always reported ahead of a malformed one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldValidator;

impl FieldValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a raw input mapping.
    pub fn validate(
        &self,
        input: &Map<String, Value>,
    ) -> Result<ValidatedTransaction, FieldError> {
        if let Some(missing) = REQUIRED_FIELDS
            .into_iter()
            .find(|f| !input.contains_key(*f))
        {
            return Err(FieldError::MissingField(missing));
        }

        Ok(ValidatedTransaction {
            step: numeric_field(input, "step")?,
            raw_type: type_field(input),
            amount: numeric_field(input, "amount")?,
            old_balance_org: numeric_field(input, "oldbalanceOrg")?,
            new_balance_orig: numeric_field(input, "newbalanceOrig")?,
            old_balance_dest: numeric_field(input, "oldbalanceDest")?,
            new_balance_dest: numeric_field(input, "newbalanceDest")?,
        })
    }
}

fn numeric_field(input: &Map<String, Value>, name: &'static str) -> Result<f64, FieldError> {
    input
        .get(name)
        .and_then(to_number)
        .filter(|v| v.is_finite())
        .ok_or(FieldError::InvalidNumericField(name))
}

/// `type` is passed through untouched; non-string values keep their JSON text.
fn type_field(input: &Map<String, Value>) -> Option<String> {
    match input.get("type") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Lenient real-number conversion of a JSON value.
///
/// Numbers, numeric strings (surrounding whitespace and single `_` digit
/// separators allowed) and booleans convert; null, arrays, objects and other
/// strings do not. Out-of-range literals such as `1e400` come back infinite.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().or_else(|| parse_float(&n.to_string())),
        Value::String(s) => parse_float(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim();
    if !text.contains('_') {
        return text.parse().ok();
    }

    // An underscore is only valid with a digit on each side
    let bytes = text.as_bytes();
    let mut digits = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if c != '_' {
            digits.push(c);
            continue;
        }
        let between_digits = i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if !between_digits {
            return None;
        }
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_input() -> Map<String, Value> {
        match json!({
            "step": 1,
            "type": "PAYMENT",
            "amount": 1000,
            "oldbalanceOrg": 5000,
            "newbalanceOrig": 4000,
            "oldbalanceDest": 0,
            "newbalanceDest": 1000
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_valid_input() {
        let tx = FieldValidator::new().validate(&valid_input()).unwrap();

        assert_eq!(tx.step, 1.0);
        assert_eq!(tx.raw_type.as_deref(), Some("PAYMENT"));
        assert_eq!(tx.amount, 1000.0);
        assert_eq!(tx.old_balance_org, 5000.0);
        assert_eq!(tx.new_balance_orig, 4000.0);
        assert_eq!(tx.old_balance_dest, 0.0);
        assert_eq!(tx.new_balance_dest, 1000.0);
    }

    #[test]
    fn test_each_missing_field_is_named() {
        let validator = FieldValidator::new();
        for field in REQUIRED_FIELDS {
            let mut input = valid_input();
            input.remove(field);
            assert_eq!(
                validator.validate(&input),
                Err(FieldError::MissingField(field)),
                "removing {field}"
            );
        }
    }

    #[test]
    fn test_first_missing_field_wins() {
        let mut input = valid_input();
        input.remove("newbalanceDest");
        input.remove("amount");
        input.remove("type");

        assert_eq!(
            FieldValidator::new().validate(&input),
            Err(FieldError::MissingField("type"))
        );
        assert_eq!(
            FieldValidator::new().validate(&Map::new()),
            Err(FieldError::MissingField("step"))
        );
    }

    #[test]
    fn test_missing_reported_before_invalid() {
        let mut input = valid_input();
        input.insert("step".to_string(), json!("abc"));
        input.remove("newbalanceDest");

        assert_eq!(
            FieldValidator::new().validate(&input),
            Err(FieldError::MissingField("newbalanceDest"))
        );
    }

    #[test]
    fn test_each_non_numeric_field_is_named() {
        let validator = FieldValidator::new();
        for field in REQUIRED_FIELDS.into_iter().filter(|f| *f != "type") {
            for bad in [json!("abc"), json!(null), json!({}), json!([1]), json!("")] {
                let mut input = valid_input();
                input.insert(field.to_string(), bad.clone());
                assert_eq!(
                    validator.validate(&input),
                    Err(FieldError::InvalidNumericField(field)),
                    "{field} = {bad}"
                );
            }
        }
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let validator = FieldValidator::new();
        for bad in ["nan", "NaN", "inf", "-infinity"] {
            let mut input = valid_input();
            input.insert("amount".to_string(), json!(bad));
            assert_eq!(
                validator.validate(&input),
                Err(FieldError::InvalidNumericField("amount"))
            );
        }
    }

    #[test]
    fn test_lenient_numeric_conversion() {
        let mut input = valid_input();
        input.insert("step".to_string(), json!(" 12 "));
        input.insert("amount".to_string(), json!("1e3"));
        input.insert("oldbalanceOrg".to_string(), json!(".5"));
        input.insert("newbalanceOrig".to_string(), json!(true));
        input.insert("oldbalanceDest".to_string(), json!(false));

        let tx = FieldValidator::new().validate(&input).unwrap();
        assert_eq!(tx.step, 12.0);
        assert_eq!(tx.amount, 1000.0);
        assert_eq!(tx.old_balance_org, 0.5);
        assert_eq!(tx.new_balance_orig, 1.0);
        assert_eq!(tx.old_balance_dest, 0.0);
    }

    #[test]
    fn test_digit_separators() {
        let validator = FieldValidator::new();

        let mut input = valid_input();
        input.insert("amount".to_string(), json!("1_000"));
        input.insert("oldbalanceOrg".to_string(), json!(" 2_500.5 "));
        let tx = validator.validate(&input).unwrap();
        assert_eq!(tx.amount, 1000.0);
        assert_eq!(tx.old_balance_org, 2500.5);

        for bad in ["1__000", "_1", "1_", "1_.5", "_"] {
            let mut input = valid_input();
            input.insert("amount".to_string(), json!(bad));
            assert_eq!(
                validator.validate(&input),
                Err(FieldError::InvalidNumericField("amount")),
                "amount = {bad}"
            );
        }
    }

    #[test]
    fn test_out_of_range_literal_is_invalid_numeric() {
        let body = r#"{"step": 1, "type": "PAYMENT", "amount": 1e400,
            "oldbalanceOrg": 5000, "newbalanceOrig": 4000,
            "oldbalanceDest": 0, "newbalanceDest": 1000}"#;
        let input: Map<String, Value> = serde_json::from_str(body).unwrap();

        assert_eq!(
            FieldValidator::new().validate(&input),
            Err(FieldError::InvalidNumericField("amount"))
        );
    }

    #[test]
    fn test_negative_values_accepted() {
        let mut input = valid_input();
        input.insert("step".to_string(), json!(-3));
        input.insert("amount".to_string(), json!(-250.75));
        input.insert("newbalanceOrig".to_string(), json!("-10"));

        let tx = FieldValidator::new().validate(&input).unwrap();
        assert_eq!(tx.step, -3.0);
        assert_eq!(tx.amount, -250.75);
        assert_eq!(tx.new_balance_orig, -10.0);
    }

    #[test]
    fn test_type_is_not_numeric_validated() {
        let validator = FieldValidator::new();

        let mut input = valid_input();
        input.insert("type".to_string(), json!(null));
        assert_eq!(validator.validate(&input).unwrap().raw_type, None);

        input.insert("type".to_string(), json!(42));
        assert_eq!(
            validator.validate(&input).unwrap().raw_type.as_deref(),
            Some("42")
        );

        input.insert("type".to_string(), json!("whatever"));
        assert_eq!(
            validator.validate(&input).unwrap().raw_type.as_deref(),
            Some("whatever")
        );
    }
}
