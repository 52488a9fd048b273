//! Validation rules
//!
//! Character-class, typed-value and length checks for single values. The
//! checks never look at mandatory status; an empty value is handled by the
//! caller before any of these run.

use chrono::{NaiveDate, NaiveTime};
use edi_ir::Value;
use edi_schema::{DataType, FieldRule};

/// Validation rule result
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub is_valid: bool,
    pub message: Option<String>,
    /// Typed value when the check produced one
    pub value: Option<Value>,
}

impl RuleResult {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
            value: None,
        }
    }

    #[must_use]
    pub fn typed(value: Value) -> Self {
        Self {
            is_valid: true,
            message: None,
            value: Some(value),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
            value: None,
        }
    }
}

/// Length as counted by the rules: digits only for numeric types (sign and
/// decimal mark excluded), characters otherwise
#[must_use]
pub fn significant_length(value: &str, data_type: DataType) -> usize {
    if data_type.is_numeric() {
        value.chars().filter(char::is_ascii_digit).count()
    } else {
        value.chars().count()
    }
}

/// Validate length constraints
#[must_use]
pub fn validate_length(value: &str, rule: &FieldRule) -> RuleResult {
    let len = significant_length(value, rule.data_type);

    if len < rule.min_length {
        return RuleResult::invalid(format!(
            "value length {len} is less than minimum {}",
            rule.min_length
        ));
    }

    if len > rule.max_length {
        return RuleResult::invalid(format!(
            "value length {len} exceeds maximum {}",
            rule.max_length
        ));
    }

    RuleResult::valid()
}

/// Validate a non-empty value against its data type, producing the typed
/// value on success
#[must_use]
pub fn validate_data_type(value: &str, data_type: DataType, decimal_mark: char) -> RuleResult {
    match data_type {
        DataType::Alphabetic => {
            if value.chars().all(|c| c.is_alphabetic() || c == ' ') {
                RuleResult::typed(Value::Text(value.to_string()))
            } else {
                RuleResult::invalid(format!("value '{value}' is not alphabetic"))
            }
        }
        DataType::Alphanumeric | DataType::Identifier => {
            if value.chars().any(char::is_control) {
                RuleResult::invalid(format!("value '{value}' contains control characters"))
            } else {
                RuleResult::typed(Value::Text(value.to_string()))
            }
        }
        DataType::Numeric { implied_decimals } => validate_numeric(value, implied_decimals),
        DataType::Decimal => validate_decimal(value, decimal_mark),
        DataType::Date => validate_date(value),
        DataType::Time => validate_time(value),
    }
}

fn split_sign(value: &str) -> (bool, &str) {
    match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    }
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn validate_numeric(value: &str, implied_decimals: u8) -> RuleResult {
    let (negative, digits) = split_sign(value);
    if !all_digits(digits) {
        return RuleResult::invalid(format!("value '{value}' is not numeric"));
    }

    if implied_decimals == 0 {
        if let Ok(integer) = value.parse::<i64>() {
            return RuleResult::typed(Value::Integer(integer));
        }
    }

    match digits.parse::<f64>() {
        Ok(number) => {
            let scaled = number / 10f64.powi(i32::from(implied_decimals));
            RuleResult::typed(Value::Decimal(if negative { -scaled } else { scaled }))
        }
        Err(_) => RuleResult::invalid(format!("value '{value}' is not numeric")),
    }
}

fn validate_decimal(value: &str, decimal_mark: char) -> RuleResult {
    let (negative, number) = split_sign(value);
    let (whole, fraction) = match number.split_once(decimal_mark) {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };

    let digits_ok = (whole.is_empty() || all_digits(whole))
        && fraction.is_none_or(|f| f.is_empty() || all_digits(f))
        && (!whole.is_empty() || fraction.is_some_and(|f| !f.is_empty()));

    if !digits_ok {
        return RuleResult::invalid(format!("value '{value}' is not a decimal number"));
    }

    let normalized = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if whole.is_empty() { "0" } else { whole },
        fraction.filter(|f| !f.is_empty()).unwrap_or("0")
    );

    match normalized.parse::<f64>() {
        Ok(number) => RuleResult::typed(Value::Decimal(number)),
        Err(_) => RuleResult::invalid(format!("value '{value}' is not a decimal number")),
    }
}

fn validate_date(value: &str) -> RuleResult {
    let format = match value.len() {
        8 => "%Y%m%d",
        6 => "%y%m%d",
        _ => {
            return RuleResult::invalid(format!(
                "value '{value}' is not a date (expected YYMMDD or CCYYMMDD)"
            ));
        }
    };

    if !all_digits(value) {
        return RuleResult::invalid(format!("value '{value}' is not a date"));
    }

    match NaiveDate::parse_from_str(value, format) {
        Ok(date) => RuleResult::typed(Value::Date(date)),
        Err(e) => RuleResult::invalid(format!("value '{value}' is not a valid date: {e}")),
    }
}

fn validate_time(value: &str) -> RuleResult {
    if !all_digits(value) || value.len() < 4 || value.len() == 5 || value.len() > 8 {
        return RuleResult::invalid(format!(
            "value '{value}' is not a time (expected HHMM, HHMMSS or HHMMSSd..)"
        ));
    }

    let field = |range: std::ops::Range<usize>| value.get(range).and_then(|s| s.parse::<u32>().ok());

    let hour = field(0..2).unwrap_or(u32::MAX);
    let minute = field(2..4).unwrap_or(u32::MAX);
    let second = if value.len() >= 6 { field(4..6).unwrap_or(u32::MAX) } else { 0 };
    let nanos = match value.get(6..) {
        Some(fraction) if !fraction.is_empty() => {
            let scale = 10u32.pow(9 - u32::try_from(fraction.len()).unwrap_or(9));
            fraction.parse::<u32>().map_or(u32::MAX, |f| f * scale)
        }
        _ => 0,
    };

    match NaiveTime::from_hms_nano_opt(hour, minute, second, nanos) {
        Some(time) if second < 60 => RuleResult::typed(Value::Time(time)),
        _ => RuleResult::invalid(format!("value '{value}' is not a valid time of day")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(value: &str, data_type: &str) -> Option<Value> {
        let result = validate_data_type(value, data_type.parse().unwrap(), '.');
        assert!(result.is_valid, "{value} as {data_type}: {:?}", result.message);
        result.value
    }

    fn rejects(value: &str, data_type: &str) -> bool {
        !validate_data_type(value, data_type.parse().unwrap(), '.').is_valid
    }

    #[test]
    fn test_alphabetic() {
        assert_eq!(typed("ABC def", "A"), Some(Value::Text("ABC def".into())));
        assert!(rejects("AB1", "A"));
    }

    #[test]
    fn test_alphanumeric() {
        assert_eq!(typed("PO-123 #4", "AN"), Some(Value::Text("PO-123 #4".into())));
        assert!(rejects("A\u{7}B", "AN"));
    }

    #[test]
    fn test_numeric() {
        assert_eq!(typed("10", "N0"), Some(Value::Integer(10)));
        assert_eq!(typed("-42", "N"), Some(Value::Integer(-42)));
        assert_eq!(typed("1250", "N2"), Some(Value::Decimal(12.5)));
        assert!(rejects("abc", "N0"));
        assert!(rejects("1.5", "N0"));
        assert!(rejects("-", "N0"));
    }

    #[test]
    fn test_decimal() {
        assert_eq!(typed("12.50", "R"), Some(Value::Decimal(12.5)));
        assert_eq!(typed("-.5", "R"), Some(Value::Decimal(-0.5)));
        assert_eq!(typed("7", "R"), Some(Value::Decimal(7.0)));
        assert_eq!(typed("7.", "R"), Some(Value::Decimal(7.0)));
        assert!(rejects("1.2.3", "R"));
        assert!(rejects(".", "R"));
        assert!(rejects("1,5", "R"));

        let comma = validate_data_type("1,5", DataType::Decimal, ',');
        assert_eq!(comma.value, Some(Value::Decimal(1.5)));
    }

    #[test]
    fn test_date() {
        assert_eq!(
            typed("20240229", "DT"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            typed("240101", "DT"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
        );
        assert!(rejects("20230229", "DT"));
        assert!(rejects("2024-01-01", "DT"));
        assert!(rejects("2024011", "DT"));
    }

    #[test]
    fn test_time() {
        assert_eq!(
            typed("1430", "TM"),
            Some(Value::Time(NaiveTime::from_hms_opt(14, 30, 0).unwrap()))
        );
        assert_eq!(
            typed("143015", "TM"),
            Some(Value::Time(NaiveTime::from_hms_opt(14, 30, 15).unwrap()))
        );
        assert_eq!(
            typed("14301525", "TM"),
            Some(Value::Time(NaiveTime::from_hms_milli_opt(14, 30, 15, 250).unwrap()))
        );
        assert!(rejects("2460", "TM"));
        assert!(rejects("12345", "TM"));
        assert!(rejects("12:30", "TM"));
    }

    #[test]
    fn test_length_counts_digits_for_numerics() {
        let rule = FieldRule::new(1, "6060", DataType::Decimal).length(1, 3);
        assert!(validate_length("-1.25", &rule).is_valid);
        assert!(!validate_length("12.34", &rule).is_valid);

        let rule = FieldRule::new(1, "1004", DataType::Alphanumeric).length(2, 3);
        assert!(!validate_length("A", &rule).is_valid);
        assert!(validate_length("ÄBC", &rule).is_valid);
        assert!(!validate_length("ABCD", &rule).is_valid);
    }
}
