//! Tariff tables and the coercion policy applied to raw tariff values.
//!
//! A resolved `Tariffs` holds every numeric field a rule needs, already
//! coerced and defaulted, so a missing or malformed source value can never
//! leave a rule undefined. Coercion failures on tariff fields are recovered
//! via defaults on purpose; only user input is ever rejected.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

/// One tariff field a service needs, with its lookup keys per source and
/// the default applied when the source has nothing usable.
#[derive(Debug, Clone, Copy)]
pub struct TariffField {
    /// Logical name used by the rule, e.g. "base_price".
    pub name: &'static str,
    /// Environment variable for the env-backed source.
    pub env_key: &'static str,
    /// Catalog row columns, first present wins (legacy columns come last).
    pub catalog_keys: &'static [&'static str],
    pub default: i64,
}

/// Everything a source needs to resolve one service's tariff table.
#[derive(Debug, Clone, Copy)]
pub struct ServiceTariffSpec {
    /// Canonical service key, also the cache key.
    pub service: &'static str,
    /// `service_type` label in the shared catalog (case-insensitive match).
    pub catalog_type: &'static str,
    /// Environment variable holding the service's note.
    pub note_env: &'static str,
    pub fields: &'static [TariffField],
}

/// Resolved tariff table for one service.
#[derive(Debug, Clone)]
pub struct Tariffs {
    values: HashMap<&'static str, i64>,
    gst_percentage: Decimal,
    note: String,
}

impl Tariffs {
    pub fn new(values: HashMap<&'static str, i64>, gst_percentage: Decimal, note: String) -> Self {
        Self { values, gst_percentage, note }
    }

    /// Price for a logical field name. Resolution fills every declared
    /// field, so a miss here means a rule asked for an undeclared field.
    pub fn price(&self, name: &str) -> i64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    pub fn gst_percentage(&self) -> Decimal {
        self.gst_percentage
    }

    pub fn note(&self) -> &str {
        &self.note
    }
}

/// Documented default when the source carries no GST percentage.
pub fn default_gst_percentage() -> Decimal {
    dec!(10)
}

/// Safe-to-int coercion for a raw JSON tariff value.
///
/// Accepts integers and floats (truncated toward zero) and trimmed integer
/// strings. Booleans are rejected so `true` can never become 1. Anything
/// else falls back to the default; this never fails.
pub fn coerce_int(value: &Value, default: i64) -> i64 {
    match value {
        Value::Bool(_) => default,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(f) = n.as_f64() {
                f.trunc() as i64
            } else {
                default
            }
        }
        Value::String(s) => coerce_int_str(s, default),
        _ => default,
    }
}

/// Safe-to-int coercion for a raw string tariff value.
pub fn coerce_int_str(raw: &str, default: i64) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(default)
}

/// GST percentage parsed as a decimal, defaulting rather than failing.
pub fn coerce_gst(value: Option<&Value>) -> Decimal {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().and_then(Decimal::from_f64_retain),
        Some(Value::String(s)) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    };
    parsed.unwrap_or_else(default_gst_percentage)
}

/// GST percentage from a raw string (env source).
pub fn coerce_gst_str(raw: Option<&str>) -> Decimal {
    raw.and_then(|s| s.trim().parse::<Decimal>().ok())
        .unwrap_or_else(default_gst_percentage)
}

/// Truncate a decimal amount to whole units (fractional cents dropped).
pub fn trunc_to_i64(amount: Decimal) -> i64 {
    amount.trunc().to_i64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ==================== coerce_int tests ====================

    #[test]
    fn test_coerce_int_accepts_integers_and_floats() {
        assert_eq!(coerce_int(&json!(490), 0), 490);
        assert_eq!(coerce_int(&json!(49.9), 0), 49);
        assert_eq!(coerce_int(&json!(-3.7), 0), -3);
    }

    #[test]
    fn test_coerce_int_accepts_numeric_strings() {
        assert_eq!(coerce_int(&json!("590"), 0), 590);
        assert_eq!(coerce_int(&json!("  120  "), 0), 120);
        assert_eq!(coerce_int(&json!("-5"), 0), -5);
    }

    #[test]
    fn test_coerce_int_rejects_booleans() {
        // true must not become 1
        assert_eq!(coerce_int(&json!(true), 7), 7);
        assert_eq!(coerce_int(&json!(false), 7), 7);
    }

    #[test]
    fn test_coerce_int_falls_back_on_garbage() {
        assert_eq!(coerce_int(&json!("abc"), 50), 50);
        assert_eq!(coerce_int(&json!("5.5"), 50), 50);
        assert_eq!(coerce_int(&json!(null), 50), 50);
        assert_eq!(coerce_int(&json!([1]), 50), 50);
        assert_eq!(coerce_int_str("", 50), 50);
    }

    // ==================== GST tests ====================

    #[test]
    fn test_gst_default_when_absent() {
        assert_eq!(coerce_gst(None), dec!(10));
        assert_eq!(coerce_gst_str(None), dec!(10));
    }

    #[test]
    fn test_gst_parses_numbers_and_strings() {
        assert_eq!(coerce_gst(Some(&json!(12.5))), dec!(12.5));
        assert_eq!(coerce_gst(Some(&json!("15"))), dec!(15));
        assert_eq!(coerce_gst_str(Some("12.5")), dec!(12.5));
    }

    #[test]
    fn test_gst_default_on_garbage() {
        assert_eq!(coerce_gst(Some(&json!("ten"))), dec!(10));
        assert_eq!(coerce_gst(Some(&json!(true))), dec!(10));
        assert_eq!(coerce_gst_str(Some("")), dec!(10));
    }

    // ==================== Tariffs tests ====================

    #[test]
    fn test_price_lookup() {
        let mut values = HashMap::new();
        values.insert("base_price", 400);
        let tariffs = Tariffs::new(values, dec!(10), "from config".to_string());
        assert_eq!(tariffs.price("base_price"), 400);
        assert_eq!(tariffs.price("missing"), 0);
        assert_eq!(tariffs.note(), "from config");
    }

    #[test]
    fn test_trunc_to_i64() {
        assert_eq!(trunc_to_i64(dec!(487.5)), 487);
        assert_eq!(trunc_to_i64(dec!(48.99)), 48);
        assert_eq!(trunc_to_i64(dec!(100)), 100);
    }
}
