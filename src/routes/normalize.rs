//! Request parameter normalization.
//!
//! Clients send loosely-typed bags: "yes"/"no" strings for flags, numbers
//! as strings, and a handful of legacy key spellings. Everything is
//! normalized here, once, before dispatch; past this point rules reject
//! rather than coerce.

use serde_json::{Map, Value};

/// Legacy key renames applied after value normalization. A rename never
/// clobbers an already-present canonical key.
const KEY_RENAMES: &[(&str, &str)] = &[
    (
        "owner_inspection_arranging_to_access_neighbors",
        "owner_access_neighbors",
    ),
    // common typo for granny flat
    ("granny_flate", "granny_flat"),
    ("video_23", "video"),
    ("Swimming_pool", "swimming_pool"),
];

/// Aliases for the property category key; first present wins.
const CATEGORY_ALIASES: &[&str] = &["usage_type", "property_usage", "propert_usage"];

/// Aliases for the levels key; first present wins.
const LEVELS_ALIASES: &[&str] = &["number_of_levels", "level"];

/// Normalize one request parameter bag.
pub fn normalize_params(params: Map<String, Value>) -> Map<String, Value> {
    let mut normalized: Map<String, Value> =
        params.into_iter().map(|(key, value)| (key, normalize_value(value))).collect();

    rename_first(&mut normalized, "levels", LEVELS_ALIASES);
    rename_first(&mut normalized, "property_category", CATEGORY_ALIASES);
    for (from, to) in KEY_RENAMES {
        if !normalized.contains_key(*to) {
            if let Some(value) = normalized.remove(*from) {
                normalized.insert(to.to_string(), value);
            }
        }
    }

    normalized
}

/// Coerce string booleans and pure integer strings; leave everything else
/// untouched.
fn normalize_value(value: Value) -> Value {
    let Value::String(s) = &value else {
        return value;
    };

    let lowered = s.trim().to_lowercase();
    match lowered.as_str() {
        "yes" | "true" => return Value::Bool(true),
        "no" | "false" => return Value::Bool(false),
        _ => {}
    }

    let stripped = s.trim();
    let is_integer = {
        let digits = stripped.strip_prefix('-').unwrap_or(stripped);
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    };
    if is_integer {
        if let Ok(n) = stripped.parse::<i64>() {
            return Value::from(n);
        }
    }

    value
}

fn rename_first(params: &mut Map<String, Value>, canonical: &str, aliases: &[&str]) {
    if params.contains_key(canonical) {
        return;
    }
    for alias in aliases {
        if let Some(value) = params.remove(*alias) {
            params.insert(canonical.to_string(), value);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    // ==================== value coercion tests ====================

    #[test]
    fn test_string_booleans() {
        let out = normalize_params(bag(&[
            ("a", json!("yes")),
            ("b", json!("No")),
            ("c", json!(" TRUE ")),
            ("d", json!("false")),
        ]));
        assert_eq!(out["a"], json!(true));
        assert_eq!(out["b"], json!(false));
        assert_eq!(out["c"], json!(true));
        assert_eq!(out["d"], json!(false));
    }

    #[test]
    fn test_numeric_strings() {
        let out = normalize_params(bag(&[
            ("bedrooms", json!("3")),
            ("discount", json!("-20")),
            ("note", json!("3 bedrooms")),
            ("area", json!("4.5")),
        ]));
        assert_eq!(out["bedrooms"], json!(3));
        assert_eq!(out["discount"], json!(-20));
        // non-pure-integer strings pass through untouched
        assert_eq!(out["note"], json!("3 bedrooms"));
        assert_eq!(out["area"], json!("4.5"));
    }

    #[test]
    fn test_non_strings_pass_through() {
        let out = normalize_params(bag(&[("stages", json!([1, 2])), ("granny_flat", json!(true))]));
        assert_eq!(out["stages"], json!([1, 2]));
        assert_eq!(out["granny_flat"], json!(true));
    }

    // ==================== key rename tests ====================

    #[test]
    fn test_levels_aliases() {
        let out = normalize_params(bag(&[("number_of_levels", json!(2))]));
        assert_eq!(out["levels"], json!(2));
        assert!(!out.contains_key("number_of_levels"));

        let out = normalize_params(bag(&[("level", json!("3"))]));
        assert_eq!(out["levels"], json!(3));

        // canonical key wins over aliases
        let out = normalize_params(bag(&[("levels", json!(1)), ("number_of_levels", json!(9))]));
        assert_eq!(out["levels"], json!(1));
    }

    #[test]
    fn test_property_category_aliases() {
        let out = normalize_params(bag(&[("usage_type", json!("residential"))]));
        assert_eq!(out["property_category"], json!("residential"));

        let out = normalize_params(bag(&[("propert_usage", json!("commercial"))]));
        assert_eq!(out["property_category"], json!("commercial"));
    }

    #[test]
    fn test_legacy_key_renames() {
        let out = normalize_params(bag(&[
            ("granny_flate", json!("yes")),
            ("video_23", json!("no")),
            ("Swimming_pool", json!(true)),
            ("owner_inspection_arranging_to_access_neighbors", json!("yes")),
        ]));
        assert_eq!(out["granny_flat"], json!(true));
        assert_eq!(out["video"], json!(false));
        assert_eq!(out["swimming_pool"], json!(true));
        assert_eq!(out["owner_access_neighbors"], json!(true));
    }

    #[test]
    fn test_rename_never_clobbers_existing_key() {
        let out = normalize_params(bag(&[
            ("granny_flat", json!(false)),
            ("granny_flate", json!(true)),
        ]));
        assert_eq!(out["granny_flat"], json!(false));
    }
}
