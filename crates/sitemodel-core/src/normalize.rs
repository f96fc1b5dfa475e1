//! Normalization of raw model objects.

use serde_json::Value;

/// Top-level arrays that consumers iterate without null checks.
const REQUIRED_ARRAYS: [&str; 2] = ["collections", "singles"];

/// Ensure `collections` and `singles` exist as arrays.
///
/// Absent or null entries become `[]`; everything else is left alone so the
/// validator still sees (and reports) a wrongly typed value. Non-mapping
/// input is returned unchanged. Applying this twice is the same as once.
pub fn normalize(mut config: Value) -> Value {
    if let Value::Object(map) = &mut config {
        for key in REQUIRED_ARRAYS {
            if map.get(key).is_none_or(Value::is_null) {
                map.insert(key.to_string(), Value::Array(Vec::new()));
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_fills_missing_arrays() {
        let config = normalize(json!({ "hugover": "0.120.0" }));
        assert_eq!(config["collections"], json!([]));
        assert_eq!(config["singles"], json!([]));
    }

    #[test]
    fn test_fills_null_arrays() {
        let config = normalize(json!({ "hugover": "0.120.0", "singles": null }));
        assert_eq!(config["singles"], json!([]));
    }

    #[test]
    fn test_keeps_existing_values() {
        let config = normalize(json!({
            "collections": [{ "key": "posts" }],
            "singles": "not-an-array"
        }));
        assert_eq!(config["collections"][0]["key"], "posts");
        assert_eq!(config["singles"], json!("not-an-array"));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            json!({}),
            json!({ "hugover": "x", "collections": [{ "key": "posts" }] }),
            json!({ "singles": null }),
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_non_mapping_untouched() {
        assert_eq!(normalize(Value::Null), Value::Null);
        assert_eq!(normalize(json!([1, 2])), json!([1, 2]));
    }
}
