//! Field extraction and coercion over untyped JSON input.
//!
//! Every builder in this crate pulls its fields out of a generic
//! `serde_json::Value` mapping through these helpers, so the coercion rules
//! (textual booleans, numeric narrowing, table-driven enums) live in exactly
//! one place and the raw mapping never leaks past the extraction boundary.

use serde_json::{Map, Value};

use crate::{DispatchError, Result};

/// Look up a possibly dotted path (e.g. `"env.api.token"`) in a nested
/// mapping.
///
/// A missing leaf is `Ok(None)`. Traversing into a segment whose parent is
/// not a mapping is an error naming the dotted path and the specific segment
/// that could not be reached.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let mut current = Some(root);
    for segment in path.split('.') {
        match current {
            Some(Value::Object(map)) => current = map.get(segment),
            _ => {
                return Err(DispatchError::missing(format!(
                    "{path}, specifically {segment}"
                )))
            }
        }
    }
    match current {
        Some(Value::Null) | None => Ok(None),
        Some(v) => Ok(Some(v)),
    }
}

/// Extract a required string at a dotted path, or fail with `MissingField`.
pub fn required_str(root: &Value, path: &str) -> Result<String> {
    match lookup(root, path)? {
        Some(v) => as_text(path, v),
        None => Err(DispatchError::missing(path)),
    }
}

/// Extract an optional string at a dotted path.
pub fn optional_str(root: &Value, path: &str) -> Result<Option<String>> {
    lookup(root, path)?.map(|v| as_text(path, v)).transpose()
}

/// Coerce a scalar value to its textual representation.
///
/// JSON null never reaches this point (the lookup helpers treat it as
/// absent); arrays and objects are not scalars and fail.
pub fn as_text(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(invalid(field, "string", other)),
    }
}

/// Coerce a value to an integer: any JSON number narrows (floats truncate),
/// text is parsed.
pub fn as_i64(field: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                Ok(f as i64)
            } else {
                Err(invalid(field, "integer", value))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(field, "integer", value)),
        other => Err(invalid(field, "integer", other)),
    }
}

/// Coerce a value to a boolean: native booleans pass through, text is
/// matched case-insensitively against `"true"`/`"false"`.
pub fn as_bool(field: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => {
            if s.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if s.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(invalid(field, "boolean", value))
            }
        }
        other => Err(invalid(field, "boolean", other)),
    }
}

/// Match a value's upper-cased text against an explicit variant table.
///
/// No reflection-style lookup: each enum field names its recognized
/// variants, and anything else fails with `UnknownEnumVariant`.
pub fn as_enum<T: Copy>(field: &str, value: &Value, table: &[(&str, T)]) -> Result<T> {
    let text = as_text(field, value)?;
    let upper = text.to_uppercase();
    table
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, variant)| *variant)
        .ok_or_else(|| DispatchError::UnknownEnumVariant {
            field: field.to_string(),
            value: text,
        })
}

/// Optional string field of a sub-object.
pub fn opt_text(map: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    present(map, key).map(|v| as_text(key, v)).transpose()
}

/// Optional integer field of a sub-object.
pub fn opt_i64(map: &Map<String, Value>, key: &str) -> Result<Option<i64>> {
    present(map, key).map(|v| as_i64(key, v)).transpose()
}

/// Optional boolean field of a sub-object.
pub fn opt_bool(map: &Map<String, Value>, key: &str) -> Result<Option<bool>> {
    present(map, key).map(|v| as_bool(key, v)).transpose()
}

/// Optional enum field of a sub-object, matched against `table`.
pub fn opt_enum<T: Copy>(
    map: &Map<String, Value>,
    key: &str,
    table: &[(&str, T)],
) -> Result<Option<T>> {
    present(map, key).map(|v| as_enum(key, v, table)).transpose()
}

/// Optional ordered integer list (e.g. vibration timings in millis).
pub fn opt_i64_list(map: &Map<String, Value>, key: &str) -> Result<Option<Vec<i64>>> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| as_i64(key, v))
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(other) => Err(invalid(key, "array of integers", other)),
    }
}

/// Optional nested sub-object; present-but-empty objects count as absent.
///
/// A present value that is not a mapping is a type failure, never silently
/// skipped.
pub fn sub_object<'a>(
    map: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::Object(inner)) if inner.is_empty() => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner)),
        Some(other) => Err(invalid(key, "object", other)),
    }
}

/// Optional string-to-string mapping (data blocks, header blocks).
///
/// Values are coerced to text; null values are skipped. An empty result is
/// treated as absent so the built payload omits the block entirely.
pub fn opt_string_map(
    map: &Map<String, Value>,
    key: &str,
) -> Result<Option<std::collections::HashMap<String, String>>> {
    let inner = match present(map, key) {
        None => return Ok(None),
        Some(Value::Object(inner)) => inner,
        Some(other) => return Err(invalid(key, "object", other)),
    };
    let mut out = std::collections::HashMap::with_capacity(inner.len());
    for (k, v) in inner {
        if !v.is_null() {
            out.insert(k.clone(), as_text(&format!("{key}.{k}"), v)?);
        }
    }
    if out.is_empty() {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match map.get(key) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

fn invalid(field: &str, expected: &'static str, value: &Value) -> DispatchError {
    DispatchError::InvalidType {
        field: field.to_string(),
        expected,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_dotted_path() {
        let input = json!({"env": {"api": {"token": "abc"}}});
        let found = lookup(&input, "env.api.token").unwrap();
        assert_eq!(found, Some(&json!("abc")));
    }

    #[test]
    fn test_lookup_missing_leaf_is_absent() {
        let input = json!({"env": {"api": {}}});
        assert_eq!(lookup(&input, "env.api.token").unwrap(), None);
    }

    #[test]
    fn test_lookup_names_missing_segment() {
        let input = json!({"env": {}});
        let err = lookup(&input, "env.api.token").unwrap_err();
        match err {
            DispatchError::MissingField { path } => {
                assert!(path.contains("env.api.token"));
                assert!(path.contains("specifically token"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_through_scalar_fails() {
        let input = json!({"env": {"api": "not-a-map"}});
        let err = lookup(&input, "env.api.token").unwrap_err();
        assert!(matches!(err, DispatchError::MissingField { .. }));
    }

    #[test]
    fn test_required_str_absent() {
        let input = json!({"args": {}});
        let err = required_str(&input, "args.action").unwrap_err();
        assert!(matches!(err, DispatchError::MissingField { .. }));
    }

    #[test]
    fn test_null_is_absent_not_explicit_null() {
        let input = json!({"args": {"token": null}});
        assert_eq!(optional_str(&input, "args.token").unwrap(), None);
    }

    #[test]
    fn test_text_coerces_scalars() {
        assert_eq!(as_text("f", &json!("x")).unwrap(), "x");
        assert_eq!(as_text("f", &json!(42)).unwrap(), "42");
        assert_eq!(as_text("f", &json!(true)).unwrap(), "true");
        assert!(as_text("f", &json!(["x"])).is_err());
    }

    #[test]
    fn test_integer_narrowing_and_parsing() {
        assert_eq!(as_i64("f", &json!(5)).unwrap(), 5);
        assert_eq!(as_i64("f", &json!(5.9)).unwrap(), 5);
        assert_eq!(as_i64("f", &json!("  7 ")).unwrap(), 7);
        assert!(matches!(
            as_i64("f", &json!("seven")).unwrap_err(),
            DispatchError::InvalidType { .. }
        ));
    }

    #[test]
    fn test_boolean_coercion_is_case_insensitive() {
        assert!(as_bool("f", &json!(true)).unwrap());
        assert!(as_bool("f", &json!("true")).unwrap());
        assert!(as_bool("f", &json!("TRUE")).unwrap());
        assert!(!as_bool("f", &json!("False")).unwrap());
        assert!(matches!(
            as_bool("f", &json!("yes")).unwrap_err(),
            DispatchError::InvalidType { .. }
        ));
    }

    #[test]
    fn test_enum_table_matching() {
        let table = [("NORMAL", 0), ("HIGH", 1)];
        assert_eq!(as_enum("priority", &json!("high"), &table).unwrap(), 1);
        assert_eq!(as_enum("priority", &json!("HIGH"), &table).unwrap(), 1);
        let err = as_enum("priority", &json!("urgent"), &table).unwrap_err();
        match err {
            DispatchError::UnknownEnumVariant { field, value } => {
                assert_eq!(field, "priority");
                assert_eq!(value, "urgent");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sub_object_empty_counts_as_absent() {
        let map = json!({"a": {}, "b": {"k": 1}, "c": "x"});
        let map = map.as_object().unwrap();
        assert!(sub_object(map, "a").unwrap().is_none());
        assert!(sub_object(map, "b").unwrap().is_some());
        assert!(sub_object(map, "missing").unwrap().is_none());
        assert!(sub_object(map, "c").is_err());
    }

    #[test]
    fn test_string_map_skips_nulls_and_coerces() {
        let map = json!({"data": {"a": "1", "b": 2, "c": null, "d": false}});
        let map = map.as_object().unwrap();
        let data = opt_string_map(map, "data").unwrap().unwrap();
        assert_eq!(data.get("a").unwrap(), "1");
        assert_eq!(data.get("b").unwrap(), "2");
        assert_eq!(data.get("d").unwrap(), "false");
        assert!(!data.contains_key("c"));
    }

    #[test]
    fn test_string_map_all_null_is_absent() {
        let map = json!({"data": {"a": null}});
        let map = map.as_object().unwrap();
        assert!(opt_string_map(map, "data").unwrap().is_none());
    }

    #[test]
    fn test_i64_list() {
        let map = json!({"timings": [100, "200", 300.0]});
        let map = map.as_object().unwrap();
        assert_eq!(
            opt_i64_list(map, "timings").unwrap().unwrap(),
            vec![100, 200, 300]
        );
        let bad = json!({"timings": "100"});
        assert!(opt_i64_list(bad.as_object().unwrap(), "timings").is_err());
    }
}
