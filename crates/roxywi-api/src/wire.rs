// Wire-format helpers
//
// The Roxy-WI API is loose about types: IDs arrive as numbers or strings,
// booleans as `true`/`1`/"1", and some list fields as a JSON document
// embedded in a string with single quotes. These helpers normalize all of
// that at the serde boundary so the models stay strongly typed.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

// ── Scalar coercions ────────────────────────────────────────────────

/// Remove single quotes; the API stores free text inside quoted SQL-ish strings.
pub fn strip_quotes(raw: &str) -> String {
    raw.replace('\'', "")
}

/// `true` → `1`, `false` → `0`.
pub fn bool_to_int(flag: bool) -> u8 {
    u8::from(flag)
}

/// ID from a JSON number or non-empty string.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(|i| i.to_string()),
        _ => None,
    }
}

/// Integer from a number, numeric string or bool; anything else is `0`.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
pub fn int_from_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// `1`, `true` and `"1"`/`"true"` are true; everything else is false.
pub fn bool_from_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(_) => int_from_value(value) == 1,
        Value::String(s) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true")
        }
        _ => false,
    }
}

/// String from a string or number; `null` is empty.
pub fn string_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Embedded configs ────────────────────────────────────────────────

/// Parse a list that may arrive as a real JSON array or as a string such as
/// `"[{'backend_ip': '10.0.0.1', 'port': 80}]"`.
pub fn parse_embedded(value: &Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => serde_json::from_str::<Vec<Value>>(&s.replace('\'', "\""))
            .map_err(|e| Error::EmbeddedConfig(format!("error parsing config string: {e}"))),
        other => Err(Error::EmbeddedConfig(format!(
            "unexpected type for config: {other}"
        ))),
    }
}

/// Like [`parse_embedded`], for a single object. `null`, `""` and `{}` mean absent.
pub fn parse_embedded_object(value: &Value) -> Result<Option<Value>, Error> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(_) => Ok(Some(value.clone())),
        Value::Array(items) => Ok(items.first().cloned()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            let parsed: Value = serde_json::from_str(&s.replace('\'', "\""))
                .map_err(|e| Error::EmbeddedConfig(format!("error parsing object string: {e}")))?;
            parse_embedded_object(&parsed)
        }
        other => Err(Error::EmbeddedConfig(format!(
            "unexpected type for object: {other}"
        ))),
    }
}

// ── serde `with` modules ────────────────────────────────────────────

/// Booleans sent as `1`/`0`, read leniently.
pub mod int_bool {
    use super::{Deserialize, Deserializer, Serializer, Value, bool_from_value, bool_to_int};

    pub fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(bool_to_int(*flag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(bool_from_value(&Value::deserialize(deserializer)?))
    }
}

/// Booleans sent as JSON booleans, read leniently.
pub mod lenient_bool {
    use super::{Deserialize, Deserializer, Serializer, Value, bool_from_value};

    pub fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*flag)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(bool_from_value(&Value::deserialize(deserializer)?))
    }
}

/// Integers that may arrive as strings.
pub mod flex_int {
    use super::{Deserialize, Deserializer, Serializer, Value, int_from_value};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(int_from_value(&Value::deserialize(deserializer)?))
    }
}

/// Strings that may arrive as numbers or `null`.
pub mod flex_string {
    use super::{Deserialize, Deserializer, Serializer, Value, string_from_value};

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(string_from_value(&Value::deserialize(deserializer)?))
    }
}

/// Free text with single quotes stripped on the way in and out.
pub mod quoted_text {
    use super::{Deserialize, Deserializer, Serializer, Value, string_from_value, strip_quotes};

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&strip_quotes(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(strip_quotes(&string_from_value(&Value::deserialize(
            deserializer,
        )?)))
    }
}

/// Remote IDs: numbers or strings, normalized to a string.
pub mod flex_id {
    use super::{Deserialize, Deserializer, Serializer, Value, id_from_value};

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(id_from_value(&Value::deserialize(deserializer)?).unwrap_or_default())
    }
}

/// Lists that may be embedded as a JSON-in-string document.
pub mod embedded_list {
    use serde::de::Error as _;

    use super::{
        Deserialize, DeserializeOwned, Deserializer, Serialize, Serializer, Value, parse_embedded,
    };

    pub fn serialize<S, T>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        items.serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = Value::deserialize(deserializer)?;
        parse_embedded(&raw)
            .map_err(D::Error::custom)?
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(D::Error::custom))
            .collect()
    }
}

/// Single nested objects; `null` and `{}` read as `None`.
pub mod embedded_object {
    use serde::de::Error as _;

    use super::{
        Deserialize, DeserializeOwned, Deserializer, Serialize, Serializer, Value,
        parse_embedded_object,
    };

    pub fn serialize<S, T>(item: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        item.serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = Value::deserialize(deserializer)?;
        parse_embedded_object(&raw)
            .map_err(D::Error::custom)?
            .map(|item| serde_json::from_value(item).map_err(D::Error::custom))
            .transpose()
    }
}

/// `Vec<String>` that may arrive as a quoted list string or `null`.
pub mod string_list {
    use serde::de::Error as _;

    use super::{
        Deserialize, Deserializer, Serialize, Serializer, Value, parse_embedded, string_from_value,
    };

    pub fn serialize<S: Serializer>(items: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        items.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(parse_embedded(&raw)
            .map_err(D::Error::custom)?
            .iter()
            .map(string_from_value)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn ids_from_numbers_and_strings() {
        assert_eq!(id_from_value(&json!(7)), Some("7".into()));
        assert_eq!(id_from_value(&json!(7.0)), Some("7".into()));
        assert_eq!(id_from_value(&json!("1-backend")), Some("1-backend".into()));
        assert_eq!(id_from_value(&json!("")), None);
        assert_eq!(id_from_value(&json!(null)), None);
    }

    #[test]
    fn ints_fall_back_to_zero() {
        assert_eq!(int_from_value(&json!(42)), 42);
        assert_eq!(int_from_value(&json!(42.9)), 42);
        assert_eq!(int_from_value(&json!("8080")), 8080);
        assert_eq!(int_from_value(&json!("http")), 0);
        assert_eq!(int_from_value(&json!({"a": 1})), 0);
    }

    #[test]
    fn bools_from_ints() {
        assert!(bool_from_value(&json!(1)));
        assert!(bool_from_value(&json!(true)));
        assert!(bool_from_value(&json!("1")));
        assert!(!bool_from_value(&json!(0)));
        assert!(!bool_from_value(&json!(2)));
        assert!(!bool_from_value(&json!(null)));
        assert_eq!(bool_to_int(true), 1);
        assert_eq!(bool_to_int(false), 0);
    }

    #[test]
    fn embedded_config_string_uses_single_quotes() {
        let raw = json!("[{'backend_ip': '10.0.0.1', 'port': 80, 'weight': 1}]");
        let parsed = parse_embedded(&raw).unwrap();
        assert_eq!(
            parsed,
            vec![json!({"backend_ip": "10.0.0.1", "port": 80, "weight": 1})]
        );
    }

    #[test]
    fn embedded_config_accepts_arrays_and_null() {
        assert_eq!(parse_embedded(&json!([{"a": 1}])).unwrap().len(), 1);
        assert!(parse_embedded(&json!(null)).unwrap().is_empty());
        assert!(parse_embedded(&json!("")).unwrap().is_empty());
        assert!(matches!(
            parse_embedded(&json!(3)),
            Err(Error::EmbeddedConfig(_))
        ));
        assert!(matches!(
            parse_embedded(&json!("not json")),
            Err(Error::EmbeddedConfig(_))
        ));
    }

    #[test]
    fn embedded_object_empty_is_none() {
        assert_eq!(parse_embedded_object(&json!({})).unwrap(), None);
        assert_eq!(parse_embedded_object(&json!(null)).unwrap(), None);
        assert_eq!(
            parse_embedded_object(&json!("{'cert': '/etc/ssl/a.pem'}")).unwrap(),
            Some(json!({"cert": "/etc/ssl/a.pem"}))
        );
    }

    #[test]
    fn quotes_are_stripped() {
        assert_eq!(strip_quotes("it's 'quoted'"), "its quoted");
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        #[serde(with = "int_bool")]
        enabled: bool,
        #[serde(with = "flex_int")]
        port: i64,
        #[serde(with = "quoted_text")]
        description: String,
    }

    #[test]
    fn with_modules_shape_the_wire() {
        let sample = Sample {
            enabled: true,
            port: 443,
            description: "edge 'lb'".into(),
        };
        assert_eq!(
            serde_json::to_value(&sample).unwrap(),
            json!({"enabled": 1, "port": 443, "description": "edge lb"})
        );

        let back: Sample =
            serde_json::from_value(json!({"enabled": "1", "port": "443", "description": "edge"}))
                .unwrap();
        assert!(back.enabled);
        assert_eq!(back.port, 443);
    }
}
