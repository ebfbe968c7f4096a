//! Forgiving deserializers for fields typed loosely by the game client.
//!
//! The client builds its payloads from untyped dictionaries, so a card name may
//! arrive as a number and an exchange id as a string. These helpers accept any
//! JSON value and coerce it, instead of rejecting the whole message.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode `T` from a JSON object only.
///
/// Derived struct impls also take a JSON array as positional fields, which
/// would let `["alice", "bob"]` pass as a create request.
pub fn object_only<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
    T::deserialize(Value::Object(map)).map_err(D::Error::custom)
}

/// Any JSON value as text: strings verbatim, `null` as empty, anything else
/// in its JSON form.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// An integer given as a JSON integer or as an integer string; anything else
/// is treated as absent.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC. Missing or
/// unreadable timestamps fall back to the current time.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(Utc::now))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_string")]
        text: String,
        #[serde(default, deserialize_with = "lenient_i64")]
        number: Option<i64>,
        #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
        at: DateTime<Utc>,
    }

    #[test]
    fn strings_accept_scalars() {
        let p: Probe = serde_json::from_value(json!({ "text": 17 })).unwrap();
        assert_eq!(p.text, "17");

        let p: Probe = serde_json::from_value(json!({ "text": true })).unwrap();
        assert_eq!(p.text, "true");

        let p: Probe = serde_json::from_value(json!({ "text": null })).unwrap();
        assert_eq!(p.text, "");
    }

    #[test]
    fn integers_accept_numeric_strings() {
        let p: Probe = serde_json::from_value(json!({ "number": "42" })).unwrap();
        assert_eq!(p.number, Some(42));

        let p: Probe = serde_json::from_value(json!({ "number": 7 })).unwrap();
        assert_eq!(p.number, Some(7));
    }

    #[test]
    fn unparseable_integers_are_absent() {
        let p: Probe = serde_json::from_value(json!({ "number": "forty-two" })).unwrap();
        assert_eq!(p.number, None);

        let p: Probe = serde_json::from_value(json!({ "number": 4.5 })).unwrap();
        assert_eq!(p.number, None);

        let p: Probe = serde_json::from_value(json!({})).unwrap();
        assert_eq!(p.number, None);
    }

    #[test]
    fn timestamps_accept_naive_and_offset_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();

        let p: Probe = serde_json::from_value(json!({ "at": "2025-03-14T09:26:53Z" })).unwrap();
        assert_eq!(p.at, expected);

        let p: Probe = serde_json::from_value(json!({ "at": "2025-03-14T09:26:53" })).unwrap();
        assert_eq!(p.at, expected);
    }
}
