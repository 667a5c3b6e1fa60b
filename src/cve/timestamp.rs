use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

const BASE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(
            r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})(\.\d+)?(Z|[+-]\d{2}(?::?\d{2})?)?$",
        )
        .unwrap()
    })
}

/// A CVE record timestamp at whole-second precision.
///
/// The upstream corpus mixes several encodings:
/// * `2023-11-17T12:57:41.538666`
/// * `2023-11-24T19:51:55.099Z`
/// * `2010-05-24T00:00:00Z`
/// * `2023-12-13T00:00:00+00:00`
///
/// The wall-clock part is kept as written and any zone suffix is dropped,
/// so every value renders with a `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn parse(text: &str) -> Result<Self, String> {
        let caps = grammar()
            .captures(text)
            .ok_or_else(|| format!("unrecognized timestamp: {:?}", text))?;

        let naive = NaiveDateTime::parse_from_str(&caps[1], BASE_FORMAT)
            .map_err(|e| format!("invalid timestamp {:?}: {}", text, e))?;

        Ok(Self(Utc.from_utc_datetime(&naive)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DISPLAY_FORMAT))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(de::Error::custom)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_encodings() {
        for text in [
            "2023-11-17T12:57:41",
            "2023-11-17T12:57:41.538666",
            "2023-11-17T12:57:41.5Z",
            "2023-11-17T12:57:41Z",
            "2023-11-17T12:57:41+00:00",
            "2023-11-17T12:57:41+0000",
            "2023-11-17T12:57:41+00",
        ] {
            let ts = Timestamp::parse(text).unwrap();
            assert_eq!(ts.to_string(), "2023-11-17T12:57:41Z", "{}", text);
        }
    }

    #[test]
    fn test_offset_is_dropped() {
        for text in [
            "2023-12-13T02:30:00+02:00",
            "2023-12-13T02:30:00-0100",
            "2023-12-13T02:30:00+00",
            "2023-12-13T02:30:00.75+0530",
        ] {
            let ts = Timestamp::parse(text).unwrap();
            assert_eq!(ts.to_string(), "2023-12-13T02:30:00Z", "{}", text);
        }
    }

    #[test]
    fn test_rejected_encodings() {
        for text in [
            "2023-11-17",
            "2023-11-17 12:57:41",
            "2023-11-17T12:57:41.",
            "2023-11-17T12:57:41+0",
            "2023-11-17T12:57:41+00:0",
            "2023-13-17T12:57:41Z",
            "yesterday",
        ] {
            assert!(Timestamp::parse(text).is_err(), "{}", text);
        }
    }

    #[test]
    fn test_serde() {
        let ts: Timestamp = serde_json::from_str("\"2010-05-24T00:00:00.000Z\"").unwrap();
        assert_eq!(
            serde_json::to_value(ts).unwrap(),
            serde_json::json!("2010-05-24T00:00:00Z")
        );
        assert!(serde_json::from_str::<Timestamp>("12").is_err());
    }
}
