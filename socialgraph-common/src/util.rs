use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Unexpected, Visitor},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;
use time::{UtcDateTime, format_description::BorrowedFormatItem, macros::format_description};

/// Fixed-width ISO-8601 in UTC, so that lexical order is chronological order.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Timestamp(UtcDateTime);

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("The timestamp is not in the expected format: {0:?}")]
pub struct InvalidTimestampError(String);

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(UtcDateTime::now())
    }

    #[must_use]
    pub fn new(date_time: UtcDateTime) -> Self {
        Self(date_time)
    }

    #[must_use]
    pub fn get(self) -> UtcDateTime {
        self.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let formatted = self
            .0
            .format(TIMESTAMP_FORMAT)
            .map_err(|_| std::fmt::Error)?;
        f.write_str(&formatted)
    }
}

impl FromStr for Timestamp {
    type Err = InvalidTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UtcDateTime::parse(s, TIMESTAMP_FORMAT)
            .map(Self)
            .map_err(|_| InvalidTimestampError(s.to_owned()))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner
            .parse()
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(&inner), &"Timestamp"))
    }
}

/// Reads a request field that clients send either as a string or as a bare
/// number. Missing and `null` fields read as the empty string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientStringVisitor;

    impl Visitor<'_> for LenientStringVisitor {
        type Value = String;

        fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str("a string, an integer or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_owned())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(LenientStringVisitor)
}

#[cfg(test)]
mod tests {
    use super::{Timestamp, lenient_string};
    use serde::Deserialize;
    use time::macros::utc_datetime;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "lenient_string")]
        id: String,
    }

    #[test]
    fn timestamp_is_fixed_width_iso8601() {
        let timestamp = Timestamp::new(utc_datetime!(2025-03-04 05:06:07.5));
        assert_eq!(timestamp.to_string(), "2025-03-04T05:06:07.500000Z");

        let parsed: Timestamp = "2025-03-04T05:06:07.500000Z".parse().unwrap();
        assert_eq!(parsed, timestamp);
    }

    #[test]
    fn timestamp_text_order_matches_time_order() {
        let earlier = Timestamp::new(utc_datetime!(2025-03-04 05:06:07));
        let later = Timestamp::new(utc_datetime!(2025-03-04 05:06:07.25));

        assert!(earlier < later);
        assert!(earlier.to_string() < later.to_string());
    }

    #[test]
    fn timestamp_rejects_other_formats() {
        assert!("2025-03-04T05:06:07Z".parse::<Timestamp>().is_err());
        assert!("yesterday".parse::<Timestamp>().is_err());
    }

    #[test]
    fn lenient_string_accepts_strings_numbers_and_null() {
        let body: Body = serde_json::from_str(r#"{"id": "12"}"#).unwrap();
        assert_eq!(body.id, "12");

        let body: Body = serde_json::from_str(r#"{"id": 12}"#).unwrap();
        assert_eq!(body.id, "12");

        let body: Body = serde_json::from_str(r#"{"id": null}"#).unwrap();
        assert_eq!(body.id, "");

        let body: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(body.id, "");
    }

    #[test]
    fn lenient_string_rejects_objects() {
        assert!(serde_json::from_str::<Body>(r#"{"id": {"nested": 1}}"#).is_err());
    }
}
