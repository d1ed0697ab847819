use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a single migration script, ordered numerically.
///
/// Versions are conventionally `YYYYMMDDHHMMSS` timestamps, but any
/// non-negative integer is accepted. `VersionId::ZERO` is the sentinel
/// for "before any migration" and is never a real script version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(i64);

impl VersionId {
    /// State before any migration has been applied.
    pub const ZERO: VersionId = VersionId(0);

    pub const fn new(raw: i64) -> Self {
        assert!(raw >= 0, "migration versions are non-negative");
        VersionId(raw)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Human-readable form: `YYYYMMDDHHMMSS` ids render as a UTC
    /// timestamp, anything else falls back to the raw digits.
    pub fn format_timestamp(self) -> String {
        let digits = self.0.to_string();
        if digits.len() == 14 {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M%S") {
                return parsed.format("%Y-%m-%d %H:%M:%S").to_string();
            }
        }
        digits
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid migration version '{0}': expected a non-negative integer id")]
pub struct ParseVersionError(String);

impl FromStr for VersionId {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(raw) if raw >= 0 => Ok(VersionId(raw)),
            _ => Err(ParseVersionError(s.to_string())),
        }
    }
}

/// One applied-version entry as the tracking collection stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: VersionId,
    pub applied_at: Option<DateTime<Utc>>,
}

impl VersionRecord {
    pub fn new(version: VersionId) -> Self {
        VersionRecord {
            version,
            applied_at: None,
        }
    }

    pub fn applied_at(version: VersionId, at: DateTime<Utc>) -> Self {
        VersionRecord {
            version,
            applied_at: Some(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_numerically() {
        let older = VersionId::new(20140822185744);
        let newer = VersionId::new(20140822185745);
        assert!(older < newer);
        assert!(VersionId::ZERO < older);
    }

    #[test]
    fn parses_valid_input() {
        let id: VersionId = "20140822185744".parse().unwrap();
        assert_eq!(id, VersionId::new(20140822185744));
        assert_eq!(" 42 ".parse::<VersionId>().unwrap(), VersionId::new(42));
    }

    #[test]
    fn rejects_invalid_input() {
        assert!("abc".parse::<VersionId>().is_err());
        assert!("-5".parse::<VersionId>().is_err());
        assert!("".parse::<VersionId>().is_err());
        assert!("1.5".parse::<VersionId>().is_err());
    }

    #[test]
    fn formats_timestamp_ids() {
        let id = VersionId::new(20140822185744);
        assert_eq!(id.format_timestamp(), "2014-08-22 18:57:44");
    }

    #[test]
    fn formats_non_timestamp_ids_as_digits() {
        assert_eq!(VersionId::new(7).format_timestamp(), "7");
        // 14 digits but not a real calendar date
        assert_eq!(VersionId::new(99999999999999).format_timestamp(), "99999999999999");
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&VersionId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: VersionId = serde_json::from_str("3").unwrap();
        assert_eq!(back, VersionId::new(3));
    }
}
