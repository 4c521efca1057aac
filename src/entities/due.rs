//! The `due` sub-record carried by tasks.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::WaypointError;

/// A task's due date/time, as the remote task service represents it (§6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Due {
    pub date: NaiveDate,
    pub datetime: Option<NaiveDateTime>,
    pub is_recurring: bool,
    /// Freeform, server-rendered human string (e.g. "every day"). Re-rendered at midnight even
    /// when nothing else about the due record changed — see [`Due::differs_ignoring_string`].
    pub string: String,
    pub timezone: Option<String>,
}

impl Due {
    /// Parses the wire `datetime` field, which may arrive in any of
    /// [`Config::datetime_formats`].
    pub fn parse_datetime(raw: &str, config: &Config) -> Result<NaiveDateTime, WaypointError> {
        for fmt in &config.datetime_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Ok(dt);
            }
        }
        Err(WaypointError::Format(format!(
            "datetime {raw:?} did not match any configured format"
        )))
    }

    pub fn parse_date(raw: &str, config: &Config) -> Result<NaiveDate, WaypointError> {
        NaiveDate::parse_from_str(raw, &config.date_format).map_err(WaypointError::from)
    }

    /// True when `self` and `other` differ in any field other than `string` — the cosmetic
    /// midnight re-render §4.1/§8 says must be ignored when diffing tasks.
    pub fn differs_ignoring_string(&self, other: &Due) -> bool {
        self.date != other.date
            || self.datetime != other.datetime
            || self.is_recurring != other.is_recurring
            || self.timezone != other.timezone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn due(date: &str, string: &str) -> Due {
        Due {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            datetime: None,
            is_recurring: false,
            string: string.to_string(),
            timezone: None,
        }
    }

    #[test]
    fn string_only_change_does_not_differ() {
        let a = due("2025-03-15", "every day");
        let b = due("2025-03-15", "daily");
        assert!(!a.differs_ignoring_string(&b));
    }

    #[test]
    fn date_change_differs() {
        let a = due("2025-03-15", "every day");
        let b = due("2025-03-16", "every day");
        assert!(a.differs_ignoring_string(&b));
    }
}
