//! Minute-resolution time of day for schedules.
//!
//! Schedules compare times at hour:minute granularity only. The text form is
//! the 24-hour `"HH:MM"` literal used by the configuration API, with `"---"`
//! standing for "no time set" (see [`format_optional`] and [`parse_optional`]).

use core::fmt;
use core::str::FromStr;

use chrono::Timelike;

/// Text used for an unset schedule time.
pub const UNSET: &str = "---";

/// A wall-clock time with minute resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Midnight.
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { hour: 0, minute: 0 };

    /// Build a time, or `None` if out of range.
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Hour, 0–23.
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    /// Minute, 0–59.
    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// Current local wall-clock time, truncated to the minute.
    pub fn now_local() -> Self {
        Self::from(chrono::Local::now().time())
    }
}

impl From<chrono::NaiveTime> for TimeOfDay {
    fn from(t: chrono::NaiveTime) -> Self {
        // chrono guarantees hour < 24 and minute < 60
        Self {
            hour: t.hour() as u8,
            minute: t.minute() as u8,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Why a time literal was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid time {0:?}, expected HH:MM")]
pub struct InvalidTime(pub String);

impl FromStr for TimeOfDay {
    type Err = InvalidTime;

    /// Parse `"HH:MM"` (24-hour, leading zero optional). Surrounding
    /// whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        chrono::NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(TimeOfDay::from)
            .map_err(|_| InvalidTime(s.to_string()))
    }
}

/// Parse a schedule field: `"---"` (or empty) is `None`, otherwise `"HH:MM"`.
pub fn parse_optional(s: &str) -> Result<Option<TimeOfDay>, InvalidTime> {
    let s = s.trim();
    if s.is_empty() || s == UNSET {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

/// Render a schedule field, `"---"` when unset.
pub fn format_optional(t: Option<TimeOfDay>) -> String {
    match t {
        Some(t) => t.to_string(),
        None => UNSET.to_string(),
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    #[test]
    fn new_checks_range() {
        assert!(TimeOfDay::new(23, 59).is_some());
        assert!(TimeOfDay::new(24, 0).is_none());
        assert!(TimeOfDay::new(0, 60).is_none());
    }

    #[test]
    fn display_zero_pads() {
        assert_eq!(t(9, 5).to_string(), "09:05");
        assert_eq!(TimeOfDay::MIDNIGHT.to_string(), "00:00");
    }

    #[test]
    fn parse_valid() {
        assert_eq!("09:00".parse::<TimeOfDay>(), Ok(t(9, 0)));
        assert_eq!("9:00".parse::<TimeOfDay>(), Ok(t(9, 0)));
        assert_eq!(" 23:59 ".parse::<TimeOfDay>(), Ok(t(23, 59)));
    }

    #[test]
    fn parse_invalid() {
        for bad in ["", "9", "24:00", "12:60", "aa:bb", "-1:00", "12:00:00", "noon"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn optional_sentinel() {
        assert_eq!(parse_optional("---"), Ok(None));
        assert_eq!(parse_optional(""), Ok(None));
        assert_eq!(parse_optional("18:40"), Ok(Some(t(18, 40))));
        assert!(parse_optional("later").is_err());

        assert_eq!(format_optional(None), "---");
        assert_eq!(format_optional(Some(t(18, 41))), "18:41");
    }

    #[test]
    fn from_naive_time_truncates_seconds() {
        let naive = chrono::NaiveTime::from_hms_opt(7, 15, 59).unwrap();
        assert_eq!(TimeOfDay::from(naive), t(7, 15));
    }

    #[test]
    fn ordering_by_hour_then_minute() {
        assert!(t(8, 59) < t(9, 0));
        assert!(t(9, 0) < t(9, 1));
    }

    #[test]
    fn invalid_time_display() {
        let err = "25:00".parse::<TimeOfDay>().unwrap_err();
        assert_eq!(err.to_string(), "invalid time \"25:00\", expected HH:MM");
    }
}
