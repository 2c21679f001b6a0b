use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Julian day number of the Unix epoch
const UNIX_EPOCH_JULIAN: f64 = 2_440_587.5;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

const CARD_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// `0000-01-01T00:00:00.000`
const MIN_CARD_MILLIS: i64 = -62_167_219_200_000;
/// `9999-12-31T23:59:59.999`
const MAX_CARD_MILLIS: i64 = 253_402_300_799_999;

/// Point in time carried by D and E cards
///
/// Held at millisecond precision, which is exactly what the card text can
/// express, so building, persisting and reloading a deck never drifts.
/// Exposed to callers as a julian day number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    /// Earliest instant the card text can express
    pub const MIN: Timestamp = Timestamp {
        millis: MIN_CARD_MILLIS,
    };
    /// Latest instant the card text can express
    pub const MAX: Timestamp = Timestamp {
        millis: MAX_CARD_MILLIS,
    };

    /// Current time, truncated to milliseconds
    pub fn now() -> Self {
        Self {
            millis: Utc::now().timestamp_millis(),
        }
    }

    /// Build from milliseconds since the Unix epoch
    ///
    /// Any value is accepted here; decks only take values for which
    /// [`Timestamp::is_card_representable`] holds.
    pub fn from_unix_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Build from a julian day number, rounding to the nearest millisecond
    ///
    /// `None` unless the result lies within years 0000 through 9999.
    pub fn from_julian(julian: f64) -> Option<Self> {
        if !julian.is_finite() {
            return None;
        }
        let millis = ((julian - UNIX_EPOCH_JULIAN) * MILLIS_PER_DAY).round();
        if millis < MIN_CARD_MILLIS as f64 || millis > MAX_CARD_MILLIS as f64 {
            return None;
        }
        Some(Self {
            millis: millis as i64,
        })
    }

    /// Whether the card text form can carry this instant (years 0000
    /// through 9999)
    pub fn is_card_representable(&self) -> bool {
        (MIN_CARD_MILLIS..=MAX_CARD_MILLIS).contains(&self.millis)
    }

    /// Julian day number
    pub fn to_julian(&self) -> f64 {
        UNIX_EPOCH_JULIAN + self.millis as f64 / MILLIS_PER_DAY
    }

    pub fn unix_millis(&self) -> i64 {
        self.millis
    }

    /// Card text form, `YYYY-MM-DDTHH:MM:SS.sss`
    ///
    /// Values outside the card range have no such form and are written as
    /// `@<millis>`, which no parser accepts.
    pub fn to_card_text(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.millis) {
            Some(dt) if self.is_card_representable() => dt.format(CARD_FORMAT).to_string(),
            _ => format!("@{}", self.millis),
        }
    }

    /// Parse the card text form; the fractional part is optional
    pub fn parse_card_text(s: &str) -> Option<Self> {
        let parsed = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
            .ok()?;
        let ts = Self {
            millis: parsed.and_utc().timestamp_millis(),
        };
        ts.is_card_representable().then_some(ts)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_card_text()
    }
}

impl TryFrom<String> for Timestamp {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Timestamp::parse_card_text(&value).ok_or_else(|| format!("invalid timestamp: {}", value))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_card_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch_julian() {
        let ts = Timestamp::from_unix_millis(0);
        assert_eq!(ts.to_julian(), 2_440_587.5);
        assert_eq!(ts.to_card_text(), "1970-01-01T00:00:00.000");
    }

    #[test]
    fn test_card_text_round_trip() {
        let ts = Timestamp::parse_card_text("2024-03-01T12:34:56.789").unwrap();
        assert_eq!(ts.to_card_text(), "2024-03-01T12:34:56.789");
        assert_eq!(Timestamp::parse_card_text(&ts.to_card_text()), Some(ts));
    }

    #[test]
    fn test_fraction_is_optional() {
        let ts = Timestamp::parse_card_text("2024-03-01T12:34:56").unwrap();
        assert_eq!(ts.to_card_text(), "2024-03-01T12:34:56.000");
    }

    #[test]
    fn test_julian_rounds_to_millis() {
        let ts = Timestamp::from_julian(2_460_000.123_456_789).unwrap();
        let again = Timestamp::from_julian(ts.to_julian()).unwrap();
        assert_eq!(ts, again);
        assert!(Timestamp::from_julian(f64::NAN).is_none());
    }

    #[test]
    fn test_card_range_edges_round_trip() {
        assert_eq!(Timestamp::MIN.to_card_text(), "0000-01-01T00:00:00.000");
        assert_eq!(Timestamp::MAX.to_card_text(), "9999-12-31T23:59:59.999");
        for ts in [Timestamp::MIN, Timestamp::MAX] {
            assert_eq!(Timestamp::parse_card_text(&ts.to_card_text()), Some(ts));
            assert_eq!(Timestamp::from_julian(ts.to_julian()), Some(ts));
        }
    }

    #[test]
    fn test_out_of_range_is_not_representable() {
        let far = Timestamp::from_unix_millis(i64::MAX / 2);
        assert!(!far.is_card_representable());
        assert_eq!(far.to_card_text(), format!("@{}", i64::MAX / 2));
        assert!(Timestamp::parse_card_text(&far.to_card_text()).is_none());
        assert!(Timestamp::from_julian(1e12).is_none());
        assert!(Timestamp::from_julian(-1e12).is_none());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Timestamp::parse_card_text("yesterday").is_none());
        assert!(Timestamp::parse_card_text("2024-13-01T00:00:00").is_none());
    }
}
