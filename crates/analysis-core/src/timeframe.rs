use crate::error::AnalysisError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Canonical duration of one calendar month, in days, used by the `M` unit.
const MONTH_DAYS: i64 = 30;

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = MS_PER_MINUTE * 60;
const MS_PER_DAY: i64 = MS_PER_HOUR * 24;
const MS_PER_WEEK: i64 = MS_PER_DAY * 7;
const MS_PER_MONTH: i64 = MS_PER_DAY * MONTH_DAYS;

/// A parsed timeframe code such as `"1h"` or `"4h"`.
///
/// Parsing is strict: `^\d+[mhdwM]$`, case-sensitive (`m` = minute, `M` = month).
/// Serializes as its canonical string form so it round-trips through JSON and
/// Redis key components identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeframe {
    amount: u32,
    unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl TimeUnit {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'm' => Some(TimeUnit::Minute),
            'h' => Some(TimeUnit::Hour),
            'd' => Some(TimeUnit::Day),
            'w' => Some(TimeUnit::Week),
            'M' => Some(TimeUnit::Month),
            _ => None,
        }
    }

    fn as_char(&self) -> char {
        match self {
            TimeUnit::Minute => 'm',
            TimeUnit::Hour => 'h',
            TimeUnit::Day => 'd',
            TimeUnit::Week => 'w',
            TimeUnit::Month => 'M',
        }
    }

    fn ms(&self) -> i64 {
        match self {
            TimeUnit::Minute => MS_PER_MINUTE,
            TimeUnit::Hour => MS_PER_HOUR,
            TimeUnit::Day => MS_PER_DAY,
            TimeUnit::Week => MS_PER_WEEK,
            TimeUnit::Month => MS_PER_MONTH,
        }
    }
}

impl Timeframe {
    /// Parses a strict timeframe code, failing with `AnalysisError::InvalidTimeframe`.
    pub fn parse(raw: &str) -> Result<Self, AnalysisError> {
        let invalid = || AnalysisError::InvalidTimeframe { raw: raw.to_string() };

        if raw.is_empty() {
            return Err(invalid());
        }
        let mut chars: Vec<char> = raw.chars().collect();
        let unit_char = chars.pop().ok_or_else(invalid)?;
        let unit = TimeUnit::from_char(unit_char).ok_or_else(invalid)?;
        if chars.is_empty() || !chars.iter().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let digits: String = chars.into_iter().collect();
        let amount: u32 = digits.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        Ok(Timeframe { amount, unit })
    }

    /// Parses with a caller-supplied fallback instead of failing.
    pub fn parse_or(raw: &str, default: Timeframe) -> Timeframe {
        Timeframe::parse(raw).unwrap_or(default)
    }

    pub fn to_millis(&self) -> i64 {
        self.amount as i64 * self.unit.ms()
    }

    pub fn to_minutes(&self) -> i64 {
        self.to_millis() / MS_PER_MINUTE
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    /// Sorts a slice of timeframes descending (largest duration first), in place.
    pub fn sort_descending(timeframes: &mut [Timeframe]) {
        timeframes.sort_by(|a, b| b.to_millis().cmp(&a.to_millis()));
    }

    /// Returns the smallest timeframe in `available` strictly larger than `self`, if any.
    pub fn next_higher(&self, available: &[Timeframe]) -> Option<Timeframe> {
        available
            .iter()
            .copied()
            .filter(|tf| tf.to_millis() > self.to_millis())
            .min_by_key(|tf| tf.to_millis())
    }
}

impl PartialOrd for Timeframe {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timeframe {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_millis().cmp(&other.to_millis())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.as_char())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::parse(s)
    }
}

impl Serialize for Timeframe {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Timeframe::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_codes() {
        assert_eq!(Timeframe::parse("1h").unwrap().to_millis(), MS_PER_HOUR);
        assert_eq!(Timeframe::parse("4h").unwrap().to_millis(), 4 * MS_PER_HOUR);
        assert_eq!(Timeframe::parse("1d").unwrap().to_millis(), MS_PER_DAY);
        assert_eq!(Timeframe::parse("1w").unwrap().to_millis(), MS_PER_WEEK);
        assert_eq!(Timeframe::parse("1M").unwrap().to_millis(), MS_PER_MONTH);
        assert_eq!(Timeframe::parse("15m").unwrap().to_minutes(), 15);
    }

    #[test]
    fn case_sensitive_m_vs_month() {
        let minute = Timeframe::parse("1m").unwrap();
        let month = Timeframe::parse("1M").unwrap();
        assert_ne!(minute.to_millis(), month.to_millis());
    }

    #[test]
    fn rejects_invalid_formats() {
        assert!(Timeframe::parse("").is_err());
        assert!(Timeframe::parse("1").is_err());
        assert!(Timeframe::parse("h1").is_err());
        assert!(Timeframe::parse("1x").is_err());
        assert!(Timeframe::parse("-1h").is_err());
        assert!(Timeframe::parse("0h").is_err());
    }

    #[test]
    fn sorts_descending() {
        let mut tfs = vec![
            Timeframe::parse("1h").unwrap(),
            Timeframe::parse("1d").unwrap(),
            Timeframe::parse("15m").unwrap(),
        ];
        Timeframe::sort_descending(&mut tfs);
        assert_eq!(tfs[0].to_string(), "1d");
        assert_eq!(tfs[2].to_string(), "15m");
    }

    #[test]
    fn next_higher_finds_smallest_larger() {
        let current = Timeframe::parse("15m").unwrap();
        let available = vec![
            Timeframe::parse("5m").unwrap(),
            Timeframe::parse("1h").unwrap(),
            Timeframe::parse("4h").unwrap(),
        ];
        assert_eq!(current.next_higher(&available).unwrap().to_string(), "1h");
    }

    #[test]
    fn display_round_trips() {
        for code in ["1m", "5m", "15m", "1h", "4h", "1d", "1w", "1M"] {
            let tf = Timeframe::parse(code).unwrap();
            assert_eq!(tf.to_string(), code);
        }
    }

    #[test]
    fn json_round_trips_as_string() {
        let tf = Timeframe::parse("4h").unwrap();
        let json = serde_json::to_string(&tf).unwrap();
        assert_eq!(json, "\"4h\"");
        let back: Timeframe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tf);
    }
}
