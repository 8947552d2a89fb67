//! Timestamp parsing and time-range normalisation.
//!
//! ffmpeg only accepts a start offset plus a duration, so every range a
//! caller expresses with an end time is converted here before any argument
//! is emitted.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{MediaError, Result};

/// A non-negative point in (or length of) a media timeline, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn from_secs_f64(seconds: f64) -> Result<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(MediaError::InvalidTime(format!(
                "{} is not a non-negative number of seconds",
                seconds
            )));
        }
        Ok(Self::from_millis((seconds * 1000.0).round() as u64))
    }

    pub fn as_millis(&self) -> u64 {
        self.0.as_millis() as u64
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse `SS[.mmm]`, `MM:SS[.mmm]` or `HH:MM:SS[.mmm]`.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let invalid = || {
            MediaError::InvalidTime(format!(
                "'{}' (expected seconds, MM:SS[.mmm] or HH:MM:SS[.mmm])",
                value
            ))
        };

        if value.is_empty() || value.starts_with('-') || value.starts_with('+') {
            return Err(invalid());
        }

        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }

        let (last, leading) = parts.split_last().ok_or_else(invalid)?;
        let seconds = parse_seconds_field(last).ok_or_else(invalid)?;

        let mut whole_units = 0u64;
        for field in leading {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let unit: u64 = field.parse().map_err(|_| invalid())?;
            whole_units = whole_units
                .checked_mul(60)
                .and_then(|units| units.checked_add(unit))
                .ok_or_else(invalid)?;
        }

        // Minutes and seconds fields below the leading one must stay under 60.
        if !leading.is_empty() {
            if seconds >= 60_000 {
                return Err(invalid());
            }
            if leading.len() == 2 {
                let minutes: u64 = leading[1].parse().map_err(|_| invalid())?;
                if minutes >= 60 {
                    return Err(invalid());
                }
            }
        }

        let millis = whole_units
            .checked_mul(60_000)
            .and_then(|millis| millis.checked_add(seconds))
            .ok_or_else(invalid)?;
        Ok(Self::from_millis(millis))
    }

    /// Render as seconds the way ffmpeg accepts them: `90`, `12.5`, `0.04`.
    pub fn to_ffmpeg(&self) -> String {
        let millis = self.as_millis();
        let secs = millis / 1000;
        let frac = millis % 1000;
        if frac == 0 {
            secs.to_string()
        } else {
            let frac = format!("{:03}", frac);
            format!("{}.{}", secs, frac.trim_end_matches('0'))
        }
    }

    pub fn checked_sub(&self, other: Timestamp) -> Option<Timestamp> {
        self.0.checked_sub(other.0).map(Timestamp)
    }

    /// `fraction` of this length, used for "percent of duration" positions.
    pub fn scaled(&self, fraction: f64) -> Timestamp {
        Timestamp::from_millis((self.as_millis() as f64 * fraction).round() as u64)
    }
}

/// Parses the trailing `SS[.mmm]` field into milliseconds.
fn parse_seconds_field(field: &str) -> Option<u64> {
    let (whole, frac) = match field.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (field, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: u64 = whole.parse().ok()?;

    let millis = match frac {
        None => 0,
        Some(frac) => {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // Anything past millisecond precision is truncated.
            let padded = format!("{:0<3}", &frac[..frac.len().min(3)]);
            padded.parse::<u64>().ok()?
        }
    };

    whole.checked_mul(1000)?.checked_add(millis)
}

impl FromStr for Timestamp {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        Timestamp::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.as_millis();
        let hours = millis / 3_600_000;
        let minutes = (millis % 3_600_000) / 60_000;
        let secs = (millis % 60_000) / 1_000;
        let ms = millis % 1_000;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    }
}

impl From<Duration> for Timestamp {
    fn from(duration: Duration) -> Self {
        Timestamp::from_millis(duration.as_millis() as u64)
    }
}

/// A start offset plus an optional length; absent length runs to the end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub start: Timestamp,
    pub duration: Option<Timestamp>,
}

impl TimeRange {
    /// Normalise `start` with either `end` or `duration` into start + duration.
    pub fn from_parts(
        start: Option<&str>,
        end: Option<&str>,
        duration: Option<&str>,
    ) -> Result<Self> {
        let start = start.map(Timestamp::parse).transpose()?.unwrap_or_default();

        let duration = match (end, duration) {
            (Some(_), Some(_)) => {
                return Err(MediaError::Validation(
                    "specify either an end time or a duration, not both".to_string(),
                ));
            }
            (Some(end), None) => {
                let end = Timestamp::parse(end)?;
                match end.checked_sub(start) {
                    Some(length) if !length.is_zero() => Some(length),
                    _ => {
                        return Err(MediaError::InvalidTime(format!(
                            "end time {} must be after start time {}",
                            end, start
                        )));
                    }
                }
            }
            (None, Some(duration)) => {
                let duration = Timestamp::parse(duration)?;
                if duration.is_zero() {
                    return Err(MediaError::InvalidTime("duration must be positive".to_string()));
                }
                Some(duration)
            }
            (None, None) => None,
        };

        Ok(Self { start, duration })
    }

    pub fn has_start(&self) -> bool {
        !self.start.is_zero()
    }

    pub fn end(&self) -> Option<Timestamp> {
        let duration = self.duration?;
        self.start
            .as_millis()
            .checked_add(duration.as_millis())
            .map(Timestamp::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(Timestamp::parse("90").unwrap().as_millis(), 90_000);
        assert_eq!(Timestamp::parse("12.5").unwrap().as_millis(), 12_500);
        assert_eq!(Timestamp::parse("0.04").unwrap().as_millis(), 40);
        assert_eq!(Timestamp::parse(" 7 ").unwrap().as_millis(), 7_000);
    }

    #[test]
    fn test_parse_clock_formats() {
        assert_eq!(Timestamp::parse("01:30").unwrap().as_millis(), 90_000);
        assert_eq!(Timestamp::parse("1:30.250").unwrap().as_millis(), 90_250);
        assert_eq!(Timestamp::parse("01:01:01.5").unwrap().as_millis(), 3_661_500);
        assert_eq!(Timestamp::parse("100:00:00").unwrap().as_millis(), 360_000_000);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "", "-5", "abc", "1:2:3:4", "00:61", "00:75:00", "1.", ".5", "1:-2", "1e3",
            "99999999999999999", "999999999999999999:00:00", "18446744073709551615",
        ] {
            assert!(Timestamp::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_ffmpeg_rendering() {
        assert_eq!(Timestamp::from_millis(10_000).to_ffmpeg(), "10");
        assert_eq!(Timestamp::from_millis(12_500).to_ffmpeg(), "12.5");
        assert_eq!(Timestamp::from_millis(40).to_ffmpeg(), "0.04");
        assert_eq!(Timestamp::from_millis(3_661_500).to_string(), "01:01:01.500");
    }

    #[test]
    fn test_end_is_converted_to_duration() {
        let range = TimeRange::from_parts(Some("10"), Some("00:00:40"), None).unwrap();
        assert_eq!(range.start.as_millis(), 10_000);
        assert_eq!(range.duration, Some(Timestamp::from_millis(30_000)));
        assert_eq!(range.end(), Some(Timestamp::from_millis(40_000)));
    }

    #[test]
    fn test_end_overflow_is_unknown() {
        let range = TimeRange {
            start: Timestamp::from_millis(u64::MAX),
            duration: Some(Timestamp::from_millis(1)),
        };
        assert_eq!(range.end(), None);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = TimeRange::from_parts(Some("60"), Some("40"), None).unwrap_err();
        assert!(matches!(err, MediaError::InvalidTime(_)));

        let err = TimeRange::from_parts(Some("40"), Some("40"), None).unwrap_err();
        assert!(matches!(err, MediaError::InvalidTime(_)));
    }

    #[test]
    fn test_end_and_duration_conflict() {
        let err = TimeRange::from_parts(Some("1"), Some("5"), Some("4")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_open_ended_range() {
        let range = TimeRange::from_parts(Some("5"), None, None).unwrap();
        assert!(range.has_start());
        assert_eq!(range.duration, None);
        assert_eq!(TimeRange::from_parts(None, None, None).unwrap(), TimeRange::default());
    }
}
