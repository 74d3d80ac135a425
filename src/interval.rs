// Shorthand duration tokens ("30s", "7d", "4w") -> SQLite relative-time modifiers ("-7 days").
// SQLite has no week modifier, so weeks are sent as days.

use std::fmt;
use std::str::FromStr;

use crate::error::IntervalError;

const DAYS_PER_WEEK: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            's' => Some(TimeUnit::Second),
            'm' => Some(TimeUnit::Minute),
            'h' => Some(TimeUnit::Hour),
            'd' => Some(TimeUnit::Day),
            'w' => Some(TimeUnit::Week),
            _ => None,
        }
    }

    /// Plural English word used in the displayed offset.
    pub fn plural(self) -> &'static str {
        match self {
            TimeUnit::Second => "seconds",
            TimeUnit::Minute => "minutes",
            TimeUnit::Hour => "hours",
            TimeUnit::Day => "days",
            TimeUnit::Week => "weeks",
        }
    }
}

/// A validated look-back window. Displays as the negative offset "-{magnitude} {unit}s".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSpec {
    pub magnitude: u64,
    pub unit: TimeUnit,
}

impl IntervalSpec {
    /// Validation order: length, then magnitude, then unit letter.
    pub fn parse(token: &str) -> Result<Self, IntervalError> {
        let malformed = || IntervalError::Malformed(token.to_string());

        let mut chars = token.chars();
        let unit_char = chars.next_back().ok_or_else(malformed)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let magnitude: u64 = digits.parse().map_err(|_| malformed())?;
        if magnitude == 0 {
            return Err(malformed());
        }

        let unit = TimeUnit::from_letter(unit_char)
            .ok_or(IntervalError::UnsupportedUnit(unit_char))?;
        if unit == TimeUnit::Week && magnitude.checked_mul(DAYS_PER_WEEK).is_none() {
            return Err(malformed());
        }
        Ok(Self { magnitude, unit })
    }

    /// Modifier for `datetime('now', ?)`. Weeks become days.
    pub fn sqlite_modifier(&self) -> String {
        match self.unit {
            TimeUnit::Week => format!("-{} days", self.magnitude * DAYS_PER_WEEK),
            _ => self.to_string(),
        }
    }
}

impl FromStr for IntervalSpec {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{} {}", self.magnitude, self.unit.plural())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_unit_and_magnitude_renders_plural_offset() {
        let units = [
            ('s', "seconds"),
            ('m', "minutes"),
            ('h', "hours"),
            ('d', "days"),
            ('w', "weeks"),
        ];
        for (letter, word) in units {
            for magnitude in [1u64, 7, 30] {
                let token = format!("{magnitude}{letter}");
                let parsed = IntervalSpec::parse(&token).unwrap();
                assert_eq!(parsed.magnitude, magnitude);
                assert_eq!(parsed.to_string(), format!("-{magnitude} {word}"));
            }
        }
    }

    #[test]
    fn sqlite_modifier_uses_units_sqlite_understands() {
        let cases = [
            ("30s", "-30 seconds"),
            ("5m", "-5 minutes"),
            ("1h", "-1 hours"),
            ("7d", "-7 days"),
            ("1w", "-7 days"),
            ("4w", "-28 days"),
        ];
        for (token, modifier) in cases {
            assert_eq!(IntervalSpec::parse(token).unwrap().sqlite_modifier(), modifier);
        }
    }

    #[test]
    fn week_overflow_in_days_is_malformed() {
        let token = format!("{}w", u64::MAX / 7 + 1);
        assert!(matches!(
            IntervalSpec::parse(&token),
            Err(IntervalError::Malformed(_))
        ));
        let largest = format!("{}w", u64::MAX / 7);
        assert!(IntervalSpec::parse(&largest).is_ok());
    }

    #[test]
    fn malformed_tokens() {
        for token in ["1hour", "1 hour", "", "1.5h", "h", "invalid", "abc", "1h30m", "-5h", "+5h", "0h"] {
            assert!(
                matches!(IntervalSpec::parse(token), Err(IntervalError::Malformed(_))),
                "expected malformed for {token:?}"
            );
        }
    }

    #[test]
    fn unsupported_units() {
        for (token, unit) in [("1x", 'x'), ("1M", 'M'), ("3M", 'M'), ("1y", 'y')] {
            assert_eq!(
                IntervalSpec::parse(token),
                Err(IntervalError::UnsupportedUnit(unit))
            );
        }
    }

    #[test]
    fn large_magnitude_is_accepted() {
        let parsed: IntervalSpec = "100000w".parse().unwrap();
        assert_eq!(parsed.to_string(), "-100000 weeks");
    }

    #[test]
    fn magnitude_overflow_is_malformed() {
        let token = format!("{}9d", u64::MAX);
        assert!(matches!(
            IntervalSpec::parse(&token),
            Err(IntervalError::Malformed(_))
        ));
    }
}
