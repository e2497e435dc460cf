//! Time Unit Module
//!
//! Duration units accepted by configuration, normalized to milliseconds
//! before any comparison.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Time Unit ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    // == Normalization ==
    /// Converts `amount` of this unit to whole milliseconds, saturating on overflow.
    pub fn to_millis(self, amount: u64) -> u64 {
        match self {
            TimeUnit::Nanoseconds => amount / 1_000_000,
            TimeUnit::Microseconds => amount / 1_000,
            TimeUnit::Milliseconds => amount,
            TimeUnit::Seconds => amount.saturating_mul(1_000),
            TimeUnit::Minutes => amount.saturating_mul(60_000),
            TimeUnit::Hours => amount.saturating_mul(3_600_000),
            TimeUnit::Days => amount.saturating_mul(86_400_000),
        }
    }

    /// Converts `amount` of this unit to a [`Duration`] without truncation.
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Nanoseconds => Duration::from_nanos(amount),
            TimeUnit::Microseconds => Duration::from_micros(amount),
            _ => Duration::from_millis(self.to_millis(amount)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        };
        f.write_str(name)
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanos" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            "us" | "micros" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "secs" | "seconds" => Ok(TimeUnit::Seconds),
            "m" | "min" | "mins" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hours),
            "d" | "day" | "days" => Ok(TimeUnit::Days),
            other => Err(format!("unknown time unit '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_millis() {
        assert_eq!(TimeUnit::Seconds.to_millis(10), 10_000);
        assert_eq!(TimeUnit::Minutes.to_millis(2), 120_000);
        assert_eq!(TimeUnit::Microseconds.to_millis(2_500), 2);
        assert_eq!(TimeUnit::Days.to_millis(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_to_duration_keeps_sub_millis() {
        assert_eq!(TimeUnit::Nanoseconds.to_duration(1_500), Duration::from_nanos(1_500));
        assert_eq!(TimeUnit::Hours.to_duration(1), Duration::from_secs(3_600));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("SECONDS".parse::<TimeUnit>(), Ok(TimeUnit::Seconds));
        assert_eq!(" ms ".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
        assert_eq!("min".parse::<TimeUnit>(), Ok(TimeUnit::Minutes));
        assert!("fortnights".parse::<TimeUnit>().is_err());
    }

    fn unit_strategy() -> impl Strategy<Value = TimeUnit> {
        prop_oneof![
            Just(TimeUnit::Milliseconds),
            Just(TimeUnit::Seconds),
            Just(TimeUnit::Minutes),
            Just(TimeUnit::Hours),
        ]
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(unit in unit_strategy()) {
            prop_assert_eq!(unit.to_string().parse::<TimeUnit>(), Ok(unit));
        }

        #[test]
        fn prop_millis_agrees_with_duration(unit in unit_strategy(), amount in 0u64..1_000_000) {
            prop_assert_eq!(unit.to_millis(amount) as u128, unit.to_duration(amount).as_millis());
        }
    }
}
