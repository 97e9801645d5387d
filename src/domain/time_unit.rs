use std::str::FromStr;
use std::time::Duration;

/// Unit in which the reporting interval is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    Nanosecond,
    Microsecond,
    #[default]
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    pub fn duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Nanosecond => Duration::from_nanos(amount),
            TimeUnit::Microsecond => Duration::from_micros(amount),
            TimeUnit::Millisecond => Duration::from_millis(amount),
            TimeUnit::Second => Duration::from_secs(amount),
            TimeUnit::Minute => Duration::from_secs(amount.saturating_mul(60)),
            TimeUnit::Hour => Duration::from_secs(amount.saturating_mul(3_600)),
            TimeUnit::Day => Duration::from_secs(amount.saturating_mul(86_400)),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ns" | "nanosecond" | "nanoseconds" => Ok(TimeUnit::Nanosecond),
            "us" | "microsecond" | "microseconds" => Ok(TimeUnit::Microsecond),
            "ms" | "millisecond" | "milliseconds" => Ok(TimeUnit::Millisecond),
            "s" | "second" | "seconds" => Ok(TimeUnit::Second),
            "m" | "min" | "minute" | "minutes" => Ok(TimeUnit::Minute),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hour),
            "d" | "day" | "days" => Ok(TimeUnit::Day),
            _ => anyhow::bail!(
                "Invalid time unit: {}. Must be one of ns, us, ms, s, m, h, d",
                s
            ),
        }
    }
}
