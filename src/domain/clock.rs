use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serializer};

/// Format used for timestamps on the queue and in the result file,
/// e.g. `2017-04-22 00:00:00+02:00`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Format accepted for the simulation start on the command line
pub const START_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wall-clock length of a simulated day, inclusive of the last second
const DAY_SPAN_SECONDS: i64 = 24 * 3600 - 1;

/// Fixed-frequency sample timestamps covering one calendar day from `start`.
///
/// Producer and consumer derive their timestamps from the same clock, so every
/// reading published by the producer has an entry in the consumer's PV series.
/// The day ends at the wall-clock time `start + 23:59:59`, so a DST switch day
/// spans 23 or 25 hours. Steps are taken in absolute time.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleClock {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    frequency_seconds: u32,
}

impl SampleClock {
    pub fn new(start: DateTime<Tz>, frequency_seconds: u32) -> Self {
        let end = day_end(&start);
        Self {
            start,
            end,
            frequency_seconds: frequency_seconds.max(1),
        }
    }

    /// Localize a naive start time, picking the earlier instant for ambiguous
    /// (DST fall-back) times. Returns `None` for times skipped by DST.
    pub fn localize(naive: NaiveDateTime, tz: Tz, frequency_seconds: u32) -> Option<Self> {
        let start = tz.from_local_datetime(&naive).earliest()?;
        Some(Self::new(start, frequency_seconds))
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn frequency_seconds(&self) -> u32 {
        self.frequency_seconds
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }

    /// Number of samples in the day
    pub fn sample_count(&self) -> usize {
        let span = (self.end - self.start).num_seconds().max(0);
        (span / i64::from(self.frequency_seconds)) as usize + 1
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Tz>> + '_ {
        let step = Duration::seconds(i64::from(self.frequency_seconds));
        (0..self.sample_count()).map(move |i| self.start + step * i as i32)
    }
}

/// Last instant of the day starting at `start`.
///
/// An ambiguous wall-clock end takes the later instant. An end inside a DST
/// gap is read with the offset in force before the gap.
fn day_end(start: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = start.timezone();
    let naive = start.naive_local() + Duration::seconds(DAY_SPAN_SECONDS);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(end) => end,
        LocalResult::Ambiguous(_, later) => later,
        LocalResult::None => tz
            .from_local_datetime(&(naive - Duration::hours(1)))
            .earliest()
            .map(|before_gap| before_gap + Duration::hours(1))
            .unwrap_or_else(|| *start + Duration::seconds(DAY_SPAN_SECONDS)),
    }
}

/// Render a timestamp the way it travels on the queue
pub fn format_timestamp<T>(ts: &DateTime<T>) -> String
where
    T: TimeZone,
    T::Offset: std::fmt::Display,
{
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> chrono::ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}

/// Serde adapter for `DateTime<FixedOffset>` in [`TIMESTAMP_FORMAT`]
pub mod timestamp_format {
    use super::*;

    pub fn serialize<S>(ts: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_timestamp(&s).map_err(serde::de::Error::custom)
    }
}
