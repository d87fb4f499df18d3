//! Time ranges, bucket units and query descriptors.

use crate::filter::Filter;
use crate::types::{DescriptionLod, TypeZoomLevel};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Half-open range `[start, end)` in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// `[T, T)` becomes `[T, T + 1)`; anything else is returned unchanged.
    pub fn normalized(self) -> Self {
        if self.start == self.end {
            Self::new(self.start, self.end.saturating_add(1))
        } else {
            self
        }
    }

    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Bucket granularity for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl TimeUnit {
    /// Nominal length in seconds. Months count as 30 days, years as 365.
    pub fn nominal_seconds(self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => MINUTE,
            TimeUnit::Hours => HOUR,
            TimeUnit::Days => DAY,
            TimeUnit::Months => 30 * DAY,
            TimeUnit::Years => 365 * DAY,
        }
    }

    /// Largest gap (seconds) across which two adjacent groups are still merged.
    pub fn merge_tolerance(self) -> i64 {
        self.nominal_seconds() / 4
    }

    /// Pick the unit for a range: the coarsest unit that fits more than three
    /// times into the range, falling back to seconds.
    pub fn for_duration(seconds: i64) -> Self {
        [
            TimeUnit::Years,
            TimeUnit::Months,
            TimeUnit::Days,
            TimeUnit::Hours,
            TimeUnit::Minutes,
        ]
        .into_iter()
        .find(|unit| seconds / unit.nominal_seconds() > 3)
        .unwrap_or(TimeUnit::Seconds)
    }

    /// Floor `ts` to the start of its bucket as seen in `offset`.
    pub fn truncate(self, ts: i64, offset: UtcOffset) -> i64 {
        let shift = i64::from(offset.whole_seconds());
        match self {
            TimeUnit::Seconds => ts,
            TimeUnit::Minutes | TimeUnit::Hours | TimeUnit::Days => {
                let period = self.nominal_seconds();
                let local = ts + shift;
                local - local.rem_euclid(period) - shift
            }
            TimeUnit::Months | TimeUnit::Years => {
                let Ok(utc) = OffsetDateTime::from_unix_timestamp(ts) else {
                    return ts;
                };
                let local = utc.to_offset(offset);
                let (month, day) = match self {
                    TimeUnit::Months => (local.month(), 1),
                    _ => (time::Month::January, 1),
                };
                match Date::from_calendar_date(local.year(), month, day) {
                    Ok(date) => date.midnight().assume_offset(offset).unix_timestamp(),
                    Err(_) => ts,
                }
            }
        }
    }
}

/// How a range is divided into buckets. The store cuts the buckets itself,
/// in the display offset, along the boundaries [`TimeUnit::truncate`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeDivision {
    pub unit: TimeUnit,
}

impl RangeDivision {
    pub fn for_range(range: &TimeRange) -> Self {
        Self {
            unit: TimeUnit::for_duration(range.normalized().duration()),
        }
    }
}

/// Everything that determines one aggregation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomParams {
    pub range: TimeRange,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub type_zoom: TypeZoomLevel,
    #[serde(default)]
    pub lod: DescriptionLod,
}

impl ZoomParams {
    pub fn new(range: TimeRange, filter: Filter, type_zoom: TypeZoomLevel, lod: DescriptionLod) -> Self {
        Self {
            range,
            filter,
            type_zoom,
            lod,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn empty_range_is_bumped() {
        assert_eq!(TimeRange::new(5, 5).normalized(), TimeRange::new(5, 6));
        assert_eq!(TimeRange::new(5, 9).normalized(), TimeRange::new(5, 9));
    }

    #[test]
    fn unit_selection_thresholds() {
        assert_eq!(TimeUnit::for_duration(1), TimeUnit::Seconds);
        assert_eq!(TimeUnit::for_duration(3 * MINUTE), TimeUnit::Seconds);
        assert_eq!(TimeUnit::for_duration(4 * MINUTE), TimeUnit::Minutes);
        assert_eq!(TimeUnit::for_duration(4 * HOUR), TimeUnit::Hours);
        assert_eq!(TimeUnit::for_duration(10 * DAY), TimeUnit::Days);
        assert_eq!(TimeUnit::for_duration(200 * DAY), TimeUnit::Months);
        assert_eq!(TimeUnit::for_duration(20 * 365 * DAY), TimeUnit::Years);
    }

    #[test]
    fn day_truncation_respects_offset() {
        let ts = datetime!(2024-03-10 01:30 UTC).unix_timestamp();
        let utc_midnight = datetime!(2024-03-10 00:00 UTC).unix_timestamp();
        assert_eq!(TimeUnit::Days.truncate(ts, UtcOffset::UTC), utc_midnight);

        // 01:30 UTC is still March 9th in UTC-05:00.
        let local_midnight = datetime!(2024-03-09 00:00 -5).unix_timestamp();
        assert_eq!(TimeUnit::Days.truncate(ts, offset!(-5)), local_midnight);
    }

    #[test]
    fn month_and_year_truncation() {
        let ts = datetime!(2023-11-17 13:45:12 UTC).unix_timestamp();
        assert_eq!(
            TimeUnit::Months.truncate(ts, UtcOffset::UTC),
            datetime!(2023-11-01 00:00 UTC).unix_timestamp()
        );
        assert_eq!(
            TimeUnit::Years.truncate(ts, UtcOffset::UTC),
            datetime!(2023-01-01 00:00 UTC).unix_timestamp()
        );
        // 23:00 UTC on Dec 31st is already January in UTC+02:00.
        let new_year = datetime!(2023-12-31 23:00 UTC).unix_timestamp();
        assert_eq!(
            TimeUnit::Months.truncate(new_year, offset!(+2)),
            datetime!(2024-01-01 00:00 +2).unix_timestamp()
        );
    }

    #[test]
    fn negative_timestamps_floor_downwards() {
        assert_eq!(TimeUnit::Minutes.truncate(-1, UtcOffset::UTC), -60);
        assert_eq!(TimeUnit::Hours.truncate(-3600, UtcOffset::UTC), -3600);
    }

    #[test]
    fn range_division_picks_unit_from_length() {
        let start = datetime!(2024-01-01 06:00 UTC).unix_timestamp();
        let end = datetime!(2024-01-08 18:00 UTC).unix_timestamp();
        let div = RangeDivision::for_range(&TimeRange::new(start, end));
        assert_eq!(div.unit, TimeUnit::Days);
        assert_eq!(RangeDivision::for_range(&TimeRange::new(7, 7)).unit, TimeUnit::Seconds);
    }
}
