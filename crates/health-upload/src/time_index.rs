//! Calendar time index for uploaded samples
//!
//! A document store without secondary indexes cannot answer "all samples
//! touching 23:00" or "everything on the 31st" from raw timestamps. Every
//! uploaded sample therefore carries a flat set of calendar bucket fields:
//!
//! ```text
//! year.start  month.start  day.start  hour.start  minute.start  second.start
//! dayMinute.start  15minBucket.start  range
//! ```
//!
//! Interval samples additionally carry the matching `.end` fields and a
//! `.range` list per field enumerating every value the field takes across
//! the interval, wrapping at the field's cyclic boundary (hour 23 -> 0).
//!
//! Components are read in the sample's own local calendar. No time zone
//! conversion happens here.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

const MINUTES_PER_DAY_MAX: i64 = 1439;
const QUARTER_HOURS_PER_DAY_MAX: i64 = 95;

/// Indexed calendar fields, in document key order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    DayMinute,
    QuarterHourBucket,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Year,
        Field::Month,
        Field::Day,
        Field::Hour,
        Field::Minute,
        Field::Second,
        Field::DayMinute,
        Field::QuarterHourBucket,
    ];

    /// Key prefix used in stored documents
    pub fn key(&self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::Month => "month",
            Field::Day => "day",
            Field::Hour => "hour",
            Field::Minute => "minute",
            Field::Second => "second",
            Field::DayMinute => "dayMinute",
            Field::QuarterHourBucket => "15minBucket",
        }
    }
}

/// Raw calendar components of one instant. A `None` marks a component the
/// calendar could not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarComponents {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    pub hour: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<i64>,
}

impl CalendarComponents {
    pub fn from_naive(dt: &NaiveDateTime) -> Self {
        Self {
            year: Some(dt.year() as i64),
            month: Some(dt.month() as i64),
            day: Some(dt.day() as i64),
            hour: Some(dt.hour() as i64),
            minute: Some(dt.minute() as i64),
            second: Some(dt.second() as i64),
        }
    }
}

/// Bucket values of one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketValues {
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    pub hour: Option<i64>,
    pub minute: Option<i64>,
    pub second: Option<i64>,
    pub day_minute: Option<i64>,
    pub quarter_hour_bucket: Option<i64>,
}

impl BucketValues {
    pub fn from_components(c: &CalendarComponents) -> Self {
        Self {
            year: c.year,
            month: c.month,
            day: c.day,
            hour: c.hour,
            minute: c.minute,
            second: c.second,
            day_minute: day_minute(c.hour, c.minute),
            quarter_hour_bucket: quarter_hour_bucket(c.hour, c.minute),
        }
    }

    pub fn get(&self, field: Field) -> Option<i64> {
        match field {
            Field::Year => self.year,
            Field::Month => self.month,
            Field::Day => self.day,
            Field::Hour => self.hour,
            Field::Minute => self.minute,
            Field::Second => self.second,
            Field::DayMinute => self.day_minute,
            Field::QuarterHourBucket => self.quarter_hour_bucket,
        }
    }
}

/// Per-field value lists covering an interval
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketRanges {
    pub year: Option<Vec<i64>>,
    pub month: Option<Vec<i64>>,
    pub day: Option<Vec<i64>>,
    pub hour: Option<Vec<i64>>,
    pub minute: Option<Vec<i64>>,
    pub second: Option<Vec<i64>>,
    pub day_minute: Option<Vec<i64>>,
    pub quarter_hour_bucket: Option<Vec<i64>>,
}

impl BucketRanges {
    fn between(start: &CalendarComponents, end: &CalendarComponents) -> Self {
        let s = BucketValues::from_components(start);
        let e = BucketValues::from_components(end);

        // Day wraps at the length of the start month, whatever month the
        // interval ends in.
        let days = match days_in_month(start.month, start.year) {
            Some(n) => Ceiling::At(n),
            None => Ceiling::Unresolved,
        };

        Self {
            year: wrapping_range(s.year, e.year, Ceiling::Unbounded, 0),
            month: wrapping_range(s.month, e.month, Ceiling::At(12), 1),
            day: wrapping_range(s.day, e.day, days, 1),
            hour: wrapping_range(s.hour, e.hour, Ceiling::At(23), 0),
            minute: wrapping_range(s.minute, e.minute, Ceiling::At(59), 0),
            second: wrapping_range(s.second, e.second, Ceiling::At(59), 0),
            day_minute: wrapping_range(
                s.day_minute,
                e.day_minute,
                Ceiling::At(MINUTES_PER_DAY_MAX),
                0,
            ),
            quarter_hour_bucket: wrapping_range(
                s.quarter_hour_bucket,
                e.quarter_hour_bucket,
                Ceiling::At(QUARTER_HOURS_PER_DAY_MAX),
                0,
            ),
        }
    }

    pub fn get(&self, field: Field) -> Option<&[i64]> {
        let list = match field {
            Field::Year => &self.year,
            Field::Month => &self.month,
            Field::Day => &self.day,
            Field::Hour => &self.hour,
            Field::Minute => &self.minute,
            Field::Second => &self.second,
            Field::DayMinute => &self.day_minute,
            Field::QuarterHourBucket => &self.quarter_hour_bucket,
        };
        list.as_deref()
    }
}

/// Upper bound of a cyclic field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceiling {
    At(i64),
    /// No cycle (years). A descending pair cannot be enumerated.
    Unbounded,
    /// The bound itself could not be computed.
    Unresolved,
}

/// Calendar index of one sample interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeIndex {
    pub start: BucketValues,
    pub end: Option<BucketValues>,
    pub ranges: Option<BucketRanges>,
}

impl TimeIndex {
    /// Build the index for an interval. `start == end` (same instant) gives a
    /// point index without `.end` or `.range` entries.
    pub fn new<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> Self {
        let is_range = start != end;
        let start = CalendarComponents::from_naive(&start.naive_local());
        let end = CalendarComponents::from_naive(&end.naive_local());
        Self::from_components(&start, &end, is_range)
    }

    pub fn from_components(
        start: &CalendarComponents,
        end: &CalendarComponents,
        is_range: bool,
    ) -> Self {
        if !is_range {
            return Self {
                start: BucketValues::from_components(start),
                end: None,
                ranges: None,
            };
        }

        Self {
            start: BucketValues::from_components(start),
            end: Some(BucketValues::from_components(end)),
            ranges: Some(BucketRanges::between(start, end)),
        }
    }

    pub fn is_range(&self) -> bool {
        self.end.is_some()
    }

    /// Flatten into document fields. Every declared key is present; missing
    /// values become `null`.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("range".to_string(), Value::Bool(self.is_range()));

        for field in Field::ALL {
            doc.insert(
                format!("{}.start", field.key()),
                int_or_null(self.start.get(field)),
            );
        }

        if let (Some(end), Some(ranges)) = (&self.end, &self.ranges) {
            for field in Field::ALL {
                doc.insert(format!("{}.end", field.key()), int_or_null(end.get(field)));
                let range = match ranges.get(field) {
                    Some(values) => Value::from(values.to_vec()),
                    None => Value::Null,
                };
                doc.insert(format!("{}.range", field.key()), range);
            }
        }

        doc
    }
}

impl Serialize for TimeIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let doc = self.to_document();
        let mut map = serializer.serialize_map(Some(doc.len()))?;
        for (k, v) in &doc {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn int_or_null(value: Option<i64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// Values a cyclic field takes from `start` to `end`.
///
/// Ascending pairs give `[start..=end]`; descending pairs wrap to
/// `[start..=max] ++ [min..=end]`.
pub fn wrapping_range(
    start: Option<i64>,
    end: Option<i64>,
    max: Ceiling,
    min: i64,
) -> Option<Vec<i64>> {
    let (start, end) = (start?, end?);

    if start <= end {
        return match max {
            Ceiling::Unresolved => None,
            _ => Some((start..=end).collect()),
        };
    }

    match max {
        Ceiling::At(max) => Some((start..=max).chain(min..=end).collect()),
        Ceiling::Unbounded | Ceiling::Unresolved => None,
    }
}

/// Number of days in the given month, `None` when the date is not representable
pub fn days_in_month(month: Option<i64>, year: Option<i64>) -> Option<i64> {
    let (month, year) = (u32::try_from(month?).ok()?, i32::try_from(year?).ok()?);
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days())
}

/// Minute of the day, 0..=1439
pub fn day_minute(hour: Option<i64>, minute: Option<i64>) -> Option<i64> {
    Some(hour? * 60 + minute?)
}

/// Quarter hour of the day, 0..=95
pub fn quarter_hour_bucket(hour: Option<i64>, minute: Option<i64>) -> Option<i64> {
    Some(hour? * 4 + minute? / 15)
}
