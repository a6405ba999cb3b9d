//! Catalog search query construction.
//!
//! A query is derived from the selected day and the cursor right before each
//! fetch and never stored.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};

use crate::models::Coordinate;

/// Default half-width of the search box in degrees.
pub const DEFAULT_PADDING_DEG: f64 = 1.0;

/// Scenes requested per search.
pub const SEARCH_LIMIT: u32 = 1;

/// Last second of a UTC day, relative to midnight.
const END_OF_DAY_SECS: i64 = 86_399;

/// Rectangular query region in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BBox {
    /// Box of `padding` degrees around a coordinate on both axes.
    ///
    /// `padding` must be positive, which keeps `west < east` and `south < north`.
    #[must_use]
    pub fn around(center: Coordinate, padding: f64) -> Self {
        debug_assert!(padding > 0.0, "padding must be positive");

        Self {
            west: center.longitude - padding,
            south: center.latitude - padding,
            east: center.longitude + padding,
            north: center.latitude + padding,
        }
    }

    /// Check if a point is within the bounding box.
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }
}

impl std::fmt::Display for BBox {
    /// STAC form: `west,south,east,north`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            format_degrees(self.west),
            format_degrees(self.south),
            format_degrees(self.east),
            format_degrees(self.north)
        )
    }
}

/// Format degrees with at most six decimals and no trailing zeros.
///
/// Hides float noise such as `36.769999999999996`.
fn format_degrees(value: f64) -> String {
    let fixed = format!("{value:.6}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Closed time interval covering one full UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// `[date 00:00:00Z, date 23:59:59Z]`.
    #[must_use]
    pub fn for_day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + TimeDelta::seconds(END_OF_DAY_SECS),
        }
    }
}

impl std::fmt::Display for TimeRange {
    /// ISO 8601 interval: `start/end`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

/// One catalog search: where, when, and how many.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchQuery {
    pub bbox: BBox,
    pub datetime: TimeRange,
    pub limit: u32,
}

impl SearchQuery {
    /// Build the query for a day and a cursor position.
    #[must_use]
    pub fn new(date: NaiveDate, center: Coordinate, padding: f64) -> Self {
        Self {
            bbox: BBox::around(center, padding),
            datetime: TimeRange::for_day(date),
            limit: SEARCH_LIMIT,
        }
    }

    /// Query-string parameters in the order the catalog documents them.
    #[must_use]
    pub fn params(&self) -> [(&'static str, String); 3] {
        [
            ("datetime", self.datetime.to_string()),
            ("bbox", self.bbox.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}
