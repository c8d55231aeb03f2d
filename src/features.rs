//! Calendar feature derivation for order lines

use crate::data::{RawOrder, DELIVERED_DATE, PURCHASE_TIMESTAMP};
use crate::error::PipelineError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Weekday};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

const SECONDS_PER_DAY: i64 = 86_400;

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Calendar month key, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month a timestamp falls in
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        Self::of(timestamp) == *self
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PipelineError::InvalidFilter(format!("expected YYYY-MM, got {:?}", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An order line with parsed timestamps and derived calendar fields
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: Option<String>,
    pub customer_unique_id: Option<String>,
    pub purchased_at: NaiveDateTime,
    pub delivered_at: Option<NaiveDateTime>,
    pub product_category_name: Option<String>,
    pub price: Option<f64>,
    pub review_score: Option<f64>,
    pub day_of_week: Weekday,
    pub month: YearMonth,
    /// Whole days from purchase to delivery; negative when the source data
    /// has delivery before purchase, `None` when not delivered
    pub delivery_time: Option<i64>,
}

/// Parse a source timestamp. Timezone-qualified values are normalised to UTC;
/// a bare date means midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Floor a duration to whole days, so -1h counts as day -1
pub fn whole_days(delta: TimeDelta) -> i64 {
    delta.num_seconds().div_euclid(SECONDS_PER_DAY)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Derive calendar fields for a single raw record
///
/// # Arguments
/// * `row` - Zero-based position of the record, used in error reports
/// * `raw` - The raw record
pub fn derive_order(row: usize, raw: &RawOrder) -> Result<Order, PipelineError> {
    let purchased_at = raw
        .order_purchase_timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| PipelineError::InvalidTimestamp {
            field: PURCHASE_TIMESTAMP,
            row,
            value: raw.order_purchase_timestamp.clone().unwrap_or_default(),
        })?;

    let delivered_at = match raw.order_delivered_customer_date.as_deref() {
        None => None,
        Some(value) => Some(parse_timestamp(value).ok_or_else(|| {
            PipelineError::InvalidTimestamp {
                field: DELIVERED_DATE,
                row,
                value: value.to_string(),
            }
        })?),
    };

    Ok(Order {
        order_id: raw.order_id.clone(),
        customer_unique_id: raw.customer_unique_id.clone(),
        purchased_at,
        delivered_at,
        product_category_name: raw.product_category_name.clone(),
        price: raw.price,
        review_score: raw.review_score,
        day_of_week: purchased_at.weekday(),
        month: YearMonth::of(&purchased_at),
        delivery_time: delivered_at.map(|delivered| whole_days(delivered - purchased_at)),
    })
}

/// Derive calendar fields for every record. Any unparseable timestamp fails
/// the whole run.
pub fn derive_features(raw: &[RawOrder]) -> Result<Vec<Order>, PipelineError> {
    let orders = raw
        .iter()
        .enumerate()
        .map(|(row, record)| derive_order(row, record))
        .collect::<Result<Vec<_>, _>>()?;

    let undelivered = orders.iter().filter(|o| o.delivery_time.is_none()).count();
    let negative = orders
        .iter()
        .filter(|o| o.delivery_time.is_some_and(|d| d < 0))
        .count();
    debug!(records = orders.len(), undelivered, "Derived calendar features");
    if negative > 0 {
        warn!(records = negative, "Delivery recorded before purchase");
    }

    Ok(orders)
}
