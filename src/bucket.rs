//! Range bucketing of continuous values, and the fixed delivery-time bins

use crate::error::PipelineError;
use crate::features::Order;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Lower edges of the delivery bins; the last bin is open-ended up to the
/// observed maximum
pub const DELIVERY_EDGES: [i64; 7] = [0, 5, 10, 15, 20, 30, 60];

/// Label used when a value falls in no bucket
pub const NO_BUCKET: &str = "no bucket";

/// Ordered set of labeled ranges over `[b0, b1], (b1, b2], ..., (bn-1, bn]`
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBucketizer {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl RangeBucketizer {
    /// Build a bucketizer from strictly ascending edges and one label per bin
    pub fn new(edges: Vec<f64>, labels: Vec<String>) -> Result<Self, PipelineError> {
        if edges.len() < 2 {
            return Err(PipelineError::InvalidBins(format!(
                "need at least two edges, got {}",
                edges.len()
            )));
        }
        if labels.len() != edges.len() - 1 {
            return Err(PipelineError::InvalidBins(format!(
                "{} edges need {} labels, got {}",
                edges.len(),
                edges.len() - 1,
                labels.len()
            )));
        }
        if edges.iter().any(|e| e.is_nan()) || edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::InvalidBins(format!(
                "edges must increase strictly: {:?}",
                edges
            )));
        }
        Ok(Self { edges, labels })
    }

    /// Index of the bin holding `value`, or `None` for undefined or
    /// out-of-range input
    pub fn index_of(&self, value: Option<f64>) -> Option<usize> {
        let value = value.filter(|v| !v.is_nan())?;
        let lowest = self.edges[0];
        if value < lowest || value > self.upper() {
            return None;
        }
        if value == lowest {
            return Some(0);
        }
        // edges[p - 1] < value <= edges[p]
        let p = self.edges.partition_point(|edge| *edge < value);
        Some(p - 1)
    }

    pub fn label_of(&self, value: Option<f64>) -> Option<&str> {
        self.index_of(value).map(|i| self.labels[i].as_str())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn upper(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }
}

/// The seven delivery-time ranges, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DeliveryBucket {
    #[serde(rename = "0-5")]
    UpTo5,
    #[serde(rename = "6-10")]
    UpTo10,
    #[serde(rename = "11-15")]
    UpTo15,
    #[serde(rename = "16-20")]
    UpTo20,
    #[serde(rename = "21-30")]
    UpTo30,
    #[serde(rename = "31-60")]
    UpTo60,
    #[serde(rename = "60+")]
    Over60,
}

impl DeliveryBucket {
    pub const ALL: [DeliveryBucket; 7] = [
        DeliveryBucket::UpTo5,
        DeliveryBucket::UpTo10,
        DeliveryBucket::UpTo15,
        DeliveryBucket::UpTo20,
        DeliveryBucket::UpTo30,
        DeliveryBucket::UpTo60,
        DeliveryBucket::Over60,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryBucket::UpTo5 => "0-5",
            DeliveryBucket::UpTo10 => "6-10",
            DeliveryBucket::UpTo15 => "11-15",
            DeliveryBucket::UpTo20 => "16-20",
            DeliveryBucket::UpTo30 => "21-30",
            DeliveryBucket::UpTo60 => "31-60",
            DeliveryBucket::Over60 => "60+",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for DeliveryBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DeliveryBucket {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|bucket| bucket.label() == s.trim())
            .ok_or_else(|| {
                PipelineError::InvalidFilter(format!(
                    "unknown delivery bucket {:?}, expected one of {}",
                    s,
                    Self::ALL.map(|b| b.label()).join(", ")
                ))
            })
    }
}

/// Delivery-time bins whose upper edge follows the data
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryBucketizer {
    ranges: RangeBucketizer,
    upper: i64,
}

impl DeliveryBucketizer {
    /// Build the bins for a dataset whose largest delivery time is
    /// `max_observed`. The open bin always spans at least one day past 60 so
    /// edges stay strictly ascending.
    pub fn new(max_observed: Option<i64>) -> Self {
        let last_edge = DELIVERY_EDGES[DELIVERY_EDGES.len() - 1];
        let upper = max_observed.unwrap_or(last_edge).max(last_edge + 1);

        let edges = DELIVERY_EDGES
            .iter()
            .chain(std::iter::once(&upper))
            .map(|&e| e as f64)
            .collect();
        let labels = DeliveryBucket::ALL
            .iter()
            .map(|b| b.label().to_string())
            .collect();

        // Edges are ascending by construction.
        let ranges = RangeBucketizer { edges, labels };
        Self { ranges, upper }
    }

    /// Bins sized to the largest delivery time among `orders`
    pub fn from_orders(orders: &[Order]) -> Self {
        Self::new(orders.iter().filter_map(|o| o.delivery_time).max())
    }

    pub fn bucket(&self, delivery_time: Option<i64>) -> Option<DeliveryBucket> {
        self.ranges
            .index_of(delivery_time.map(|d| d as f64))
            .and_then(DeliveryBucket::from_index)
    }

    /// Upper edge of the open-ended bin
    pub fn upper(&self) -> i64 {
        self.upper
    }
}

/// Render an optional bucket the way the output tables show it
pub fn bucket_label(bucket: Option<DeliveryBucket>) -> &'static str {
    bucket.map_or(NO_BUCKET, |b| b.label())
}
