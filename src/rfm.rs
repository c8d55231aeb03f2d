//! Recency / Frequency / Monetary computation per customer

use crate::error::PipelineError;
use crate::features::{whole_days, Order};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// RFM metrics for one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRecord {
    pub customer_id: String,
    /// Days from the customer's latest purchase to the reference date
    #[serde(rename = "Recency")]
    pub recency: i64,
    /// Number of order lines, not distinct orders
    #[serde(rename = "Frequency")]
    pub frequency: usize,
    /// Sum of line prices, missing prices counting as 0
    #[serde(rename = "Monetary")]
    pub monetary: f64,
}

/// Min / mean / max of one RFM metric across customers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl MetricSummary {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        let (count, sum, min, max) = values.fold(
            (0usize, 0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(count, sum, min, max), v| (count + 1, sum + v, min.min(v), max.max(v)),
        );
        (count > 0).then(|| Self {
            min,
            mean: sum / count as f64,
            max,
        })
    }
}

/// Distribution overview of an RFM table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RfmSummary {
    pub customers: usize,
    pub recency: MetricSummary,
    pub frequency: MetricSummary,
    pub monetary: MetricSummary,
}

/// RFM rows for every customer, computed against one reference date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmTable {
    pub reference_date: NaiveDateTime,
    /// One row per customer, ordered by customer id
    pub rows: Vec<RfmRecord>,
    /// Records without a customer id
    pub excluded: usize,
}

impl RfmTable {
    pub fn get(&self, customer_id: &str) -> Option<&RfmRecord> {
        self.rows
            .binary_search_by(|row| row.customer_id.as_str().cmp(customer_id))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn summary(&self) -> Option<RfmSummary> {
        Some(RfmSummary {
            customers: self.rows.len(),
            recency: MetricSummary::of(self.rows.iter().map(|r| r.recency as f64))?,
            frequency: MetricSummary::of(self.rows.iter().map(|r| r.frequency as f64))?,
            monetary: MetricSummary::of(self.rows.iter().map(|r| r.monetary))?,
        })
    }
}

/// Latest purchase timestamp across `orders`
pub fn reference_date(orders: &[Order]) -> Result<NaiveDateTime, PipelineError> {
    orders
        .iter()
        .map(|o| o.purchased_at)
        .max()
        .ok_or(PipelineError::EmptyDataset(
            "cannot derive an RFM reference date from zero records",
        ))
}

/// Computes RFM rows against a fixed reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfmCalculator {
    reference: NaiveDateTime,
}

impl RfmCalculator {
    /// Use the latest purchase in `orders` as the reference date. Pass the
    /// full, unfiltered record set here.
    pub fn from_orders(orders: &[Order]) -> Result<Self, PipelineError> {
        Ok(Self::with_reference(reference_date(orders)?))
    }

    /// Pin the reference date. Recency can go negative if any purchase is
    /// later than `reference`.
    pub fn with_reference(reference: NaiveDateTime) -> Self {
        Self { reference }
    }

    pub fn compute(&self, orders: &[Order]) -> RfmTable {
        struct Acc {
            latest: NaiveDateTime,
            frequency: usize,
            monetary: f64,
        }

        let mut customers: BTreeMap<&str, Acc> = BTreeMap::new();
        let mut excluded = 0;

        for order in orders {
            let Some(customer) = order.customer_unique_id.as_deref() else {
                excluded += 1;
                continue;
            };
            let acc = customers.entry(customer).or_insert(Acc {
                latest: order.purchased_at,
                frequency: 0,
                monetary: 0.0,
            });
            acc.latest = acc.latest.max(order.purchased_at);
            acc.frequency += 1;
            acc.monetary += order.price.unwrap_or(0.0);
        }

        if excluded > 0 {
            warn!(records = excluded, "Records without customer id excluded from RFM");
        }

        let rows: Vec<RfmRecord> = customers
            .into_iter()
            .map(|(customer, acc)| RfmRecord {
                customer_id: customer.to_string(),
                recency: whole_days(self.reference - acc.latest),
                frequency: acc.frequency,
                monetary: acc.monetary,
            })
            .collect();

        debug!(customers = rows.len(), reference = %self.reference, "Computed RFM");

        RfmTable {
            reference_date: self.reference,
            rows,
            excluded,
        }
    }
}

/// Compute RFM over the full record set, using its latest purchase as the
/// reference date. Fails on an empty record set.
pub fn compute_rfm(orders: &[Order]) -> Result<RfmTable, PipelineError> {
    Ok(RfmCalculator::from_orders(orders)?.compute(orders))
}
