//! orderscope: descriptive analytics over e-commerce order transactions
//!
//! Derives calendar features from order lines, buckets delivery durations,
//! aggregates by weekday, month and category, and computes per-customer
//! RFM (Recency, Frequency, Monetary) metrics.

pub mod aggregate;
pub mod bucket;
pub mod cli;
pub mod data;
pub mod error;
pub mod features;
pub mod filter;
pub mod output;
pub mod report;
pub mod rfm;

// Re-export public items for easier access
pub use aggregate::{count_by, group_reduce, top_n, Accumulator, Aggregation, Group, Reduction};
pub use bucket::{DeliveryBucket, DeliveryBucketizer, RangeBucketizer};
pub use cli::Args;
pub use data::{load_orders, orders_from_frame, RawOrder};
pub use error::PipelineError;
pub use features::{derive_features, Order, YearMonth};
pub use filter::OrderFilter;
pub use report::{build_report, Report, View};
pub use rfm::{compute_rfm, RfmCalculator, RfmRecord, RfmTable};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
