//! Data loading: order-line CSV into typed raw records using Polars

use crate::error::PipelineError;
use anyhow::Context;
use polars::prelude::*;
use std::fs::File;
use tracing::{debug, warn};

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_UNIQUE_ID: &str = "customer_unique_id";
pub const PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";
pub const DELIVERED_DATE: &str = "order_delivered_customer_date";
pub const PRODUCT_CATEGORY: &str = "product_category_name";
pub const PRICE: &str = "price";
pub const REVIEW_SCORE: &str = "review_score";

/// Columns every input table must carry
pub const REQUIRED_COLUMNS: [&str; 7] = [
    ORDER_ID,
    CUSTOMER_UNIQUE_ID,
    PURCHASE_TIMESTAMP,
    DELIVERED_DATE,
    PRODUCT_CATEGORY,
    PRICE,
    REVIEW_SCORE,
];

/// One order line as read from the source table, before any derivation.
///
/// Timestamps stay textual here; parsing them is the feature deriver's job so
/// that a bad value can be reported with its field and row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub customer_unique_id: Option<String>,
    pub order_purchase_timestamp: Option<String>,
    pub order_delivered_customer_date: Option<String>,
    pub product_category_name: Option<String>,
    /// Line item price; `NaN` in the source is read as missing
    pub price: Option<f64>,
    pub review_score: Option<f64>,
}

/// Load a CSV file with a header row into raw order records
///
/// # Arguments
/// * `file_path` - Path to the CSV file
///
/// # Returns
/// * One `RawOrder` per data row, in file order
pub fn load_orders(file_path: &str) -> crate::Result<Vec<RawOrder>> {
    let file = File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?;

    // Every column is read as text; typing happens per column below, so a
    // late decimal or hex id cannot fail the whole read.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(PipelineError::from)?;

    debug!(rows = df.height(), columns = df.width(), path = file_path, "Loaded CSV");
    if df.height() == 0 {
        warn!(path = file_path, "Input file has no data rows");
    }

    Ok(orders_from_frame(&df)?)
}

/// Convert an in-memory frame carrying the order columns into raw records
pub fn orders_from_frame(df: &DataFrame) -> Result<Vec<RawOrder>, PipelineError> {
    let order_ids = text_column(df, ORDER_ID)?;
    let customers = text_column(df, CUSTOMER_UNIQUE_ID)?;
    let purchased = text_column(df, PURCHASE_TIMESTAMP)?;
    let delivered = text_column(df, DELIVERED_DATE)?;
    let categories = text_column(df, PRODUCT_CATEGORY)?;
    let prices = numeric_column(df, PRICE)?;
    let reviews = numeric_column(df, REVIEW_SCORE)?;

    let orders = (0..df.height())
        .map(|i| RawOrder {
            order_id: order_ids[i].clone(),
            customer_unique_id: customers[i].clone(),
            order_purchase_timestamp: purchased[i].clone(),
            order_delivered_customer_date: delivered[i].clone(),
            product_category_name: categories[i].clone(),
            price: prices[i],
            review_score: reviews[i],
        })
        .collect();

    Ok(orders)
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, PipelineError> {
    df.column(name).map_err(|_| PipelineError::MissingColumn {
        column: name.to_string(),
    })
}

/// Read a column as trimmed strings; empty cells become `None`
fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PipelineError> {
    let column = require_column(df, name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

/// Read a column as floats; unparseable cells and `NaN` become `None`
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, PipelineError> {
    let column = require_column(df, name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect();
    Ok(values)
}
