//! Command-line interface definitions and argument parsing

use crate::filter::OrderFilter;
use crate::output::OutputFormat;
use crate::report::{View, DEFAULT_TOP};
use chrono::NaiveDate;
use clap::builder::PossibleValue;
use clap::{Parser, ValueEnum};

/// Descriptive analytics over an e-commerce order-line dataset
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, env = "ORDERSCOPE_INPUT", default_value = "dataset_cleaned.csv")]
    pub input: String,

    /// Which analysis to run
    #[arg(long, value_enum, default_value_t = View::All)]
    pub view: View,

    /// Number of categories in the top-N rankings
    #[arg(short = 'n', long, default_value_t = DEFAULT_TOP)]
    pub top: usize,

    /// Keep purchases on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Keep purchases on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Keep purchases in this month (YYYY-MM)
    #[arg(long)]
    pub month: Option<String>,

    /// Keep deliveries in this time range, e.g. "6-10" or "60+"
    #[arg(long)]
    pub bucket: Option<String>,

    /// Keep this product category
    #[arg(long)]
    pub category: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the record filter from the filter flags
    pub fn order_filter(&self) -> crate::Result<OrderFilter> {
        let filter = OrderFilter {
            from: self.from.as_deref().map(parse_date).transpose()?,
            to: self.to.as_deref().map(parse_date).transpose()?,
            month: self.month.as_deref().map(str::parse).transpose()?,
            bucket: self.bucket.as_deref().map(str::parse).transpose()?,
            category: self.category.clone(),
        };
        filter.validate()?;
        Ok(filter)
    }
}

impl ValueEnum for View {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            View::Transactions,
            View::Delivery,
            View::Categories,
            View::Rfm,
            View::All,
        ]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            View::Transactions => {
                PossibleValue::new("transactions").help("Transactions per weekday and per month")
            }
            View::Delivery => {
                PossibleValue::new("delivery").help("Mean review score per delivery-time range")
            }
            View::Categories => {
                PossibleValue::new("categories").help("Most purchased and most expensive categories")
            }
            View::Rfm => PossibleValue::new("rfm").help("Recency / Frequency / Monetary per customer"),
            View::All => PossibleValue::new("all").help("Every view"),
        })
    }
}

impl ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            OutputFormat::Table => PossibleValue::new("table").help("Aligned plain-text tables"),
            OutputFormat::Json => PossibleValue::new("json").help("One JSON document"),
            OutputFormat::Csv => PossibleValue::new("csv").help("One CSV block per table"),
        })
    }
}

fn parse_date(value: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date value: {}", value))
}
