//! Rendering of report tables for the presentation layer

use crate::report::Report;
use polars::prelude::*;

/// Output encoding for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned plain-text tables
    #[default]
    Table,
    /// One JSON document with every requested table
    Json,
    /// One CSV block per table, each preceded by a `# name` line
    Csv,
}

/// A named table of already-formatted cells
struct TextTable {
    name: &'static str,
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let line = |cells: Vec<&str>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = format!("=== {} ===\n", self.name);
        out.push_str(&line(self.headers.clone()));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&line(rule.iter().map(String::as_str).collect()));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
            out.push('\n');
        }
        out
    }
}

fn tables(report: &Report) -> Vec<TextTable> {
    let mut tables = Vec::new();

    if let Some(pattern) = &report.transactions {
        tables.push(TextTable {
            name: "transactions_by_weekday",
            headers: vec!["day_name", "count"],
            rows: pattern
                .by_weekday
                .iter()
                .map(|d| vec![d.day_name.to_string(), d.count.to_string()])
                .collect(),
        });
        tables.push(TextTable {
            name: "transactions_by_month",
            headers: vec!["year_month", "count"],
            rows: pattern
                .by_month
                .iter()
                .map(|m| vec![m.year_month.to_string(), m.count.to_string()])
                .collect(),
        });
    }

    if let Some(delivery) = &report.delivery {
        tables.push(TextTable {
            name: "review_by_delivery_time",
            headers: vec!["bucket_label", "mean_review_score"],
            rows: delivery
                .rows
                .iter()
                .map(|r| vec![r.bucket_label.to_string(), format!("{:.2}", r.mean_review_score)])
                .collect(),
        });
    }

    if let Some(categories) = &report.categories {
        tables.push(TextTable {
            name: "top_categories_by_count",
            headers: vec!["category", "count"],
            rows: categories
                .top_by_count
                .iter()
                .map(|c| vec![c.category.clone(), c.count.to_string()])
                .collect(),
        });
        tables.push(TextTable {
            name: "top_categories_by_mean_price",
            headers: vec!["category", "mean_price"],
            rows: categories
                .top_by_mean_price
                .iter()
                .map(|c| vec![c.category.clone(), format!("{:.2}", c.mean_price)])
                .collect(),
        });
    }

    if let Some(rfm) = &report.rfm {
        tables.push(TextTable {
            name: "rfm",
            headers: vec!["customer_id", "Recency", "Frequency", "Monetary"],
            rows: rfm
                .table
                .rows
                .iter()
                .map(|r| {
                    vec![
                        r.customer_id.clone(),
                        r.recency.to_string(),
                        r.frequency.to_string(),
                        format!("{:.2}", r.monetary),
                    ]
                })
                .collect(),
        });
    }

    tables
}

/// Print every table as aligned text
pub fn render_table(report: &Report) -> String {
    let mut out = String::new();
    if let Some(rfm) = report.rfm.as_ref() {
        out.push_str(&format!("RFM reference date: {}\n", rfm.table.reference_date));
        if let Some(summary) = rfm.summary {
            out.push_str(&format!(
                "Customers: {} | Recency {:.0}..{:.0} (mean {:.1}) | Frequency {:.0}..{:.0} (mean {:.2}) | Monetary {:.2}..{:.2} (mean {:.2})\n",
                summary.customers,
                summary.recency.min,
                summary.recency.max,
                summary.recency.mean,
                summary.frequency.min,
                summary.frequency.max,
                summary.frequency.mean,
                summary.monetary.min,
                summary.monetary.max,
                summary.monetary.mean,
            ));
        }
        out.push('\n');
    }
    let rendered: Vec<String> = tables(report).iter().map(TextTable::render).collect();
    out.push_str(&rendered.join("\n"));
    out
}

/// Serialise the whole report as pretty JSON
pub fn render_json(report: &Report) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Convert a text table to a Polars frame of string columns
fn to_frame(table: &TextTable) -> PolarsResult<DataFrame> {
    let columns = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let values: Vec<&str> = table.rows.iter().map(|row| row[i].as_str()).collect();
            Column::new((*header).into(), values)
        })
        .collect();
    DataFrame::new(columns)
}

/// Write every table as a CSV block using Polars' writer
pub fn render_csv(report: &Report) -> crate::Result<String> {
    let mut out = Vec::new();
    for table in tables(report) {
        let mut df = to_frame(&table)?;
        out.extend_from_slice(format!("# {}\n", table.name).as_bytes());
        CsvWriter::new(&mut out).include_header(true).finish(&mut df)?;
    }
    Ok(String::from_utf8(out)?)
}

pub fn render(report: &Report, format: OutputFormat) -> crate::Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(report)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Csv => render_csv(report),
    }
}
