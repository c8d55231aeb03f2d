//! The analysis views: transaction patterns, delivery vs review score,
//! category popularity and RFM

use crate::aggregate::{count_by, group_reduce, top_n, Reduction};
use crate::bucket::{DeliveryBucket, DeliveryBucketizer};
use crate::error::PipelineError;
use crate::features::{weekday_name, Order, YearMonth};
use crate::filter::OrderFilter;
use crate::rfm::{compute_rfm, RfmSummary, RfmTable};
use serde::Serialize;
use tracing::{info, warn};

/// Default length of the category rankings
pub const DEFAULT_TOP: usize = 10;

/// Which views to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Transactions per weekday and per month
    Transactions,
    /// Mean review score per delivery-time range
    Delivery,
    /// Most purchased and most expensive categories
    Categories,
    /// Recency / Frequency / Monetary per customer
    Rfm,
    #[default]
    All,
}

impl View {
    fn includes(self, other: View) -> bool {
        self == View::All || self == other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub day_name: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCount {
    pub year_month: YearMonth,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPattern {
    /// Monday first; weekdays with no purchases are absent
    pub by_weekday: Vec<DayCount>,
    /// Chronological
    pub by_month: Vec<MonthCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketReview {
    pub bucket_label: DeliveryBucket,
    pub mean_review_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReview {
    /// Upper edge of the open-ended bin for this record set
    pub max_delivery_time: i64,
    pub rows: Vec<BucketReview>,
    pub missing_delivery: usize,
    pub unbucketed: usize,
    pub missing_review: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPrice {
    pub category: String,
    pub mean_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPopularity {
    pub top_by_count: Vec<CategoryCount>,
    pub top_by_mean_price: Vec<CategoryPrice>,
    pub missing_category: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmView {
    pub table: RfmTable,
    pub summary: Option<RfmSummary>,
}

/// Every requested view for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Records left after filtering, used by all views except RFM
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<TransactionPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryReview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<CategoryPopularity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfm: Option<RfmView>,
}

/// Purchase counts per weekday and per month
pub fn transaction_pattern(orders: &[Order]) -> TransactionPattern {
    let mut weekdays = count_by(orders, |o| Some(o.day_of_week)).groups;
    weekdays.sort_by_key(|g| g.key.num_days_from_monday());

    // Every month present gets a row; its count is the order ids it holds.
    let months = group_reduce(
        orders,
        |o| Some(o.month),
        |o| Some(if o.order_id.is_some() { 1.0 } else { 0.0 }),
        Reduction::Sum,
    );
    let missing_ids = orders.iter().filter(|o| o.order_id.is_none()).count();
    if missing_ids > 0 {
        warn!(records = missing_ids, "Records without order id not counted in monthly totals");
    }
    let mut months = months.groups;
    months.sort_by_key(|g| g.key);

    TransactionPattern {
        by_weekday: weekdays
            .into_iter()
            .map(|g| DayCount {
                day_name: weekday_name(g.key),
                count: g.count,
            })
            .collect(),
        by_month: months
            .into_iter()
            .map(|g| MonthCount {
                year_month: g.key,
                count: g.value as usize,
            })
            .collect(),
    }
}

/// Mean review score per delivery-time range
pub fn delivery_review(orders: &[Order]) -> DeliveryReview {
    let bucketizer = DeliveryBucketizer::from_orders(orders);

    let missing_delivery = orders.iter().filter(|o| o.delivery_time.is_none()).count();
    let unbucketed = orders
        .iter()
        .filter(|o| o.delivery_time.is_some() && bucketizer.bucket(o.delivery_time).is_none())
        .count();

    let agg = group_reduce(
        orders,
        |o| bucketizer.bucket(o.delivery_time),
        |o| o.review_score,
        Reduction::Mean,
    );
    let missing_review = agg.excluded - missing_delivery - unbucketed;

    if missing_delivery > 0 {
        warn!(records = missing_delivery, "Records excluded from delivery analysis for missing delivery date");
    }
    if unbucketed > 0 {
        warn!(records = unbucketed, "Records excluded from delivery analysis for out-of-range delivery time");
    }
    if missing_review > 0 {
        warn!(records = missing_review, "Records excluded from delivery analysis for missing review score");
    }

    let mut groups = agg.groups;
    groups.sort_by_key(|g| g.key);

    DeliveryReview {
        max_delivery_time: bucketizer.upper(),
        rows: groups
            .into_iter()
            .map(|g| BucketReview {
                bucket_label: g.key,
                mean_review_score: g.value,
            })
            .collect(),
        missing_delivery,
        unbucketed,
        missing_review,
    }
}

/// Top categories by purchase count and by mean price
pub fn category_popularity(orders: &[Order], top: usize) -> CategoryPopularity {
    let category = |o: &Order| o.product_category_name.clone();

    let counts = count_by(orders, category);
    let prices = group_reduce(orders, category, |o| o.price, Reduction::Mean);

    if counts.excluded > 0 {
        warn!(records = counts.excluded, "Records excluded from category analysis for missing category");
    }
    let missing_price = prices.excluded - counts.excluded;
    if missing_price > 0 {
        warn!(records = missing_price, "Records excluded from category price for missing price");
    }

    CategoryPopularity {
        top_by_count: top_n(counts.groups, top)
            .into_iter()
            .map(|g| CategoryCount {
                category: g.key,
                count: g.count,
            })
            .collect(),
        top_by_mean_price: top_n(prices.groups, top)
            .into_iter()
            .map(|g| CategoryPrice {
                category: g.key,
                mean_price: g.value,
            })
            .collect(),
        missing_category: counts.excluded,
    }
}

/// Build the requested views.
///
/// # Arguments
/// * `orders` - The full derived record set
/// * `filter` - Narrows the records for every view except RFM
/// * `view` - Which views to build
/// * `top` - Length of the category rankings
///
/// # Returns
/// * The report; fails if the filter is invalid, or if RFM is requested on an
///   empty record set
pub fn build_report(
    orders: &[Order],
    filter: &OrderFilter,
    view: View,
    top: usize,
) -> Result<Report, PipelineError> {
    let selected = filter.apply(orders)?;

    let mut report = Report {
        records: selected.len(),
        ..Default::default()
    };

    if view.includes(View::Transactions) {
        report.transactions = Some(transaction_pattern(&selected));
    }
    if view.includes(View::Delivery) {
        report.delivery = Some(delivery_review(&selected));
    }
    if view.includes(View::Categories) {
        report.categories = Some(category_popularity(&selected, top));
    }
    if view.includes(View::Rfm) {
        // The reference date must come from the unfiltered set.
        let table = compute_rfm(orders)?;
        let summary = table.summary();
        report.rfm = Some(RfmView { table, summary });
    }

    info!(records = orders.len(), selected = selected.len(), ?view, "Report built");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawOrder;
    use crate::features::derive_features;

    struct Line {
        customer: &'static str,
        purchased: &'static str,
        delivered: Option<&'static str>,
        category: Option<&'static str>,
        price: Option<f64>,
        review: Option<f64>,
    }

    fn build(lines: &[Line]) -> Vec<Order> {
        let raw: Vec<RawOrder> = lines
            .iter()
            .enumerate()
            .map(|(i, l)| RawOrder {
                order_id: Some(format!("o{}", i)),
                customer_unique_id: Some(l.customer.to_string()),
                order_purchase_timestamp: Some(l.purchased.to_string()),
                order_delivered_customer_date: l.delivered.map(str::to_string),
                product_category_name: l.category.map(str::to_string),
                price: l.price,
                review_score: l.review,
            })
            .collect();
        derive_features(&raw).unwrap()
    }

    fn sample() -> Vec<Order> {
        build(&[
            // Monday
            Line { customer: "a", purchased: "2018-01-01 10:00:00", delivered: Some("2018-01-04 10:00:00"), category: Some("toys"), price: Some(10.0), review: Some(5.0) },
            // Wednesday
            Line { customer: "b", purchased: "2018-01-03 10:00:00", delivered: Some("2018-01-05 10:00:00"), category: Some("books"), price: Some(40.0), review: Some(3.0) },
            // Monday, next year
            Line { customer: "a", purchased: "2019-01-07 10:00:00", delivered: Some("2019-03-20 10:00:00"), category: Some("toys"), price: Some(20.0), review: Some(1.0) },
            // Sunday, never delivered
            Line { customer: "c", purchased: "2018-02-04 10:00:00", delivered: None, category: None, price: None, review: None },
            // Friday, delivered 8 days later without a review
            Line { customer: "c", purchased: "2018-02-09 10:00:00", delivered: Some("2018-02-17 10:00:00"), category: Some("garden"), price: Some(40.0), review: None },
        ])
    }

    #[test]
    fn test_weekday_and_month_counts() {
        let pattern = transaction_pattern(&sample());

        let days: Vec<_> = pattern.by_weekday.iter().map(|d| (d.day_name, d.count)).collect();
        assert_eq!(days, vec![("Monday", 2), ("Wednesday", 1), ("Friday", 1), ("Sunday", 1)]);

        let months: Vec<_> = pattern
            .by_month
            .iter()
            .map(|m| (m.year_month.to_string(), m.count))
            .collect();
        assert_eq!(
            months,
            vec![("2018-01".to_string(), 2), ("2018-02".to_string(), 2), ("2019-01".to_string(), 1)]
        );
    }

    #[test]
    fn test_month_without_order_ids_keeps_its_row() {
        let mut orders = build(&[
            Line { customer: "a", purchased: "2018-01-01 10:00:00", delivered: None, category: None, price: None, review: None },
            Line { customer: "b", purchased: "2018-02-02 10:00:00", delivered: None, category: None, price: None, review: None },
        ]);
        orders[1].order_id = None;

        let pattern = transaction_pattern(&orders);
        let months: Vec<_> = pattern
            .by_month
            .iter()
            .map(|m| (m.year_month.to_string(), m.count))
            .collect();
        assert_eq!(months, vec![("2018-01".to_string(), 1), ("2018-02".to_string(), 0)]);
        assert_eq!(pattern.by_weekday.len(), 2);
    }

    #[test]
    fn test_delivery_review_means_and_exclusions() {
        let review = delivery_review(&sample());

        let rows: Vec<_> = review
            .rows
            .iter()
            .map(|r| (r.bucket_label.label(), r.mean_review_score))
            .collect();
        assert_eq!(rows, vec![("0-5", 4.0), ("60+", 1.0)]);
        assert_eq!(review.max_delivery_time, 72);
        assert_eq!(review.missing_delivery, 1);
        assert_eq!(review.unbucketed, 0);
        assert_eq!(review.missing_review, 1);
    }

    #[test]
    fn test_negative_delivery_is_unbucketed() {
        let orders = build(&[
            Line { customer: "a", purchased: "2018-01-10 10:00:00", delivered: Some("2018-01-08 10:00:00"), category: None, price: None, review: Some(1.0) },
            Line { customer: "a", purchased: "2018-01-10 10:00:00", delivered: Some("2018-01-12 10:00:00"), category: None, price: None, review: Some(4.0) },
        ]);
        let review = delivery_review(&orders);

        assert_eq!(review.unbucketed, 1);
        assert_eq!(review.rows.len(), 1);
        assert_eq!(review.rows[0].mean_review_score, 4.0);
    }

    #[test]
    fn test_category_rankings() {
        let popularity = category_popularity(&sample(), 2);

        let counts: Vec<_> = popularity
            .top_by_count
            .iter()
            .map(|c| (c.category.as_str(), c.count))
            .collect();
        assert_eq!(counts, vec![("toys", 2), ("books", 1)]);

        let prices: Vec<_> = popularity
            .top_by_mean_price
            .iter()
            .map(|c| (c.category.as_str(), c.mean_price))
            .collect();
        assert_eq!(prices, vec![("books", 40.0), ("garden", 40.0)]);
        assert_eq!(popularity.missing_category, 1);
    }

    #[test]
    fn test_rfm_ignores_filter() {
        let filter = OrderFilter {
            category: Some("books".to_string()),
            ..Default::default()
        };
        let report = build_report(&sample(), &filter, View::All, DEFAULT_TOP).unwrap();

        assert_eq!(report.records, 1);
        let rfm = report.rfm.unwrap();
        assert_eq!(rfm.table.rows.len(), 3);
        assert_eq!(rfm.table.get("b").unwrap().recency, 369);
    }

    #[test]
    fn test_single_view() {
        let report = build_report(&sample(), &OrderFilter::default(), View::Delivery, DEFAULT_TOP).unwrap();
        assert!(report.delivery.is_some());
        assert!(report.transactions.is_none());
        assert!(report.categories.is_none());
        assert!(report.rfm.is_none());
    }

    #[test]
    fn test_empty_input() {
        let orders: Vec<Order> = Vec::new();
        let pattern = transaction_pattern(&orders);
        assert!(pattern.by_weekday.is_empty());
        assert!(pattern.by_month.is_empty());

        let tables = build_report(&orders, &OrderFilter::default(), View::Transactions, DEFAULT_TOP);
        assert!(tables.is_ok());

        let rfm = build_report(&orders, &OrderFilter::default(), View::All, DEFAULT_TOP);
        assert!(matches!(rfm, Err(PipelineError::EmptyDataset(_))));
    }
}
