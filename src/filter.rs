//! Predicate filters that narrow the record set before aggregation

use crate::bucket::{DeliveryBucket, DeliveryBucketizer};
use crate::error::PipelineError;
use crate::features::{Order, YearMonth};
use chrono::NaiveDate;
use tracing::debug;

/// Optional selections on purchase date, month, delivery bucket and
/// category. Set criteria are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    /// First purchase date to keep, inclusive
    pub from: Option<NaiveDate>,
    /// Last purchase date to keep, inclusive
    pub to: Option<NaiveDate>,
    pub month: Option<YearMonth>,
    pub bucket: Option<DeliveryBucket>,
    pub category: Option<String>,
}

impl OrderFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(PipelineError::InvalidFilter(format!(
                    "date range start {} is after end {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    fn matches(&self, order: &Order) -> bool {
        let date = order.purchased_at.date();
        self.from.is_none_or(|from| date >= from)
            && self.to.is_none_or(|to| date <= to)
            && self.month.is_none_or(|month| month.contains(&order.purchased_at))
            && self.category.as_deref().is_none_or(|category| {
                order.product_category_name.as_deref() == Some(category)
            })
    }

    /// Select the matching records.
    ///
    /// The bucket criterion is applied last, against bins rebuilt from the
    /// largest delivery time among the records the other criteria kept.
    pub fn apply(&self, orders: &[Order]) -> Result<Vec<Order>, PipelineError> {
        self.validate()?;

        let mut selected: Vec<Order> = orders.iter().filter(|o| self.matches(o)).cloned().collect();

        if let Some(bucket) = self.bucket {
            let bucketizer = DeliveryBucketizer::from_orders(&selected);
            selected.retain(|o| bucketizer.bucket(o.delivery_time) == Some(bucket));
        }

        debug!(kept = selected.len(), total = orders.len(), "Applied filter");
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawOrder;
    use crate::features::derive_features;

    fn orders() -> Vec<Order> {
        let raw = |purchased: &str, delivered: Option<&str>, category: Option<&str>| RawOrder {
            order_id: Some(purchased.to_string()),
            customer_unique_id: Some("c".to_string()),
            order_purchase_timestamp: Some(purchased.to_string()),
            order_delivered_customer_date: delivered.map(str::to_string),
            product_category_name: category.map(str::to_string),
            price: Some(1.0),
            review_score: Some(5.0),
        };
        derive_features(&[
            raw("2018-01-05 10:00:00", Some("2018-01-08 10:00:00"), Some("toys")),
            raw("2018-01-31 23:59:59", Some("2018-03-15 10:00:00"), Some("books")),
            raw("2018-02-01 00:00:00", None, Some("toys")),
            raw("2018-03-10 12:00:00", Some("2018-03-20 12:00:00"), None),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = OrderFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&orders()).unwrap().len(), 4);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = OrderFilter {
            from: NaiveDate::from_ymd_opt(2018, 1, 31),
            to: NaiveDate::from_ymd_opt(2018, 2, 1),
            ..Default::default()
        };
        let kept = filter.apply(&orders()).unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_month_and_category() {
        let filter = OrderFilter {
            month: YearMonth::new(2018, 1),
            category: Some("toys".to_string()),
            ..Default::default()
        };
        let kept = filter.apply(&orders()).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].delivery_time, Some(3));
    }

    #[test]
    fn test_bucket_uses_refreshed_max() {
        // The longest delivery overall is 42 days; March alone has one of 10.
        let filter = OrderFilter {
            month: YearMonth::new(2018, 3),
            bucket: Some(DeliveryBucket::UpTo10),
            ..Default::default()
        };
        let kept = filter.apply(&orders()).unwrap();
        assert_eq!(kept.len(), 1);

        let undelivered = OrderFilter {
            bucket: Some(DeliveryBucket::UpTo5),
            ..Default::default()
        };
        let kept = undelivered.apply(&orders()).unwrap();
        assert!(kept.iter().all(|o| o.delivery_time.is_some()));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let filter = OrderFilter {
            from: NaiveDate::from_ymd_opt(2018, 2, 1),
            to: NaiveDate::from_ymd_opt(2018, 1, 1),
            ..Default::default()
        };
        assert!(matches!(filter.apply(&orders()), Err(PipelineError::InvalidFilter(_))));
    }
}
