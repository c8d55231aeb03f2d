//! Generic group-by-and-reduce over typed records

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Partial reduction of one group. Merging is associative and commutative,
/// and the mean is only taken from the final totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Accumulator {
    pub count: usize,
    pub sum: f64,
}

impl Accumulator {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    pub fn merge(self, other: Accumulator) -> Accumulator {
        Accumulator {
            count: self.count + other.count,
            sum: self.sum + other.sum,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// How a group collapses to a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Count,
    Sum,
    Mean,
}

impl Reduction {
    fn finish(self, acc: &Accumulator) -> f64 {
        match self {
            Reduction::Count => acc.count as f64,
            Reduction::Sum => acc.sum,
            // Groups only exist once a value has been pushed.
            Reduction::Mean => acc.mean().unwrap_or(f64::NAN),
        }
    }
}

/// One output row of an aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Group<K> {
    pub key: K,
    pub value: f64,
    /// Records that contributed to this group
    pub count: usize,
}

/// Result of a group-by-reduce
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation<K> {
    /// Groups in the order their key was first seen
    pub groups: Vec<Group<K>>,
    /// Records dropped because their key or value was undefined
    pub excluded: usize,
}

/// Group `records` by `key` and reduce the `value` of each group.
///
/// Records where either selector yields `None` are left out of this
/// aggregation only; they are never folded into an empty or zero group.
pub fn group_reduce<R, K, KF, VF>(
    records: &[R],
    key: KF,
    value: VF,
    reduction: Reduction,
) -> Aggregation<K>
where
    K: Eq + Hash + Clone,
    KF: Fn(&R) -> Option<K>,
    VF: Fn(&R) -> Option<f64>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut partials: Vec<(K, Accumulator)> = Vec::new();
    let mut excluded = 0;

    for record in records {
        let (Some(k), Some(v)) = (key(record), value(record)) else {
            excluded += 1;
            continue;
        };
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            partials.push((k, Accumulator::default()));
            partials.len() - 1
        });
        partials[slot].1.push(v);
    }

    let groups = partials
        .into_iter()
        .map(|(key, acc)| Group {
            key,
            value: reduction.finish(&acc),
            count: acc.count,
        })
        .collect();

    Aggregation { groups, excluded }
}

/// Count records per key
pub fn count_by<R, K, KF>(records: &[R], key: KF) -> Aggregation<K>
where
    K: Eq + Hash + Clone,
    KF: Fn(&R) -> Option<K>,
{
    group_reduce(records, key, |_| Some(1.0), Reduction::Count)
}

/// Keep the `n` groups with the largest value. Ties keep their incoming
/// order, so first-seen keys win.
pub fn top_n<K>(mut groups: Vec<Group<K>>, n: usize) -> Vec<Group<K>> {
    groups.sort_by(|a, b| b.value.total_cmp(&a.value));
    groups.truncate(n);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Line {
        category: Option<&'static str>,
        price: Option<f64>,
    }

    fn line(category: Option<&'static str>, price: Option<f64>) -> Line {
        Line { category, price }
    }

    fn sample() -> Vec<Line> {
        vec![
            line(Some("toys"), Some(10.0)),
            line(Some("books"), Some(4.0)),
            line(None, Some(100.0)),
            line(Some("toys"), Some(20.0)),
            line(Some("garden"), None),
            line(Some("books"), Some(8.0)),
            line(Some("garden"), Some(30.0)),
        ]
    }

    #[test]
    fn test_count_keeps_first_seen_order() {
        let agg = count_by(&sample(), |l| l.category);
        let keys: Vec<_> = agg.groups.iter().map(|g| g.key).collect();

        assert_eq!(keys, vec!["toys", "books", "garden"]);
        assert_eq!(agg.groups[0].value, 2.0);
        assert_eq!(agg.groups[2].value, 2.0);
        assert_eq!(agg.excluded, 1);
    }

    #[test]
    fn test_mean_and_sum_exclude_undefined_values() {
        let records = sample();
        let mean = group_reduce(&records, |l| l.category, |l| l.price, Reduction::Mean);
        let sum = group_reduce(&records, |l| l.category, |l| l.price, Reduction::Sum);

        assert_eq!(mean.excluded, 2);
        assert_eq!(mean.groups[0].value, 15.0);
        assert_eq!(mean.groups[1].value, 6.0);
        assert_eq!(mean.groups[2].value, 30.0);
        assert_eq!(mean.groups[2].count, 1);
        assert_eq!(sum.groups[0].value, 30.0);
    }

    #[test]
    fn test_empty_input_gives_empty_table() {
        let records: Vec<Line> = Vec::new();
        let agg = count_by(&records, |l| l.category);

        assert!(agg.groups.is_empty());
        assert_eq!(agg.excluded, 0);
    }

    #[test]
    fn test_top_n_breaks_ties_by_first_seen() {
        let records = vec![
            line(Some("a"), Some(1.0)),
            line(Some("b"), Some(1.0)),
            line(Some("c"), Some(1.0)),
            line(Some("c"), Some(1.0)),
            line(Some("d"), Some(1.0)),
        ];

        for _ in 0..3 {
            let top = top_n(count_by(&records, |l| l.category).groups, 3);
            let keys: Vec<_> = top.iter().map(|g| g.key).collect();
            assert_eq!(keys, vec!["c", "a", "b"]);
        }
    }

    #[test]
    fn test_accumulator_merge_is_order_independent() {
        let mut a = Accumulator::default();
        let mut b = Accumulator::default();
        let mut c = Accumulator::default();
        a.push(1.0);
        b.push(2.0);
        b.push(4.0);
        c.push(8.0);

        let left = a.merge(b).merge(c);
        let right = c.merge(a.merge(b));
        assert_eq!(left, right);
        assert_eq!(left.mean(), Some(15.0 / 4.0));
        assert_eq!(Accumulator::default().mean(), None);
    }
}
