pub mod closing;
pub mod prospecting;
pub mod revenue;
pub mod weekly;

use std::collections::HashMap;

/// A measure set that can absorb rows of one record domain. The three
/// domains share the reduce/group machinery below and differ only in their
/// measure structs and rate formulas.
pub trait Accumulate<R>: Default {
    fn absorb(&mut self, row: &R);
}

pub fn reduce<'a, R: 'a, M: Accumulate<R>>(rows: impl IntoIterator<Item = &'a R>) -> M {
    let mut acc = M::default();
    for row in rows {
        acc.absorb(row);
    }
    acc
}

/// Grouping key for one row: `Skip` drops the row (null-key drop policy),
/// `Value` assigns it to a partition. Bucketing null keys under an explicit
/// label is expressed by returning `Value(label)` for them.
pub enum GroupKey {
    Skip,
    Value(String),
}

/// Partitions rows by the key function; every non-skipped row lands in
/// exactly one group. Output order is unspecified; callers re-sort.
pub fn group_by<'a, R: 'a, M: Accumulate<R>>(
    rows: impl IntoIterator<Item = &'a R>,
    key: impl Fn(&R) -> GroupKey,
) -> Vec<(String, M)> {
    let mut groups: HashMap<String, M> = HashMap::new();
    for row in rows {
        match key(row) {
            GroupKey::Skip => continue,
            GroupKey::Value(label) => groups.entry(label).or_default().absorb(row),
        }
    }
    groups.into_iter().collect()
}

/// Percentage with the firm zero-denominator contract: 0, never NaN. Rates
/// are displayed directly, so this holds for every formula in the crate.
pub fn pct(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

pub fn pct_f(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

/// Mean over the present values only; 0 when none are present.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
