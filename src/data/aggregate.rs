//! Grouped counting over a record set.
//!
//! Every function here is pure and independent of input order: results live
//! in ordered maps, and any order exposed to callers comes from
//! [`crate::data::project`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::error::{CatalogError, Result};
use super::model::{Field, FieldKind, GroupKey, Record};
use super::project::{to_series, KeyOrder};

// ---------------------------------------------------------------------------
// Counts – single-key aggregation result
// ---------------------------------------------------------------------------

/// Group key → record count for one field.
///
/// `order` records how the aggregation that produced this result wants it
/// reported; see [`Counts::series`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counts {
    field: Field,
    order: KeyOrder,
    counts: BTreeMap<GroupKey, u64>,
}

impl Counts {
    pub fn new(field: Field, order: KeyOrder) -> Self {
        Counts {
            field,
            order,
            counts: BTreeMap::new(),
        }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn order(&self) -> KeyOrder {
        self.order
    }

    pub fn get(&self, key: &GroupKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.counts.keys()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Add another partial result for the same field key-wise.
    pub fn merge(&mut self, other: &Counts) -> Result<()> {
        if other.field != self.field {
            return Err(CatalogError::InvalidParameter(format!(
                "cannot merge counts on '{}' into counts on '{}'",
                other.field, self.field
            )));
        }
        for (key, n) in &other.counts {
            *self.counts.entry(key.clone()).or_default() += n;
        }
        Ok(())
    }

    /// Entries in this result's preferred order.
    pub fn series(&self) -> Vec<(GroupKey, u64)> {
        to_series(self, self.order)
    }

    fn bump(&mut self, key: GroupKey) {
        *self.counts.entry(key).or_default() += 1;
    }
}

// ---------------------------------------------------------------------------
// Single-key value counts and top-N
// ---------------------------------------------------------------------------

/// Count records per distinct value of `field`, skipping missing values.
pub fn value_counts<'a, I>(records: I, field: Field) -> Counts
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts = Counts::new(field, KeyOrder::CountDescending);
    for record in records {
        if let Some(key) = record.value(field) {
            counts.bump(key);
        }
    }
    counts
}

/// Keep the `n` highest-count keys of `counts`; ties go to the smaller key.
///
/// `n` is signed so that a negative request from a caller is reported rather
/// than wrapped.
pub fn top_n(counts: &Counts, n: i64) -> Result<Counts> {
    if n < 0 {
        return Err(CatalogError::InvalidParameter(format!(
            "top-N needs N >= 0, got {n}"
        )));
    }
    let keep = usize::try_from(n).unwrap_or(usize::MAX);
    let mut top = Counts::new(counts.field, KeyOrder::CountDescending);
    for (key, count) in to_series(counts, KeyOrder::CountDescending)
        .into_iter()
        .take(keep)
    {
        top.counts.insert(key, count);
    }
    Ok(top)
}

// ---------------------------------------------------------------------------
// Time-bucketed counts
// ---------------------------------------------------------------------------

/// Truncation applied to calendar values before counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Year,
    /// Keyed `YYYY-MM`.
    Month,
    Day,
}

/// Count records per calendar bucket of `field`, skipping missing values.
///
/// `field` must be a date or year field; a year field only supports
/// [`Granularity::Year`].
pub fn time_buckets<'a, I>(records: I, field: Field, granularity: Granularity) -> Result<Counts>
where
    I: IntoIterator<Item = &'a Record>,
{
    match (field.kind(), granularity) {
        (FieldKind::Categorical, _) => {
            return Err(CatalogError::InvalidParameter(format!(
                "'{field}' is not a calendar field"
            )))
        }
        (FieldKind::Year, Granularity::Month | Granularity::Day) => {
            return Err(CatalogError::InvalidParameter(format!(
                "'{field}' only supports yearly buckets"
            )))
        }
        _ => {}
    }

    let mut counts = Counts::new(field, KeyOrder::KeyAscending);
    for record in records {
        let bucket = match field.kind() {
            FieldKind::Date => record.date_added.map(|d| match granularity {
                Granularity::Year => GroupKey::Int(i64::from(d.year())),
                Granularity::Month => GroupKey::Text(format!("{:04}-{:02}", d.year(), d.month())),
                Granularity::Day => GroupKey::Date(d),
            }),
            _ => record.ordinal(field).map(GroupKey::Int),
        };
        if let Some(key) = bucket {
            counts.bump(key);
        }
    }
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Cross-tabulation
// ---------------------------------------------------------------------------

/// (row key, column key) → record count over two fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTab {
    rows: Field,
    cols: Field,
    cells: BTreeMap<(GroupKey, GroupKey), u64>,
}

impl CrossTab {
    pub fn row_field(&self) -> Field {
        self.rows
    }

    pub fn col_field(&self) -> Field {
        self.cols
    }

    pub fn get(&self, row: &GroupKey, col: &GroupKey) -> u64 {
        // BTreeMap lookup needs an owned tuple key.
        self.cells
            .get(&(row.clone(), col.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Non-zero cells in ascending (row, col) order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &GroupKey, u64)> {
        self.cells.iter().map(|((r, c), n)| (r, c, *n))
    }

    /// Distinct row keys, ascending.
    pub fn row_keys(&self) -> Vec<GroupKey> {
        let keys: BTreeSet<&GroupKey> = self.cells.keys().map(|(r, _)| r).collect();
        keys.into_iter().cloned().collect()
    }

    /// Distinct column keys, ascending.
    pub fn col_keys(&self) -> Vec<GroupKey> {
        let keys: BTreeSet<&GroupKey> = self.cells.keys().map(|(_, c)| c).collect();
        keys.into_iter().cloned().collect()
    }

    /// Per-row sums, as value counts of the row field.
    pub fn row_totals(&self) -> Counts {
        let mut totals = Counts::new(self.rows, KeyOrder::CountDescending);
        for ((row, _), n) in &self.cells {
            *totals.counts.entry(row.clone()).or_default() += n;
        }
        totals
    }

    /// Per-column sums, as value counts of the column field.
    pub fn col_totals(&self) -> Counts {
        let mut totals = Counts::new(self.cols, KeyOrder::CountDescending);
        for ((_, col), n) in &self.cells {
            *totals.counts.entry(col.clone()).or_default() += n;
        }
        totals
    }

    pub fn total(&self) -> u64 {
        self.cells.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Count records per (`rows`, `cols`) pair, skipping records missing either.
pub fn cross_tab<'a, I>(records: I, rows: Field, cols: Field) -> Result<CrossTab>
where
    I: IntoIterator<Item = &'a Record>,
{
    if rows == cols {
        return Err(CatalogError::InvalidParameter(format!(
            "cross-tabulation needs two distinct fields, got '{rows}' twice"
        )));
    }
    let mut cells: BTreeMap<(GroupKey, GroupKey), u64> = BTreeMap::new();
    for record in records {
        if let (Some(r), Some(c)) = (record.value(rows), record.value(cols)) {
            *cells.entry((r, c)).or_default() += 1;
        }
    }
    Ok(CrossTab { rows, cols, cells })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RecordStore;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn counts_of(pairs: &[(&str, u64)]) -> Counts {
        let mut c = Counts::new(Field::Country, KeyOrder::CountDescending);
        for (k, n) in pairs {
            c.counts.insert(GroupKey::from(*k), *n);
        }
        c
    }

    #[test]
    fn test_value_counts_by_kind() {
        let store = RecordStore::from_records(vec![
            Record::new("1").with_kind("Movie"),
            Record::new("2").with_kind("Series"),
            Record::new("3").with_kind("Movie"),
            Record::new("4").with_kind("Series"),
            Record::new("5").with_kind("Movie"),
        ])
        .unwrap();
        let counts = value_counts(&store, Field::Kind);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get(&"Movie".into()), 3);
        assert_eq!(counts.get(&"Series".into()), 2);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_value_counts_skip_missing() {
        let store = RecordStore::from_records(vec![
            Record::new("1").with_country("India"),
            Record::new("2"),
            Record::new("3").with_country("India"),
        ])
        .unwrap();
        let counts = value_counts(&store, Field::Country);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.series(), vec![(GroupKey::from("India"), 2)]);
    }

    #[test]
    fn test_top_n_breaks_ties_by_key() {
        let counts = counts_of(&[("US", 10), ("IN", 7), ("UK", 7), ("FR", 3)]);
        let top = top_n(&counts, 2).unwrap();
        assert_eq!(
            top.series(),
            vec![(GroupKey::from("US"), 10), (GroupKey::from("IN"), 7)]
        );
    }

    #[test]
    fn test_top_n_edges() {
        let counts = counts_of(&[("US", 10), ("IN", 7)]);
        assert!(top_n(&counts, 0).unwrap().is_empty());
        assert_eq!(top_n(&counts, 50).unwrap().len(), 2);
        assert!(top_n(&counts, -1).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_time_buckets_by_year_and_month() {
        let records = vec![
            Record::new("1").with_date_added(date(2019, 1, 3)),
            Record::new("2").with_date_added(date(2021, 9, 25)),
            Record::new("3"),
            Record::new("4").with_date_added(date(2019, 12, 31)),
        ];
        let years = time_buckets(&records, Field::DateAdded, Granularity::Year).unwrap();
        assert_eq!(
            years.series(),
            vec![(GroupKey::Int(2019), 2), (GroupKey::Int(2021), 1)]
        );

        let months = time_buckets(&records, Field::DateAdded, Granularity::Month).unwrap();
        let keys: Vec<String> = months.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2019-01", "2019-12", "2021-09"]);
    }

    #[test]
    fn test_time_buckets_reject_bad_fields() {
        let records: Vec<Record> = Vec::new();
        assert!(time_buckets(&records, Field::Country, Granularity::Year)
            .unwrap_err()
            .is_invalid_parameter());
        assert!(time_buckets(&records, Field::ReleaseYear, Granularity::Month)
            .unwrap_err()
            .is_invalid_parameter());
        assert!(time_buckets(&records, Field::ReleaseYear, Granularity::Year)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_cross_tab_excludes_partial_records() {
        let records = vec![
            Record::new("1").with_release_year(2019).with_country("India"),
            Record::new("2").with_release_year(2019).with_country("India"),
            Record::new("3").with_release_year(2020).with_country("France"),
            Record::new("4").with_release_year(2020),
            Record::new("5").with_country("France"),
        ];
        let tab = cross_tab(&records, Field::ReleaseYear, Field::Country).unwrap();
        assert_eq!(tab.total(), 3);
        assert_eq!(tab.get(&GroupKey::Int(2019), &"India".into()), 2);
        assert_eq!(tab.get(&GroupKey::Int(2019), &"France".into()), 0);
        assert_eq!(tab.row_keys(), vec![GroupKey::Int(2019), GroupKey::Int(2020)]);
        assert_eq!(tab.col_keys(), vec![GroupKey::from("France"), GroupKey::from("India")]);
        assert_eq!(tab.col_totals().get(&"France".into()), 1);

        assert!(cross_tab(&records, Field::Country, Field::Country)
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_sharded_counts_merge_to_whole() {
        let records: Vec<Record> = (0..20)
            .map(|i| Record::new(i.to_string()).with_kind(if i % 3 == 0 { "Movie" } else { "TV Show" }))
            .collect();
        let whole = value_counts(&records, Field::Kind);

        let mut merged = Counts::new(Field::Kind, KeyOrder::CountDescending);
        for shard in records.chunks(6) {
            merged.merge(&value_counts(shard, Field::Kind)).unwrap();
        }
        assert_eq!(merged, whole);

        let other = value_counts(&records, Field::Country);
        assert!(merged.merge(&other).unwrap_err().is_invalid_parameter());
    }
}
