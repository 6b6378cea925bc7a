use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::aggregate::{Counts, CrossTab};
use super::error::{CatalogError, Result};
use super::model::GroupKey;

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Ordering policy for a projected series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    /// Highest count first; equal counts by ascending key.
    CountDescending,
    /// Ascending key (time series).
    KeyAscending,
}

/// Materialize `counts` as position-ordered `(key, count)` pairs.
pub fn to_series(counts: &Counts, order: KeyOrder) -> Vec<(GroupKey, u64)> {
    // `Counts::iter` is key-ascending, and the sort below is stable, so
    // equal counts keep ascending key order.
    let mut series: Vec<(GroupKey, u64)> = counts.iter().map(|(k, n)| (k.clone(), n)).collect();
    if order == KeyOrder::CountDescending {
        series.sort_by(|a, b| b.1.cmp(&a.1));
    }
    series
}

// ---------------------------------------------------------------------------
// Matrix
// ---------------------------------------------------------------------------

/// A dense, zero-filled table of counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix {
    pub rows: Vec<GroupKey>,
    pub cols: Vec<GroupKey>,
    /// `cells[r][c]` is the count for `(rows[r], cols[c])`.
    pub cells: Vec<Vec<u64>>,
}

impl Matrix {
    pub fn get(&self, row: usize, col: usize) -> Option<u64> {
        self.cells.get(row)?.get(col).copied()
    }

    /// Sum of each row, aligned with `rows`.
    pub fn row_sums(&self) -> Vec<(GroupKey, u64)> {
        self.rows
            .iter()
            .zip(&self.cells)
            .map(|(key, row)| (key.clone(), row.iter().sum()))
            .collect()
    }

    /// Non-zero cells as `(row, col, count)` triples, row-major.
    pub fn to_long(&self) -> Vec<(GroupKey, GroupKey, u64)> {
        let mut long = Vec::new();
        for (r, row_key) in self.rows.iter().enumerate() {
            for (c, col_key) in self.cols.iter().enumerate() {
                let n = self.cells[r][c];
                if n > 0 {
                    long.push((row_key.clone(), col_key.clone(), n));
                }
            }
        }
        long
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }
}

/// Project `tab` onto the given row and column keys, zero-filling gaps.
///
/// Keys absent from `tab` are allowed and produce zero rows/columns; keys of
/// `tab` not listed are dropped.
pub fn to_matrix(tab: &CrossTab, row_keys: &[GroupKey], col_keys: &[GroupKey]) -> Result<Matrix> {
    ensure_unique(row_keys, "row")?;
    ensure_unique(col_keys, "column")?;

    let cells = row_keys
        .iter()
        .map(|r| col_keys.iter().map(|c| tab.get(r, c)).collect())
        .collect();

    Ok(Matrix {
        rows: row_keys.to_vec(),
        cols: col_keys.to_vec(),
        cells,
    })
}

fn ensure_unique(keys: &[GroupKey], axis: &str) -> Result<()> {
    let mut seen: HashSet<&GroupKey> = HashSet::with_capacity(keys.len());
    for key in keys {
        if !seen.insert(key) {
            return Err(CatalogError::InvalidParameter(format!(
                "duplicate {axis} key '{key}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{cross_tab, time_buckets, value_counts, Granularity};
    use crate::data::model::{Field, Record};

    fn records() -> Vec<Record> {
        vec![
            Record::new("1").with_release_year(2019).with_country("India"),
            Record::new("2").with_release_year(2019).with_country("United States"),
            Record::new("3").with_release_year(2020).with_country("India"),
            Record::new("4").with_release_year(2018).with_country("India"),
        ]
    }

    #[test]
    fn test_series_orders() {
        let counts = value_counts(&records(), Field::Country);
        assert_eq!(
            to_series(&counts, KeyOrder::CountDescending),
            vec![
                (GroupKey::from("India"), 3),
                (GroupKey::from("United States"), 1)
            ]
        );
        let years = time_buckets(&records(), Field::ReleaseYear, Granularity::Year).unwrap();
        let keys: Vec<GroupKey> = to_series(&years, KeyOrder::KeyAscending)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![GroupKey::Int(2018), GroupKey::Int(2019), GroupKey::Int(2020)]);
    }

    #[test]
    fn test_matrix_zero_fills() {
        let tab = cross_tab(&records(), Field::ReleaseYear, Field::Country).unwrap();
        let rows = tab.row_keys();
        let cols = vec![GroupKey::from("India"), GroupKey::from("United States"), GroupKey::from("Japan")];
        let m = to_matrix(&tab, &rows, &cols).unwrap();
        assert_eq!(m.cells, vec![vec![1, 0, 0], vec![1, 1, 0], vec![1, 0, 0]]);
        assert_eq!(m.get(1, 1), Some(1));
        assert_eq!(m.get(9, 0), None);
        assert_eq!(m.to_long().len(), 4);
    }

    #[test]
    fn test_matrix_rejects_duplicate_keys() {
        let tab = cross_tab(&records(), Field::ReleaseYear, Field::Country).unwrap();
        let dup_rows = vec![GroupKey::Int(2019), GroupKey::Int(2019)];
        assert!(to_matrix(&tab, &dup_rows, &tab.col_keys())
            .unwrap_err()
            .is_invalid_parameter());
        let dup_cols = vec![GroupKey::from("India"), GroupKey::from("India")];
        assert!(to_matrix(&tab, &tab.row_keys(), &dup_cols)
            .unwrap_err()
            .is_invalid_parameter());
    }

    #[test]
    fn test_row_sums_match_value_counts() {
        let recs = records();
        let tab = cross_tab(&recs, Field::ReleaseYear, Field::Country).unwrap();
        let m = to_matrix(&tab, &tab.row_keys(), &tab.col_keys()).unwrap();
        let counts = value_counts(&recs, Field::ReleaseYear);
        for (key, sum) in m.row_sums() {
            assert_eq!(sum, counts.get(&key));
        }
    }
}
