use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::error::{CatalogError, Result};

// ---------------------------------------------------------------------------
// Field – the closed schema of a catalog record
// ---------------------------------------------------------------------------

/// A groupable/filterable column of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Kind,
    Country,
    ReleaseYear,
    DateAdded,
}

/// How values of a field behave under filtering and bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text compared by equality.
    Categorical,
    /// An integer year; supports ranges.
    Year,
    /// A calendar date; ranges apply to its year.
    Date,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Id,
        Field::Kind,
        Field::Country,
        Field::ReleaseYear,
        Field::DateAdded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Kind => "kind",
            Field::Country => "country",
            Field::ReleaseYear => "release_year",
            Field::DateAdded => "date_added",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Id | Field::Kind | Field::Country => FieldKind::Categorical,
            Field::ReleaseYear => FieldKind::Year,
            Field::DateAdded => FieldKind::Date,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "show_id" => Ok(Field::Id),
            "kind" | "type" => Ok(Field::Kind),
            "country" => Ok(Field::Country),
            "release_year" | "year" => Ok(Field::ReleaseYear),
            "date_added" => Ok(Field::DateAdded),
            other => Err(CatalogError::InvalidFilter(format!(
                "unknown field '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// GroupKey – one value of one field
// ---------------------------------------------------------------------------

/// The value a record holds for a [`Field`], used as a grouping key.
///
/// Keys of different variants order as `Int < Text < Date`; within a
/// variant they order by value, so years sort numerically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use GroupKey::*;
        fn discriminant(k: &GroupKey) -> u8 {
            match k {
                Int(_) => 0,
                Text(_) => 1,
                Date(_) => 2,
            }
        }
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Int(i) => write!(f, "{i}"),
            GroupKey::Text(s) => write!(f, "{s}"),
            GroupKey::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        GroupKey::Text(s.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(s: String) -> Self {
        GroupKey::Text(s)
    }
}

impl From<i64> for GroupKey {
    fn from(i: i64) -> Self {
        GroupKey::Int(i)
    }
}

impl From<NaiveDate> for GroupKey {
    fn from(d: NaiveDate) -> Self {
        GroupKey::Date(d)
    }
}

/// Release years a record may hold: four digits.
pub const YEAR_RANGE: RangeInclusive<i32> = 1000..=9999;

// ---------------------------------------------------------------------------
// Record – one row of the catalog
// ---------------------------------------------------------------------------

/// A single catalog entry. Missing cells are `None`, never a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub kind: Option<String>,
    pub country: Option<String>,
    pub release_year: Option<i32>,
    pub date_added: Option<NaiveDate>,
    /// Descriptive only; never grouped on.
    pub title: Option<String>,
}

impl Record {
    /// A record with only an id; everything else missing.
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            kind: None,
            country: None,
            release_year: None,
            date_added: None,
            title: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_release_year(mut self, year: i32) -> Self {
        self.release_year = Some(year);
        self
    }

    pub fn with_date_added(mut self, date: NaiveDate) -> Self {
        self.date_added = Some(date);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The grouping key this record holds for `field`, if present.
    pub fn value(&self, field: Field) -> Option<GroupKey> {
        match field {
            Field::Id => Some(GroupKey::Text(self.id.clone())),
            Field::Kind => self.kind.clone().map(GroupKey::Text),
            Field::Country => self.country.clone().map(GroupKey::Text),
            Field::ReleaseYear => self.release_year.map(|y| GroupKey::Int(y as i64)),
            Field::DateAdded => self.date_added.map(GroupKey::Date),
        }
    }

    /// The year used by range constraints. `None` for categorical fields.
    pub fn ordinal(&self, field: Field) -> Option<i64> {
        match field {
            Field::ReleaseYear => self.release_year.map(i64::from),
            Field::DateAdded => self.date_added.map(|d| i64::from(d.year())),
            Field::Id | Field::Kind | Field::Country => None,
        }
    }

    pub fn is_missing(&self, field: Field) -> bool {
        match field {
            Field::Id => false,
            Field::Kind => self.kind.is_none(),
            Field::Country => self.country.is_none(),
            Field::ReleaseYear => self.release_year.is_none(),
            Field::DateAdded => self.date_added.is_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordStore – the complete loaded catalog
// ---------------------------------------------------------------------------

/// The immutable, ordered record set with pre-computed per-field indices.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    /// For each field the sorted set of distinct non-missing values.
    unique_values: BTreeMap<Field, BTreeSet<GroupKey>>,
}

impl RecordStore {
    /// Build the store and its indices.
    ///
    /// Fails on a duplicate `id` or a release year outside [`YEAR_RANGE`].
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
        for (row, rec) in records.iter().enumerate() {
            if !seen.insert(rec.id.as_str()) {
                return Err(CatalogError::ingest(format!(
                    "row {row}: duplicate id '{}'",
                    rec.id
                )));
            }
            if let Some(year) = rec.release_year.filter(|y| !YEAR_RANGE.contains(y)) {
                return Err(CatalogError::ingest(format!(
                    "row {row} ({}): release year {year} is not a four-digit year",
                    rec.id
                )));
            }
        }

        let mut unique_values: BTreeMap<Field, BTreeSet<GroupKey>> = BTreeMap::new();
        for rec in &records {
            for field in Field::ALL {
                // ids are listed on demand by `options`
                if field == Field::Id {
                    continue;
                }
                if let Some(key) = rec.value(field) {
                    unique_values.entry(field).or_default().insert(key);
                }
            }
        }

        Ok(RecordStore {
            records,
            unique_values,
        })
    }

    /// The full ordered record set.
    pub fn all(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A view over every record.
    pub fn view(&self) -> View<'_> {
        View {
            records: self.records.iter().collect(),
        }
    }

    /// Distinct non-missing values of `field`, ascending.
    pub fn options(&self, field: Field) -> Vec<GroupKey> {
        match field {
            Field::Id => {
                let ids: BTreeSet<GroupKey> =
                    self.records.iter().map(|r| GroupKey::Text(r.id.clone())).collect();
                ids.into_iter().collect()
            }
            _ => self
                .unique_values
                .get(&field)
                .map(|vals| vals.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Smallest and largest release year present.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let years = self.unique_values.get(&Field::ReleaseYear)?;
        let first = years.first()?;
        let last = years.last()?;
        match (first, last) {
            (GroupKey::Int(lo), GroupKey::Int(hi)) => Some((*lo as i32, *hi as i32)),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// View – an ordered read-only subsequence of a store
// ---------------------------------------------------------------------------

/// Records selected from a [`RecordStore`], in store order. Borrows the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View<'a> {
    records: Vec<&'a Record>,
}

impl<'a> View<'a> {
    pub(crate) fn from_refs(records: Vec<&'a Record>) -> Self {
        View { records }
    }

    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a, 'v> IntoIterator for &'v View<'a> {
    type Item = &'a Record;
    type IntoIter = std::iter::Copied<std::slice::Iter<'v, &'a Record>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter().copied()
    }
}
