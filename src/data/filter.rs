use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{CatalogError, Result};
use super::model::{Field, FieldKind, GroupKey, Record, View};

// ---------------------------------------------------------------------------
// Filter specification: plain data, as received from the sidebar / CLI
// ---------------------------------------------------------------------------

/// The wildcard sentinel accepted wherever a selection is parsed from text.
pub const ALL: &str = "All";

/// Text form of [`Selection::Missing`] on the command line.
pub const MISSING: &str = "<missing>";

/// What an exact-match constraint selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No constraint.
    All,
    /// Records with no value for the field.
    Missing,
    /// Records whose value equals this text.
    Value(String),
}

impl Selection {
    /// Read a selection from sidebar/CLI text. Never fails.
    pub fn from_text(s: &str) -> Self {
        match s {
            ALL => Selection::All,
            MISSING => Selection::Missing,
            other => Selection::Value(other.to_string()),
        }
    }
}

impl FromStr for Selection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Selection::from_text(s))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str(ALL),
            Selection::Missing => f.write_str(MISSING),
            Selection::Value(v) => f.write_str(v),
        }
    }
}

/// A single per-field predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawConstraint", into = "RawConstraint")]
pub enum Constraint {
    ExactOrWildcard(Selection),
    /// Inclusive on both ends.
    InclusiveRange { lo: i64, hi: i64 },
}

impl Constraint {
    pub fn exact(value: impl Into<String>) -> Self {
        Constraint::ExactOrWildcard(Selection::Value(value.into()))
    }

    pub fn all() -> Self {
        Constraint::ExactOrWildcard(Selection::All)
    }

    pub fn missing() -> Self {
        Constraint::ExactOrWildcard(Selection::Missing)
    }

    pub fn range(lo: i64, hi: i64) -> Self {
        Constraint::InclusiveRange { lo, hi }
    }
}

/// Wire shape: `"Movie"`, `"All"`, `null`, `[2000, 2020]` or `{ lo = .., hi = .. }`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawConstraint {
    Pair([i64; 2]),
    Bounds { lo: i64, hi: i64 },
    Exact(Option<String>),
}

impl From<RawConstraint> for Constraint {
    fn from(raw: RawConstraint) -> Self {
        match raw {
            RawConstraint::Pair([lo, hi]) | RawConstraint::Bounds { lo, hi } => {
                Constraint::InclusiveRange { lo, hi }
            }
            RawConstraint::Exact(None) => Constraint::missing(),
            RawConstraint::Exact(Some(s)) => Constraint::ExactOrWildcard(Selection::from_text(&s)),
        }
    }
}

impl From<Constraint> for RawConstraint {
    fn from(c: Constraint) -> Self {
        match c {
            Constraint::InclusiveRange { lo, hi } => RawConstraint::Pair([lo, hi]),
            Constraint::ExactOrWildcard(Selection::Missing) => RawConstraint::Exact(None),
            Constraint::ExactOrWildcard(sel) => RawConstraint::Exact(Some(sel.to_string())),
        }
    }
}

/// Named constraints keyed by field name. Names are validated by [`Predicate::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    constraints: BTreeMap<String, Constraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the constraint on `field`.
    pub fn with(mut self, field: impl Into<String>, constraint: Constraint) -> Self {
        self.set(field, constraint);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, constraint: Constraint) {
        self.constraints.insert(field.into(), constraint);
    }

    pub fn get(&self, field: &str) -> Option<&Constraint> {
        self.constraints.get(field)
    }

    /// Layer `other` on top of `self`; fields present in `other` win.
    pub fn merged(mut self, other: &FilterSpec) -> Self {
        for (field, constraint) in &other.constraints {
            self.constraints.insert(field.clone(), constraint.clone());
        }
        self
    }

    /// Rewrite every key to its canonical field name (`type` → `kind`).
    ///
    /// Fails on unknown names, and when two keys name the same field.
    pub fn normalized(&self) -> Result<FilterSpec> {
        let mut out = FilterSpec::new();
        for (name, constraint) in &self.constraints {
            let field: Field = name.parse()?;
            if out.constraints.contains_key(field.name()) {
                return Err(CatalogError::InvalidFilter(format!(
                    "field '{field}' is constrained twice"
                )));
            }
            out.set(field.name(), constraint.clone());
        }
        Ok(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Predicate: a validated, typed filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    IsMissing(Field),
    Equals(Field, GroupKey),
    Within { field: Field, lo: i64, hi: i64 },
}

impl Clause {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Clause::IsMissing(field) => record.is_missing(*field),
            Clause::Equals(field, key) => record.value(*field).as_ref() == Some(key),
            Clause::Within { field, lo, hi } => record
                .ordinal(*field)
                .is_some_and(|v| *lo <= v && v <= *hi),
        }
    }
}

/// The conjunction of all constraints of a [`FilterSpec`].
///
/// Wildcards compile away, so a spec made only of `All` selections yields
/// the empty predicate, which matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Predicate that accepts everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Validate `spec` against the schema and compile it.
    pub fn build(spec: &FilterSpec) -> Result<Self> {
        let mut clauses = Vec::new();
        for (name, constraint) in spec.iter() {
            let field: Field = name.parse()?;
            if let Some(clause) = compile(field, constraint)? {
                clauses.push(clause);
            }
        }
        log::debug!(
            "built predicate with {} active clause(s) from {} constraint(s)",
            clauses.len(),
            spec.constraints.len()
        );
        Ok(Predicate { clauses })
    }

    /// Logical AND of two predicates.
    pub fn and(mut self, other: &Predicate) -> Self {
        self.clauses.extend(other.clauses.iter().cloned());
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }

    /// Return the records that pass every clause, preserving input order.
    ///
    /// Accepts a store (`&RecordStore`), a view (`&View`) or any iterator of
    /// record references.
    pub fn apply<'a, I>(&self, records: I) -> View<'a>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        View::from_refs(records.into_iter().filter(|r| self.matches(r)).collect())
    }
}

fn compile(field: Field, constraint: &Constraint) -> Result<Option<Clause>> {
    match constraint {
        Constraint::ExactOrWildcard(Selection::All) => Ok(None),
        Constraint::ExactOrWildcard(Selection::Missing) => Ok(Some(Clause::IsMissing(field))),
        Constraint::ExactOrWildcard(Selection::Value(text)) => {
            let key = exact_key(field, text)?;
            Ok(Some(Clause::Equals(field, key)))
        }
        Constraint::InclusiveRange { lo, hi } => {
            if field.kind() == FieldKind::Categorical {
                return Err(CatalogError::InvalidFilter(format!(
                    "range constraint on categorical field '{field}'"
                )));
            }
            if lo > hi {
                return Err(CatalogError::InvalidFilter(format!(
                    "inverted range on '{field}': {lo} > {hi}"
                )));
            }
            Ok(Some(Clause::Within {
                field,
                lo: *lo,
                hi: *hi,
            }))
        }
    }
}

fn exact_key(field: Field, text: &str) -> Result<GroupKey> {
    match field.kind() {
        FieldKind::Categorical => Ok(GroupKey::Text(text.to_string())),
        FieldKind::Year => text.trim().parse::<i64>().map(GroupKey::Int).map_err(|_| {
            CatalogError::InvalidFilter(format!("'{text}' is not a year for '{field}'"))
        }),
        FieldKind::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(GroupKey::Date)
            .map_err(|_| {
                CatalogError::InvalidFilter(format!(
                    "'{text}' is not a YYYY-MM-DD date for '{field}'"
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RecordStore;

    fn store() -> RecordStore {
        RecordStore::from_records(vec![
            Record::new("a").with_kind("Movie").with_country("United States").with_release_year(2014),
            Record::new("b").with_kind("TV Show").with_country("India").with_release_year(2015),
            Record::new("c").with_kind("Movie").with_release_year(2016),
            Record::new("d").with_kind("Movie").with_country("India").with_release_year(2017),
        ])
        .unwrap()
    }

    fn ids(view: &View<'_>) -> Vec<String> {
        view.ids().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_year_range_is_inclusive_and_ordered() {
        let store = store();
        let spec = FilterSpec::new().with("release_year", Constraint::range(2015, 2016));
        let view = Predicate::build(&spec).unwrap().apply(&store);
        assert_eq!(ids(&view), vec!["b", "c"]);
    }

    #[test]
    fn test_all_is_a_noop_and_missing_is_not_all() {
        let store = store();
        let all = FilterSpec::new().with("country", Constraint::all());
        assert_eq!(Predicate::build(&all).unwrap().apply(&store).len(), 4);

        let missing = FilterSpec::new().with("country", Constraint::missing());
        assert_eq!(ids(&Predicate::build(&missing).unwrap().apply(&store)), vec!["c"]);
    }

    #[test]
    fn test_selection_from_text() {
        assert_eq!(Selection::from_text("All"), Selection::All);
        assert_eq!(Selection::from_text("<missing>"), Selection::Missing);
        assert_eq!(
            Selection::from_text("*"),
            Selection::Value("*".to_string())
        );
        assert_eq!(
            Selection::from_text("all"),
            Selection::Value("all".to_string())
        );
    }

    #[test]
    fn test_exact_and_range_combine_with_and() {
        let store = store();
        let spec = FilterSpec::new()
            .with("type", Constraint::exact("Movie"))
            .with("release_year", Constraint::range(2015, 2020));
        let view = Predicate::build(&spec).unwrap().apply(&store);
        assert_eq!(ids(&view), vec!["c", "d"]);
    }

    #[test]
    fn test_zero_matches_is_empty_view() {
        let store = store();
        let spec = FilterSpec::new().with("country", Constraint::exact("France"));
        assert!(Predicate::build(&spec).unwrap().apply(&store).is_empty());

        let empty = RecordStore::from_records(Vec::new()).unwrap();
        assert!(Predicate::all().apply(&empty).is_empty());
    }

    #[test]
    fn test_build_rejects_bad_specs() {
        let unknown = FilterSpec::new().with("rating", Constraint::exact("PG"));
        assert!(Predicate::build(&unknown).unwrap_err().is_invalid_filter());

        let inverted = FilterSpec::new().with("release_year", Constraint::range(2020, 2000));
        assert!(Predicate::build(&inverted).unwrap_err().is_invalid_filter());

        let categorical_range = FilterSpec::new().with("country", Constraint::range(1, 2));
        assert!(Predicate::build(&categorical_range).unwrap_err().is_invalid_filter());

        let bad_year = FilterSpec::new().with("release_year", Constraint::exact("soon"));
        assert!(Predicate::build(&bad_year).unwrap_err().is_invalid_filter());
    }

    #[test]
    fn test_exact_year_and_date() {
        let store = RecordStore::from_records(vec![
            Record::new("x")
                .with_release_year(2019)
                .with_date_added(NaiveDate::from_ymd_opt(2021, 9, 25).unwrap()),
            Record::new("y").with_release_year(2020),
        ])
        .unwrap();
        let by_year = FilterSpec::new().with("release_year", Constraint::exact("2019"));
        assert_eq!(ids(&Predicate::build(&by_year).unwrap().apply(&store)), vec!["x"]);

        let by_date = FilterSpec::new().with("date_added", Constraint::exact("2021-09-25"));
        assert_eq!(ids(&Predicate::build(&by_date).unwrap().apply(&store)), vec!["x"]);

        let added_range = FilterSpec::new().with("date_added", Constraint::range(2021, 2021));
        assert_eq!(ids(&Predicate::build(&added_range).unwrap().apply(&store)), vec!["x"]);
    }

    #[test]
    fn test_apply_to_view_and_and() {
        let store = store();
        let movies = Predicate::build(&FilterSpec::new().with("kind", Constraint::exact("Movie"))).unwrap();
        let india = Predicate::build(&FilterSpec::new().with("country", Constraint::exact("India"))).unwrap();

        let staged = india.apply(&movies.apply(&store));
        let combined = movies.clone().and(&india).apply(&store);
        assert_eq!(staged, combined);
        assert_eq!(ids(&combined), vec!["d"]);
    }

    #[test]
    fn test_deserialize_spec_from_json() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{"type": "Movie", "country": null, "release_year": [2000, 2020], "date_added": {"lo": 2019, "hi": 2021}}"#,
        )
        .unwrap();
        assert_eq!(spec.get("type"), Some(&Constraint::exact("Movie")));
        assert_eq!(spec.get("country"), Some(&Constraint::missing()));
        assert_eq!(spec.get("release_year"), Some(&Constraint::range(2000, 2020)));
        assert_eq!(spec.get("date_added"), Some(&Constraint::range(2019, 2021)));

        let wildcard: FilterSpec = serde_json::from_str(r#"{"type": "All"}"#).unwrap();
        assert!(Predicate::build(&wildcard).unwrap().is_wildcard());
    }

    #[test]
    fn test_normalized_spec() {
        let spec = FilterSpec::new()
            .with("type", Constraint::exact("Movie"))
            .with("year", Constraint::range(2000, 2010));
        let norm = spec.normalized().unwrap();
        assert_eq!(norm.get("kind"), Some(&Constraint::exact("Movie")));
        assert_eq!(norm.get("release_year"), Some(&Constraint::range(2000, 2010)));

        let twice = FilterSpec::new()
            .with("type", Constraint::exact("Movie"))
            .with("kind", Constraint::exact("TV Show"));
        assert!(twice.normalized().unwrap_err().is_invalid_filter());
    }

    #[test]
    fn test_spec_serializes_back_to_wire_shape() {
        let spec = FilterSpec::new()
            .with("kind", Constraint::all())
            .with("release_year", Constraint::range(2000, 2020));
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"kind":"All","release_year":[2000,2020]}"#);
        let back: FilterSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_merged_overrides_by_field() {
        let base = FilterSpec::new()
            .with("type", Constraint::exact("Movie"))
            .with("release_year", Constraint::range(2000, 2020));
        let over = FilterSpec::new().with("type", Constraint::all());
        let merged = base.merged(&over);
        assert_eq!(merged.get("type"), Some(&Constraint::all()));
        assert_eq!(merged.get("release_year"), Some(&Constraint::range(2000, 2020)));
    }
}
