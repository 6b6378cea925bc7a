use serde::{Deserialize, Serialize};

use crate::data::aggregate::{cross_tab, time_buckets, top_n, value_counts, Granularity};
use crate::data::filter::{Constraint, FilterSpec, Predicate, Selection};
use crate::data::model::{Field, GroupKey, Record, RecordStore, View};
use crate::data::project::{to_matrix, Matrix};
use crate::data::Result;

// ---------------------------------------------------------------------------
// Panel settings
// ---------------------------------------------------------------------------

/// Which records the aggregate panels are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The records passing the active filter.
    #[default]
    Filtered,
    /// The whole store, ignoring the filter.
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// N for the top-countries panel.
    pub top_countries: i64,
    /// Number of country columns in the year × country matrix.
    pub heatmap_countries: i64,
    /// Records listed in the filtered-data preview.
    pub preview_rows: usize,
    /// Bucket size for the titles-added series.
    pub granularity: Granularity,
    pub scope: Scope,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            top_countries: 10,
            heatmap_countries: 10,
            preview_rows: 10,
            granularity: Granularity::Year,
            scope: Scope::Filtered,
        }
    }
}

// ---------------------------------------------------------------------------
// Panels – everything the dashboard shows, as plain values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub key: GroupKey,
    pub count: u64,
}

fn points(series: Vec<(GroupKey, u64)>) -> Vec<SeriesPoint> {
    series
        .into_iter()
        .map(|(key, count)| SeriesPoint { key, count })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Panels {
    pub total_records: usize,
    pub visible_records: usize,
    /// `visible_records` as a whole percent of `total_records`.
    pub visible_share_percent: u64,
    pub preview: Vec<Record>,
    pub type_distribution: Vec<SeriesPoint>,
    pub top_countries: Vec<SeriesPoint>,
    pub added_over_time: Vec<SeriesPoint>,
    /// Every country with its title count (map input).
    pub country_totals: Vec<SeriesPoint>,
    /// Release year × top countries.
    pub year_country: Matrix,
}

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The active filter and the view it selects, over a borrowed store.
pub struct DashboardState<'a> {
    store: &'a RecordStore,
    spec: FilterSpec,
    visible: View<'a>,
}

impl<'a> DashboardState<'a> {
    /// Everything visible.
    pub fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            spec: FilterSpec::new(),
            visible: store.view(),
        }
    }

    pub fn store(&self) -> &'a RecordStore {
        self.store
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn visible(&self) -> &View<'a> {
        &self.visible
    }

    /// Replace the active filter. On error the previous filter stays active.
    pub fn set_filter(&mut self, spec: FilterSpec) -> Result<()> {
        let spec = spec.normalized()?;
        let predicate = Predicate::build(&spec)?;
        self.visible = predicate.apply(self.store);
        self.spec = spec;
        log::debug!(
            "filter now selects {} of {} records",
            self.visible.len(),
            self.store.len()
        );
        Ok(())
    }

    /// Sidebar select box: change the selection on one categorical field.
    pub fn select(&mut self, field: Field, selection: Selection) -> Result<()> {
        let spec = self
            .spec
            .clone()
            .with(field.name(), Constraint::ExactOrWildcard(selection));
        self.set_filter(spec)
    }

    /// Sidebar slider: restrict the release year to `lo..=hi`.
    pub fn set_year_range(&mut self, lo: i64, hi: i64) -> Result<()> {
        let spec = self
            .spec
            .clone()
            .with(Field::ReleaseYear.name(), Constraint::range(lo, hi));
        self.set_filter(spec)
    }

    /// Compute every panel.
    pub fn panels(&self, settings: &PanelSettings) -> Result<Panels> {
        let scope = match settings.scope {
            Scope::Filtered => self.visible.clone(),
            Scope::Full => self.store.view(),
        };

        let countries = value_counts(&scope, Field::Country);
        let top = top_n(&countries, settings.top_countries)?;
        let added = time_buckets(&scope, Field::DateAdded, settings.granularity)?;

        let tab = cross_tab(&scope, Field::ReleaseYear, Field::Country)?;
        let heat_cols: Vec<GroupKey> = top_n(&tab.col_totals(), settings.heatmap_countries)?
            .series()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        let year_country = to_matrix(&tab, &tab.row_keys(), &heat_cols)?;

        let total = self.store.len();
        let visible = self.visible.len();

        Ok(Panels {
            total_records: total,
            visible_records: visible,
            visible_share_percent: share_percent(visible, total),
            preview: self
                .visible
                .iter()
                .take(settings.preview_rows)
                .cloned()
                .collect(),
            type_distribution: points(value_counts(&scope, Field::Kind).series()),
            top_countries: points(top.series()),
            added_over_time: points(added.series()),
            country_totals: points(countries.series()),
            year_country,
        })
    }
}

/// Rounded whole percent; 0 for an empty store.
fn share_percent(part: usize, whole: usize) -> u64 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (part as u64, whole as u64);
    (part * 100 + whole / 2) / whole
}
