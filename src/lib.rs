//! # catalog-dash
//!
//! The filter and aggregation engine behind a media-catalog dashboard.
//!
//! - Load a catalog once from CSV, JSON or Parquet into an immutable
//!   [`RecordStore`](data::model::RecordStore)
//! - Filter it with exact-match / wildcard / range constraints
//!   ([`FilterSpec`](data::filter::FilterSpec) → [`Predicate`](data::filter::Predicate))
//! - Count: value counts, top-N, time buckets, cross-tabulation
//! - Project results into ordered series and zero-filled matrices
//!
//! # Example
//!
//! ```rust
//! use catalog_dash::data::aggregate::{top_n, value_counts};
//! use catalog_dash::data::filter::{Constraint, FilterSpec, Predicate};
//! use catalog_dash::data::loader::{load_csv, LoadOptions};
//! use catalog_dash::data::model::Field;
//!
//! let csv = "show_id,type,country,release_year,date_added\n\
//!            s1,Movie,India,2015,\n\
//!            s2,Movie,Japan,2016,\n\
//!            s3,TV Show,India,2016,\n";
//! let store = load_csv(csv.as_bytes(), &LoadOptions::default())?;
//!
//! let spec = FilterSpec::new().with("release_year", Constraint::range(2015, 2016));
//! let view = Predicate::build(&spec)?.apply(&store);
//!
//! let top = top_n(&value_counts(&view, Field::Country), 1)?;
//! assert_eq!(top.series()[0].1, 2);
//! # Ok::<(), catalog_dash::data::CatalogError>(())
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod state;
pub mod ui;
