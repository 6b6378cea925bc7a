/// Data layer: core types, loading, filtering, aggregation and projection.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RecordStore
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ RecordStore  │  Vec<Record>, per-field value index
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec → Predicate → View
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  value counts, top-N, time buckets, cross-tab
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ project   │  ordered series, zero-filled matrices
///   └──────────┘
/// ```

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod project;

pub use error::{CatalogError, Result};
