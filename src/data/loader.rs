use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{CatalogError, IngestContext, Result};
use super::model::{Record, RecordStore, YEAR_RANGE};

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Source column names for each logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub id: String,
    pub kind: String,
    pub country: String,
    pub release_year: String,
    pub date_added: String,
    /// Optional in the source.
    pub title: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "show_id".to_string(),
            kind: "type".to_string(),
            country: "country".to_string(),
            release_year: "release_year".to_string(),
            date_added: "date_added".to_string(),
            title: "title".to_string(),
        }
    }
}

impl ColumnMap {
    fn required(&self) -> [&str; 5] {
        [
            &self.id,
            &self.kind,
            &self.country,
            &self.release_year,
            &self.date_added,
        ]
    }
}

/// How a multi-country cell such as `"United States, India"` becomes one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountryMode {
    /// The whole cell is one category.
    #[default]
    Whole,
    /// Only the first listed country is kept.
    Primary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub columns: ColumnMap,
    pub country_mode: CountryMode,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a catalog from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one title per line
/// * `.json`    – `[{ "show_id": "s1", "type": "Movie", ... }, ...]`
/// * `.parquet` – any scalar column types; cells are read as text
pub fn load_file(path: &Path, opts: &LoadOptions) -> Result<RecordStore> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let store = match ext.as_str() {
        "csv" => {
            let file = File::open(path)
                .with_ingest_context(|| format!("opening {}", path.display()))?;
            load_csv(file, opts)?
        }
        "json" => {
            let file = File::open(path)
                .with_ingest_context(|| format!("opening {}", path.display()))?;
            load_json(file, opts)?
        }
        "parquet" | "pq" => load_parquet(path, opts)?,
        other => {
            return Err(CatalogError::ingest(format!(
                "unsupported file extension: .{other}"
            )))
        }
    };

    log::info!("loaded {} records from {}", store.len(), path.display());
    Ok(store)
}

// ---------------------------------------------------------------------------
// Row assembly shared by all formats
// ---------------------------------------------------------------------------

/// The text cells of one source row, by logical field. `None` = absent/null.
#[derive(Debug, Default)]
struct RawRow {
    id: Option<String>,
    kind: Option<String>,
    country: Option<String>,
    release_year: Option<String>,
    date_added: Option<String>,
    title: Option<String>,
}

/// Turns raw rows into records, tracking row-level recoveries.
struct RowBuilder<'o> {
    opts: &'o LoadOptions,
    records: Vec<Record>,
    recovered: usize,
}

impl<'o> RowBuilder<'o> {
    fn new(opts: &'o LoadOptions) -> Self {
        Self {
            opts,
            records: Vec::new(),
            recovered: 0,
        }
    }

    fn push(&mut self, row: usize, raw: RawRow) -> Result<()> {
        let id = clean(raw.id)
            .ok_or_else(|| CatalogError::ingest(format!("row {row}: missing id")))?;

        let release_year = match clean(raw.release_year) {
            None => None,
            Some(text) => {
                let year = parse_year(&text);
                if year.is_none() {
                    log::warn!("row {row} ({id}): unreadable release year '{text}', kept as missing");
                    self.recovered += 1;
                }
                year
            }
        };

        let date_added = match clean(raw.date_added) {
            None => None,
            Some(text) => {
                let date = parse_date(&text);
                if date.is_none() {
                    log::warn!("row {row} ({id}): unreadable date added '{text}', kept as missing");
                    self.recovered += 1;
                }
                date
            }
        };

        let country = clean(raw.country).and_then(|c| match self.opts.country_mode {
            CountryMode::Whole => Some(c),
            CountryMode::Primary => primary_country(&c),
        });

        self.records.push(Record {
            id,
            kind: clean(raw.kind),
            country,
            release_year,
            date_added,
            title: clean(raw.title),
        });
        Ok(())
    }

    fn finish(self) -> Result<RecordStore> {
        if self.recovered > 0 {
            log::info!(
                "{} cell(s) across {} rows could not be parsed and were kept as missing",
                self.recovered,
                self.records.len()
            );
        }
        RecordStore::from_records(self.records)
    }
}

fn clean(cell: Option<String>) -> Option<String> {
    let cell = cell?;
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == cell.len() {
        Some(cell)
    } else {
        Some(trimmed.to_string())
    }
}

fn primary_country(cell: &str) -> Option<String> {
    cell.split(',')
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// A plausible four-digit year. Accepts integral decimals such as `2019.0`.
pub(crate) fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    let year = match text.parse::<i32>() {
        Ok(y) => y,
        Err(_) => {
            let f = text.parse::<f64>().ok()?;
            if f.fract() != 0.0 || !f.is_finite() {
                return None;
            }
            f as i32
        }
    };
    YEAR_RANGE.contains(&year).then_some(year)
}

const DATE_FORMATS: [&str; 4] = ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%d-%b-%y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse the catalog's date formats (`September 25, 2021`, ISO, ...).
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Position of each logical column among the source's columns.
struct ColumnIndex {
    id: usize,
    kind: usize,
    country: usize,
    release_year: usize,
    date_added: usize,
    title: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &[String], columns: &ColumnMap) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let missing: Vec<&str> = columns
            .required()
            .into_iter()
            .filter(|name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::ingest(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }
        // Every required name was found above.
        let at = |name: &str| find(name).unwrap_or_default();
        Ok(ColumnIndex {
            id: at(&columns.id),
            kind: at(&columns.kind),
            country: at(&columns.country),
            release_year: at(&columns.release_year),
            date_added: at(&columns.date_added),
            title: find(&columns.title),
        })
    }

    fn positions(&self) -> BTreeSet<usize> {
        let mut set: BTreeSet<usize> = [
            self.id,
            self.kind,
            self.country,
            self.release_year,
            self.date_added,
        ]
        .into_iter()
        .collect();
        set.extend(self.title);
        set
    }

    fn raw_row<F>(&self, cell: F) -> RawRow
    where
        F: Fn(usize) -> Option<String>,
    {
        RawRow {
            id: cell(self.id),
            kind: cell(self.kind),
            country: cell(self.country),
            release_year: cell(self.release_year),
            date_added: cell(self.date_added),
            title: self.title.and_then(&cell),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one title per record.
/// Columns not named in the [`ColumnMap`] are ignored.
pub fn load_csv<R: Read>(source: R, opts: &LoadOptions) -> Result<RecordStore> {
    let mut reader = csv::Reader::from_reader(source);
    let headers: Vec<String> = reader
        .headers()
        .ingest_context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let index = ColumnIndex::resolve(&headers, &opts.columns)?;

    let mut rows = RowBuilder::new(opts);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_ingest_context(|| format!("CSV row {row_no}"))?;
        let raw = index.raw_row(|i| record.get(i).map(str::to_string));
        rows.push(row_no, raw)?;
    }
    rows.finish()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "show_id": "s1", "type": "Movie", "country": "United States",
///     "release_year": 2020, "date_added": "September 25, 2021" },
///   ...
/// ]
/// ```
pub fn load_json<R: Read>(source: R, opts: &LoadOptions) -> Result<RecordStore> {
    let root: JsonValue = serde_json::from_reader(source).ingest_context("parsing JSON")?;
    let rows = root
        .as_array()
        .ok_or_else(|| CatalogError::ingest("expected top-level JSON array"))?;

    let mut objects = Vec::with_capacity(rows.len());
    let mut seen_columns: BTreeSet<&str> = BTreeSet::new();
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .ok_or_else(|| CatalogError::ingest(format!("row {i} is not a JSON object")))?;
        seen_columns.extend(obj.keys().map(String::as_str));
        objects.push(obj);
    }

    if !objects.is_empty() {
        let missing: Vec<&str> = opts
            .columns
            .required()
            .into_iter()
            .filter(|name| !seen_columns.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::ingest(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }
    }

    let columns = &opts.columns;
    let mut builder = RowBuilder::new(opts);
    for (i, obj) in objects.into_iter().enumerate() {
        let cell = |name: &str| obj.get(name).and_then(json_cell);
        let raw = RawRow {
            id: cell(&columns.id),
            kind: cell(&columns.kind),
            country: cell(&columns.country),
            release_year: cell(&columns.release_year),
            date_added: cell(&columns.date_added),
            title: cell(&columns.title),
        };
        builder.push(i, raw)?;
    }
    builder.finish()
}

fn json_cell(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet catalog.
///
/// Every mapped column is cast to UTF-8 and then parsed like a CSV cell, so
/// integer years, `Date32` dates and string columns all work. Works with
/// files written by both **Pandas** (`df.to_parquet()`) and **Polars**
/// (`df.write_parquet()`).
pub fn load_parquet(path: &Path, opts: &LoadOptions) -> Result<RecordStore> {
    let file = File::open(path).ingest_context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).ingest_context("reading parquet metadata")?;

    // Resolved from the file schema, so files without batches are checked too.
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let index = ColumnIndex::resolve(&headers, &opts.columns)?;
    let mapped = index.positions();

    let reader = builder.build().ingest_context("building parquet reader")?;

    let mut rows = RowBuilder::new(opts);
    let mut row_offset = 0usize;

    for batch_result in reader {
        let batch = batch_result.ingest_context("reading parquet record batch")?;

        // Only mapped columns are cast; unrelated nested columns are never touched.
        let mut text_columns = Vec::with_capacity(batch.num_columns());
        for (i, col) in batch.columns().iter().enumerate() {
            if mapped.contains(&i) {
                let text = cast(col, &DataType::Utf8).with_ingest_context(|| {
                    format!("casting parquet column '{}' to text", headers[i])
                })?;
                text_columns.push(Some(text));
            } else {
                text_columns.push(None);
            }
        }

        for row in 0..batch.num_rows() {
            let raw = index.raw_row(|i| {
                let col = text_columns.get(i)?.as_ref()?.as_string::<i32>();
                if col.is_null(row) {
                    None
                } else {
                    Some(col.value(row).to_string())
                }
            });
            rows.push(row_offset + row, raw)?;
        }
        row_offset += batch.num_rows();
    }

    rows.finish()
}
