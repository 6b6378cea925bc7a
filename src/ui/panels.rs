use std::fmt::Write;

use crate::data::filter::{Constraint, FilterSpec};
use crate::data::model::{GroupKey, Record};
use crate::data::project::Matrix;
use crate::state::{Panels, SeriesPoint};

// ---------------------------------------------------------------------------
// Full dashboard as text
// ---------------------------------------------------------------------------

/// Render every panel as aligned text tables.
pub fn render_dashboard(panels: &Panels, filter: &FilterSpec) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Catalog Dashboard");
    let _ = writeln!(out, "Filters: {}", describe_filter(filter));
    let _ = writeln!(
        out,
        "{} of {} titles visible ({}%)",
        panels.visible_records, panels.total_records, panels.visible_share_percent
    );

    section(&mut out, "Filtered Data");
    out.push_str(&preview_table(&panels.preview));

    section(&mut out, "Content Distribution by Type");
    out.push_str(&series_table("Type", &panels.type_distribution));

    section(&mut out, "Top Countries with Most Titles");
    out.push_str(&series_table("Country", &panels.top_countries));

    section(&mut out, "Content Added Over Time");
    out.push_str(&series_table("Added", &panels.added_over_time));

    section(&mut out, "Titles by Release Year and Country");
    out.push_str(&matrix_table(&panels.year_country));

    section(&mut out, "Titles by Country");
    out.push_str(&series_table("Country", &panels.country_totals));

    out
}

/// One distinct value per line.
pub fn render_options(values: &[GroupKey]) -> String {
    let mut out = String::new();
    for v in values {
        let _ = writeln!(out, "{v}");
    }
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "== {title}");
}

fn describe_filter(filter: &FilterSpec) -> String {
    let parts: Vec<String> = filter
        .iter()
        .map(|(field, c)| match c {
            Constraint::ExactOrWildcard(sel) => format!("{field} = {sel}"),
            Constraint::InclusiveRange { lo, hi } => format!("{field} in {lo}..={hi}"),
        })
        .collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Left-aligned text columns; the last column is right-aligned.
fn grid(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let last = cells.len().saturating_sub(1);
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == last {
                    format!("{c:>w$}", w = widths[i])
                } else {
                    format!("{c:<w$}", w = widths[i])
                }
            })
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(header));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in rows {
        let _ = writeln!(out, "{}", line(row));
    }
    out
}

fn series_table(key_header: &str, series: &[SeriesPoint]) -> String {
    if series.is_empty() {
        return "(no data)\n".to_string();
    }
    let rows: Vec<Vec<String>> = series
        .iter()
        .map(|p| vec![p.key.to_string(), p.count.to_string()])
        .collect();
    grid(&[key_header.to_string(), "Titles".to_string()], &rows)
}

fn preview_table(records: &[Record]) -> String {
    if records.is_empty() {
        return "(no matching titles)\n".to_string();
    }
    let missing = || "-".to_string();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.kind.clone().unwrap_or_else(missing),
                r.title.clone().unwrap_or_else(missing),
                r.country.clone().unwrap_or_else(missing),
                r.date_added
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(missing),
                r.release_year.map(|y| y.to_string()).unwrap_or_else(missing),
            ]
        })
        .collect();
    let header: Vec<String> = ["Id", "Type", "Title", "Country", "Added", "Year"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    grid(&header, &rows)
}

fn matrix_table(matrix: &Matrix) -> String {
    if matrix.is_empty() {
        return "(no data)\n".to_string();
    }
    // Transposed: one line per country keeps the table narrow.
    let mut header = vec!["Country".to_string()];
    header.extend(matrix.rows.iter().map(|y| y.to_string()));
    header.push("Total".to_string());

    let rows: Vec<Vec<String>> = matrix
        .cols
        .iter()
        .enumerate()
        .map(|(c, country)| {
            let mut row = vec![country.to_string()];
            let mut total = 0u64;
            for r in 0..matrix.rows.len() {
                let n = matrix.get(r, c).unwrap_or(0);
                total += n;
                row.push(if n == 0 { ".".to_string() } else { n.to_string() });
            }
            row.push(total.to_string());
            row
        })
        .collect();
    grid(&header, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RecordStore;
    use crate::state::{DashboardState, PanelSettings};

    #[test]
    fn test_grid_alignment() {
        let out = grid(
            &["Country".to_string(), "Titles".to_string()],
            &[
                vec!["India".to_string(), "7".to_string()],
                vec!["United States".to_string(), "10".to_string()],
            ],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Country        Titles");
        assert_eq!(lines[2], "India               7");
        assert_eq!(lines[3], "United States      10");
    }

    #[test]
    fn test_describe_filter() {
        assert_eq!(describe_filter(&FilterSpec::new()), "none");
        let spec = FilterSpec::new()
            .with("kind", Constraint::exact("Movie"))
            .with("release_year", Constraint::range(2000, 2020));
        assert_eq!(
            describe_filter(&spec),
            "kind = Movie, release_year in 2000..=2020"
        );
    }

    #[test]
    fn test_render_dashboard_sections() {
        let store = RecordStore::from_records(vec![
            Record::new("s1").with_kind("Movie").with_country("India").with_release_year(2019),
            Record::new("s2").with_kind("TV Show").with_release_year(2020),
        ])
        .unwrap();
        let state = DashboardState::new(&store);
        let panels = state.panels(&PanelSettings::default()).unwrap();
        let text = render_dashboard(&panels, state.filter());

        assert!(text.contains("2 of 2 titles visible (100%)"));
        assert!(text.contains("== Content Distribution by Type"));
        assert!(text.contains("== Content Added Over Time\n(no data)"));
        assert!(text.contains("s2  TV Show  -"));
    }
}
