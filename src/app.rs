use std::io::Write;

use anyhow::{Context, Result};

use crate::cli::{Args, OutputFormat};
use crate::config::Config;
use crate::data::loader::load_file;
use crate::data::model::Field;
use crate::state::DashboardState;
use crate::ui::panels;

// ---------------------------------------------------------------------------
// One CLI invocation: config → load → filter → panels → output
// ---------------------------------------------------------------------------

/// Run the command described by `args`, writing results to `out`.
pub fn run(args: &Args, out: &mut impl Write) -> Result<()> {
    if args.init_config {
        out.write_all(Config::default_toml()?.as_bytes())?;
        return Ok(());
    }

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(top) = args.top {
        config.panels.top_countries = top;
    }
    if let Some(scope) = args.scope {
        config.panels.scope = scope.into();
    }

    let source = args
        .source
        .as_deref()
        .context("no catalog file given")?;
    let store = load_file(source, &config.load_options())
        .with_context(|| format!("Failed to load {}", source.display()))?;

    if let Some(name) = &args.options {
        let field: Field = name.parse()?;
        out.write_all(panels::render_options(&store.options(field)).as_bytes())?;
        return Ok(());
    }

    let spec = config.filter.normalized()?.merged(&args.filter_spec()?);
    let mut state = DashboardState::new(&store);
    state.set_filter(spec).context("Failed to apply filter")?;
    log::info!(
        "{} of {} titles pass the filter",
        state.visible().len(),
        store.len()
    );

    let dashboard = state.panels(&config.panels)?;
    match args.format {
        OutputFormat::Text => {
            out.write_all(panels::render_dashboard(&dashboard, state.filter()).as_bytes())?
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &dashboard)
                .context("Failed to write JSON output")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const CSV: &str = "\
show_id,type,title,country,date_added,release_year
s1,Movie,First,India,\"January 1, 2020\",2019
s2,TV Show,Second,India,\"March 3, 2021\",2020
s3,Movie,Third,Japan,,2010
";

    fn run_with(extra: &[&str]) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("titles.csv");
        std::fs::write(&path, CSV)?;
        let cfg = dir.path().join("empty.toml");
        std::fs::write(&cfg, "")?;

        let mut argv = vec![
            "catalog-dash".to_string(),
            path.display().to_string(),
            "--config".to_string(),
            cfg.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        let args = Args::try_parse_from(argv)?;

        let mut out = Vec::new();
        run(&args, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_text_dashboard() {
        let text = run_with(&["--type", "Movie"]).unwrap();
        assert!(text.contains("Filters: kind = Movie"));
        assert!(text.contains("2 of 3 titles visible (67%)"));
    }

    #[test]
    fn test_json_dashboard() {
        let json = run_with(&["--format", "json", "--years", "2019..2020"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["visible_records"], 2);
        assert_eq!(value["top_countries"][0]["key"], "India");
        assert_eq!(value["top_countries"][0]["count"], 2);
        assert_eq!(value["added_over_time"][1]["key"], 2021);
    }

    #[test]
    fn test_options_listing() {
        let text = run_with(&["--options", "country"]).unwrap();
        assert_eq!(text, "India\nJapan\n");
        assert!(run_with(&["--options", "rating"]).is_err());
    }

    #[test]
    fn test_inverted_range_is_an_error() {
        let err = run_with(&["--years", "2020..2000"]).unwrap_err();
        assert!(format!("{err:#}").contains("inverted range"));
    }

    #[test]
    fn test_init_config_prints_toml() {
        let args = Args::try_parse_from(["catalog-dash", "--init-config"]).unwrap();
        let mut out = Vec::new();
        run(&args, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[panels]"));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }
}
