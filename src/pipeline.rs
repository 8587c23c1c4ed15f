// src/pipeline.rs

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::{
    config::Config,
    fetch::{fetch_lines, Location},
    process::{
        pivot::{pivot_case_lines, PivotMode},
        population::PopulationTable,
    },
    write::write_table,
};

/// What one run did, for the closing log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub case_lines: usize,
    /// `None` in raw-count mode.
    pub population_regions: Option<usize>,
    pub accepted: usize,
    pub rejected: usize,
    pub overwritten: usize,
    pub skipped_regions: Vec<String>,
    pub rows: usize,
    pub columns: usize,
}

/// Fetch, parse, pivot and write. Every stage failure aborts the run;
/// nothing is written unless all earlier stages succeeded.
#[instrument(level = "info", skip_all, fields(output = %config.output.display()))]
pub async fn run(config: &Config, client: &Client) -> Result<RunSummary> {
    // ─── 1) population table (optional) ─────────────────────────────
    let population = match config.population_input.as_deref() {
        Some(raw) => {
            let location = Location::parse(raw);
            let lines = fetch_lines(client, &location, config.population_header)
                .await
                .with_context(|| format!("fetching population data from {}", location))?;
            let table = PopulationTable::from_lines(&lines)
                .with_context(|| format!("parsing population data from {}", location))?;
            if table.is_empty() {
                warn!("population source {} has no entries, every case record will be skipped", location);
            }
            Some(table)
        }
        None => {
            info!("no population source configured, writing raw counts");
            None
        }
    };

    // ─── 2) case lines ──────────────────────────────────────────────
    let location = Location::parse(&config.covid_input);
    let case_lines = fetch_lines(client, &location, config.covid_header)
        .await
        .with_context(|| format!("fetching case data from {}", location))?;

    // ─── 3) join + pivot ────────────────────────────────────────────
    let mode = PivotMode::from_population(population.as_ref());
    let (table, stats) = pivot_case_lines(&case_lines, mode, config.date_format);

    // ─── 4) write ───────────────────────────────────────────────────
    write_table(&table, &config.output)
        .await
        .context("writing wide table")?;

    Ok(RunSummary {
        case_lines: case_lines.len(),
        population_regions: population.as_ref().map(PopulationTable::len),
        accepted: stats.accepted,
        rejected: stats.rejected,
        overwritten: stats.overwritten,
        skipped_regions: stats.skipped_regions,
        rows: table.row_count(),
        columns: table.columns().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, PopulationError};
    use crate::process::date_parser::DateFormat;
    use std::{fs, path::Path};
    use tempfile::{tempdir, TempDir};

    const CASES: &str = "date,state,fips,cases,deaths\n\
        2020-01-22,Washington,53,1,0\n\
        2020-01-21,Washington,53,1,0\n\
        2020-01-22,Atlantis,99,4,0\n\
        # footer comment\n\
        2020-01-22,New York,36,2,0\n";

    const POPULATION: &str = "state,state_name,geo_id,population,pop_density\n\
        WA,Washington,53,1000000,113.3\n\
        NY,New York,36,4000000,412.5\n";

    fn config_in(dir: &TempDir, population: Option<&str>) -> Result<Config> {
        let cases = dir.path().join("cases.csv");
        fs::write(&cases, CASES)?;
        let population_input = match population {
            Some(text) => {
                let path = dir.path().join("population.csv");
                fs::write(&path, text)?;
                Some(path.display().to_string())
            }
            None => None,
        };
        Ok(Config {
            covid_input: cases.display().to_string(),
            population_input,
            output: dir.path().join("graph.csv"),
            date_format: DateFormat::Iso,
            covid_header: true,
            population_header: true,
        })
    }

    fn read(path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    #[tokio::test]
    async fn per_capita_run() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(&dir, Some(POPULATION))?;

        let summary = run(&config, &Client::new()).await?;

        assert_eq!(
            read(&config.output)?,
            "date,New York,Washington\n2020-01-21,0,1.00\n2020-01-22,0.50,1.00\n"
        );
        assert_eq!(summary.case_lines, 5);
        assert_eq!(summary.population_regions, Some(2));
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.skipped_regions, vec!["Atlantis"]);
        assert_eq!((summary.rows, summary.columns), (2, 2));
        Ok(())
    }

    #[tokio::test]
    async fn raw_count_run() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(&dir, None)?;

        let summary = run(&config, &Client::new()).await?;

        assert_eq!(
            read(&config.output)?,
            "date,Atlantis,New York,Washington\n2020-01-21,0,0,1\n2020-01-22,4,2,1\n"
        );
        assert_eq!(summary.population_regions, None);
        assert!(summary.skipped_regions.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn dotted_dates_run() -> Result<()> {
        let dir = tempdir()?;
        let mut config = config_in(&dir, None)?;
        config.date_format = DateFormat::Dotted;

        run(&config, &Client::new()).await?;

        let out = read(&config.output)?;
        assert!(out.contains("\n21.01.2020,0,0,1\n"));
        assert!(out.contains("\n22.01.2020,4,2,1\n"));
        Ok(())
    }

    #[tokio::test]
    async fn rerun_is_byte_identical() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(&dir, Some(POPULATION))?;
        let client = Client::new();

        run(&config, &client).await?;
        let first = fs::read(&config.output)?;
        run(&config, &client).await?;
        let second = fs::read(&config.output)?;

        assert_eq!(first, second);
        let text = String::from_utf8(first)?;
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().skip(1).all(|l| l.contains("1.00")));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_population_aborts_before_write() -> Result<()> {
        let dir = tempdir()?;
        let config = config_in(&dir, Some("header\nWA,Washington,53,lots,1\n"))?;
        fs::write(&config.output, "previous\n")?;

        let err = run(&config, &Client::new()).await.unwrap_err();

        let cause = err
            .downcast_ref::<PopulationError>()
            .expect("population error in chain");
        assert_eq!(cause.line_no, 1);
        assert_eq!(read(&config.output)?, "previous\n");
        Ok(())
    }

    #[tokio::test]
    async fn missing_case_source_aborts() -> Result<()> {
        let dir = tempdir()?;
        let mut config = config_in(&dir, None)?;
        config.covid_input = dir.path().join("nope.csv").display().to_string();

        let err = run(&config, &Client::new()).await.unwrap_err();

        assert!(err.downcast_ref::<FetchError>().is_some());
        assert!(!config.output.exists());
        Ok(())
    }
}
