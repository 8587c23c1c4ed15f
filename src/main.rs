use anyhow::{Context, Result};
use casepivot::{run, Config};
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path = Config::resolve_path(std::env::args().nth(1));
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    info!(
        cases = %config.covid_input,
        population = config.population_input.as_deref().unwrap_or("-"),
        date_format = %config.date_format,
        "config loaded from {}",
        config_path.display()
    );

    // ─── 3) run the pipeline ─────────────────────────────────────────
    let client = Client::new();
    let summary = run(&config, &client).await?;

    if summary.overwritten > 0 {
        warn!(
            "{} duplicate date/region records replaced earlier values",
            summary.overwritten
        );
    }
    info!(
        lines = summary.case_lines,
        accepted = summary.accepted,
        rejected = summary.rejected,
        overwritten = summary.overwritten,
        skipped_regions = summary.skipped_regions.len(),
        rows = summary.rows,
        columns = summary.columns,
        "all done"
    );
    Ok(())
}
