mod bug_link;
mod changelog;
mod collector;
mod config;
#[cfg(test)]
mod fixtures;
mod jira_client;
mod metrics;
mod models;
mod timestamps;
mod warehouse;

use clap::Parser;
use collector::*;
use config::Cli;
use jira_client::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warehouse::{Warehouse, WarehouseSink};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "incident_metrics=debug,info"
    } else {
        "incident_metrics=info,warn"
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    if let Err(e) = run_once(cli).await {
        tracing::error!(error = %e, "Incident metrics run failed");
        std::process::exit(1);
    }
}

async fn run_once(cli: Cli) -> Result<(), CollectError> {
    let now = chrono::Utc::now();
    tracing::info!(
        epic = %cli.issue,
        business_utc_offset = %timestamps::local_utc_offset_hours(now),
        dry_run = cli.dry_run,
        mode = ?cli.upsert_mode,
        "Starting incident metrics run"
    );

    let config = cli.collector_config(now);
    let jira_client = JiraClient::new(&cli.jira_base_url, cli.credentials())?;

    let warehouse = if cli.dry_run {
        None
    } else {
        Some(Warehouse::new(&cli.warehouse_db).await?)
    };

    let metrics = run(
        &jira_client,
        &cli.issue,
        &config,
        warehouse.as_ref().map(|w| w as &dyn WarehouseSink),
        cli.load_options(),
    )
    .await?;

    let Some(warehouse) = warehouse else {
        println!("{}", serde_json::to_string_pretty(&report(&metrics)?)?);
        return Ok(());
    };
    if let Some(issue_id) = metrics.issue_id.as_deref() {
        let stored = warehouse.rows_for_issue(issue_id).await?;
        tracing::info!(issue_id, rows = stored.len(), "Warehouse rows for this incident");
    }
    Ok(())
}
