use crate::bug_link::{resolve_bug_key, BugLinkError, LinkPolicy};
use crate::jira_client::*;
use crate::metrics::{IncidentMetrics, MetricsContext, TimestampOverrides};
use crate::timestamps::TimestampError;
use crate::warehouse::{upsert, DeleteFailurePolicy, UpsertMode, WarehouseError, WarehouseSink};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Jira(#[from] JiraError),
    #[error(transparent)]
    BugLink(#[from] BugLinkError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error("Warehouse load failed: {0}")]
    Warehouse(#[from] WarehouseError),
    #[error("Failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}

pub struct CollectorConfig {
    pub metrics: MetricsContext,
    pub link_policy: LinkPolicy,
    pub overrides: TimestampOverrides,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub mode: UpsertMode,
    pub on_delete_failure: DeleteFailurePolicy,
}

/// Fetch the epic and its bug from Jira and derive the incident's metrics.
///
/// The epic reaching "incident review Meeting Complete" marks the incident as over and
/// is the usual trigger for running this.
pub async fn collect_incident_metrics(
    jira_client: &JiraClient,
    epic_key: &str,
    config: &CollectorConfig,
) -> Result<IncidentMetrics, CollectError> {
    tracing::info!(epic = epic_key, "Collecting incident metrics");

    let epic = jira_client.get_issue(epic_key).await?;
    let bug_key = resolve_bug_key(&epic, config.link_policy)?;
    tracing::info!(
        epic = epic_key,
        epic_status = epic.fields.status_name().unwrap_or("unknown"),
        bug = %bug_key,
        "Resolved linked bug"
    );

    let bug = jira_client.get_issue(&bug_key).await?;
    tracing::info!(
        bug = %bug_key,
        bug_status = bug.fields.status_name().unwrap_or("unknown"),
        changes = bug.changelog.histories.len(),
        "Fetched bug"
    );
    let metrics = IncidentMetrics::build(&bug, &epic, &config.overrides, &config.metrics)?;

    for (name, seconds) in metrics.response_intervals().as_seconds() {
        tracing::debug!(metric = name, seconds = ?seconds, "Response interval");
    }
    Ok(metrics)
}

/// Collect the metrics and, unless `sink` is `None` (dry run), load them.
pub async fn run(
    jira_client: &JiraClient,
    epic_key: &str,
    config: &CollectorConfig,
    sink: Option<&dyn WarehouseSink>,
    load: LoadOptions,
) -> Result<IncidentMetrics, CollectError> {
    let metrics = collect_incident_metrics(jira_client, epic_key, config).await?;

    match sink {
        Some(sink) => {
            upsert(sink, &metrics, load.mode, load.on_delete_failure).await?;
        }
        None => tracing::info!(epic = epic_key, "Dry run, skipping warehouse load"),
    }
    Ok(metrics)
}

/// The metrics record plus the response intervals in seconds.
pub fn report(metrics: &IncidentMetrics) -> Result<Value, CollectError> {
    let mut report = serde_json::to_value(metrics)?;
    if let Value::Object(fields) = &mut report {
        for (name, seconds) in metrics.response_intervals().as_seconds() {
            fields.insert(name.to_string(), seconds.into());
        }
    }
    Ok(report)
}
