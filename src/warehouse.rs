use crate::metrics::IncidentMetrics;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const TABLE: &str = "incident_metrics";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Failed to create storage directory: {0}")]
    StorageCreation(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(String),
    #[error("Failed to serialize rows: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<tokio_rusqlite::Error> for WarehouseError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        WarehouseError::Sqlite(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UpsertMode {
    /// Add the row.
    #[default]
    Append,
    /// Replace any row for the same epic.
    Update,
}

/// What `update` does when removing the old row fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DeleteFailurePolicy {
    /// Log and load the new row anyway. The table may end up with duplicates.
    #[default]
    AppendAnyway,
    /// Stop without loading.
    Abort,
}

/// One warehouse row. Timestamps are stored as `YYYY-MM-DD HH:MM:SS±HH:MM` strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WarehouseRow {
    pub id: Option<String>,
    pub issue_id: Option<String>,
    pub is_business_hours: bool,
    pub is_blocker: bool,
    pub incident_timestamp: Option<String>,
    pub issue_addressed: Option<String>,
    pub issue_remediated: Option<String>,
    pub mortem_scheduled: Option<String>,
    pub postmortem_complete: Option<String>,
    pub user_contacted: Option<String>,
}

fn format_timestamp(ts: Option<DateTime<FixedOffset>>) -> Option<String> {
    ts.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
}

impl From<&IncidentMetrics> for WarehouseRow {
    fn from(metrics: &IncidentMetrics) -> Self {
        Self {
            id: metrics.id.clone(),
            issue_id: metrics.issue_id.clone(),
            is_business_hours: metrics.is_business_hours,
            is_blocker: metrics.is_blocker,
            incident_timestamp: format_timestamp(metrics.incident_timestamp),
            issue_addressed: format_timestamp(metrics.issue_addressed),
            issue_remediated: format_timestamp(metrics.issue_remediated),
            mortem_scheduled: format_timestamp(metrics.mortem_scheduled),
            postmortem_complete: format_timestamp(metrics.postmortem_complete),
            user_contacted: format_timestamp(metrics.user_contacted),
        }
    }
}

/// Newline-delimited JSON, one row per line.
pub fn to_ndjson(rows: &[WarehouseRow]) -> Result<String, serde_json::Error> {
    let mut payload = String::new();
    for row in rows {
        payload.push_str(&serde_json::to_string(row)?);
        payload.push('\n');
    }
    Ok(payload)
}

pub fn from_ndjson(payload: &str) -> Result<Vec<WarehouseRow>, serde_json::Error> {
    payload
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}

/// Destination table operations the loader relies on.
#[async_trait]
pub trait WarehouseSink: Send + Sync {
    /// Remove every row for `issue_id`, returning how many went.
    async fn delete_issue_rows(&self, issue_id: &str) -> Result<usize, WarehouseError>;
    /// Bulk-load NDJSON rows, returning how many were written.
    async fn load_ndjson(&self, payload: String) -> Result<usize, WarehouseError>;
}

/// Write `metrics` to the warehouse.
///
/// In `Update` mode existing rows for the same epic are deleted first. A failed delete
/// is handled according to `on_delete_failure`.
pub async fn upsert(
    sink: &dyn WarehouseSink,
    metrics: &IncidentMetrics,
    mode: UpsertMode,
    on_delete_failure: DeleteFailurePolicy,
) -> Result<usize, WarehouseError> {
    if mode == UpsertMode::Update {
        match metrics.issue_id.as_deref() {
            Some(issue_id) => match sink.delete_issue_rows(issue_id).await {
                Ok(deleted) => tracing::info!(issue_id, deleted, "Removed previous rows"),
                Err(e) => match on_delete_failure {
                    DeleteFailurePolicy::AppendAnyway => tracing::warn!(
                        issue_id,
                        error = %e,
                        "Could not remove previous rows, appending anyway"
                    ),
                    DeleteFailurePolicy::Abort => return Err(e),
                },
            },
            None => tracing::warn!("Record has no issue_id, nothing to replace"),
        }
    }

    let payload = to_ndjson(&[WarehouseRow::from(metrics)])?;
    let loaded = sink.load_ndjson(payload).await?;
    tracing::info!(table = TABLE, loaded, ?mode, "Loaded incident metrics");
    Ok(loaded)
}

pub struct Warehouse {
    connection: tokio_rusqlite::Connection,
}

impl Warehouse {
    pub async fn new(path: &Path) -> Result<Self, WarehouseError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let connection = tokio_rusqlite::Connection::open(path).await?;
        let warehouse = Warehouse { connection };
        warehouse._init_table().await?;
        Ok(warehouse)
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, WarehouseError> {
        let connection = tokio_rusqlite::Connection::open_in_memory().await?;
        let warehouse = Warehouse { connection };
        warehouse._init_table().await?;
        Ok(warehouse)
    }

    async fn _init_table(&self) -> Result<(), WarehouseError> {
        let init = "
            CREATE TABLE IF NOT EXISTS incident_metrics (
                id TEXT,
                issue_id TEXT,
                is_business_hours BOOLEAN NOT NULL,
                is_blocker BOOLEAN NOT NULL,
                incident_timestamp TEXT,
                issue_addressed TEXT,
                issue_remediated TEXT,
                mortem_scheduled TEXT,
                postmortem_complete TEXT,
                user_contacted TEXT
            )";
        self.connection
            .call(|conn| {
                conn.execute(init, [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await?;
        Ok(())
    }

    pub async fn rows_for_issue(&self, issue_id: &str) -> Result<Vec<WarehouseRow>, WarehouseError> {
        let query = "
            SELECT * FROM incident_metrics WHERE issue_id = ? ORDER BY rowid
        ";
        let issue_id = issue_id.to_string();
        let rows = self
            .connection
            .call(move |conn| {
                let mut stmt = conn
                    .prepare_cached(query)
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([issue_id.as_str()], |row| {
                        Ok(WarehouseRow {
                            id: row.get("id")?,
                            issue_id: row.get("issue_id")?,
                            is_business_hours: row.get("is_business_hours")?,
                            is_blocker: row.get("is_blocker")?,
                            incident_timestamp: row.get("incident_timestamp")?,
                            issue_addressed: row.get("issue_addressed")?,
                            issue_remediated: row.get("issue_remediated")?,
                            mortem_scheduled: row.get("mortem_scheduled")?,
                            postmortem_complete: row.get("postmortem_complete")?,
                            user_contacted: row.get("user_contacted")?,
                        })
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                rows.collect::<Result<Vec<_>, _>>()
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl WarehouseSink for Warehouse {
    async fn delete_issue_rows(&self, issue_id: &str) -> Result<usize, WarehouseError> {
        let query = "DELETE FROM incident_metrics WHERE issue_id = ?";
        let issue_id = issue_id.to_string();
        let deleted = self
            .connection
            .call(move |conn| {
                conn.execute(query, [issue_id.as_str()])
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await?;
        Ok(deleted)
    }

    async fn load_ndjson(&self, payload: String) -> Result<usize, WarehouseError> {
        let rows = from_ndjson(&payload)?;
        let query = "
            INSERT INTO incident_metrics (
                id, issue_id, is_business_hours, is_blocker, incident_timestamp,
                issue_addressed, issue_remediated, mortem_scheduled, postmortem_complete,
                user_contacted
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ";
        let loaded = self
            .connection
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut loaded = 0;
                for row in &rows {
                    loaded += tx
                        .execute(
                            query,
                            (
                                row.id.as_deref(),
                                row.issue_id.as_deref(),
                                row.is_business_hours,
                                row.is_blocker,
                                row.incident_timestamp.as_deref(),
                                row.issue_addressed.as_deref(),
                                row.issue_remediated.as_deref(),
                                row.mortem_scheduled.as_deref(),
                                row.postmortem_complete.as_deref(),
                                row.user_contacted.as_deref(),
                            ),
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(loaded)
            })
            .await?;
        Ok(loaded)
    }
}
