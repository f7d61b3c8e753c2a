//! Issue documents and a recording warehouse shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::JiraIssue;
use crate::warehouse::{from_ndjson, WarehouseError, WarehouseSink};

pub const START_FIELD: &str = "customfield_10064";

pub fn history(created: &str, field: &str, from: &str, to: &str) -> Value {
    json!({
        "created": created,
        "items": [{"field": field, "fromString": from, "toString": to}]
    })
}

pub fn bug_json(priority: &str, start: Option<&str>, histories: Vec<Value>) -> Value {
    json!({
        "id": "20417",
        "key": "BUG-42",
        "fields": {
            "priority": {"name": priority},
            "issuetype": {"name": "Bug"},
            "created": "2023-04-10T11:02:45.318-0400",
            START_FIELD: start,
            "issuelinks": []
        },
        "changelog": {"histories": histories}
    })
}

pub fn epic_json(links: Vec<Value>, histories: Vec<Value>) -> Value {
    json!({
        "id": "20400",
        "key": "INC-9",
        "fields": {
            "issuetype": {"name": "Epic"},
            "created": "2023-04-12T09:00:00.000-0400",
            "issuelinks": links
        },
        "changelog": {"histories": histories}
    })
}

pub fn outward_link(key: &str, issue_type: &str) -> Value {
    json!({"outwardIssue": {"key": key, "fields": {"issuetype": {"name": issue_type}}}})
}

pub fn inward_link(key: &str, issue_type: &str) -> Value {
    json!({"inwardIssue": {"key": key, "fields": {"issuetype": {"name": issue_type}}}})
}

pub fn issue(value: Value) -> JiraIssue {
    serde_json::from_value(value).expect("fixture decodes")
}

/// Sink that records every call, optionally failing deletes.
#[derive(Default)]
pub struct RecordingSink {
    pub fail_delete: bool,
    calls: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WarehouseSink for RecordingSink {
    async fn delete_issue_rows(&self, issue_id: &str) -> Result<usize, WarehouseError> {
        self.calls.lock().unwrap().push(format!("delete {issue_id}"));
        if self.fail_delete {
            return Err(WarehouseError::Sqlite("no such table: incident_metrics".into()));
        }
        Ok(1)
    }

    async fn load_ndjson(&self, payload: String) -> Result<usize, WarehouseError> {
        let rows = from_ndjson(&payload)?;
        self.calls.lock().unwrap().push(format!("load {}", rows.len()));
        Ok(rows.len())
    }
}
