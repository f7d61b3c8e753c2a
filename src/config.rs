use crate::bug_link::LinkPolicy;
use crate::collector::{CollectorConfig, LoadOptions};
use crate::jira_client::JiraCredentials;
use crate::metrics::{MetricsContext, TimestampOverrides, DEFAULT_START_TIME_FIELD};
use crate::timestamps::business_offset;
use crate::warehouse::{DeleteFailurePolicy, UpsertMode};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

/// Load incident-response metrics for a Jira incident epic into the warehouse.
///
/// Every option can also be set through the environment or a `.env` file.
#[derive(Parser)]
#[command(name = "incident-metrics")]
#[command(version)]
pub struct Cli {
    /// Key of the incident epic, e.g. INC-123
    #[arg(long)]
    pub issue: String,

    /// Jira user the API token belongs to
    #[arg(long, env = "JIRA_API_USER")]
    pub api_user: String,

    /// Jira API token
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Jira site, e.g. https://example.atlassian.net
    #[arg(long, env = "JIRA_BASE_URL")]
    pub jira_base_url: String,

    /// Bug field holding the incident start time
    #[arg(long, env = "JIRA_START_TIME_FIELD", default_value = DEFAULT_START_TIME_FIELD)]
    pub start_time_field: String,

    /// SQLite database the metrics are loaded into
    #[arg(long, env = "WAREHOUSE_DB", default_value = "storage/incident_metrics.db")]
    pub warehouse_db: PathBuf,

    /// When the issue was addressed, instead of the bug's creation time
    #[arg(long)]
    pub issue_addressed: Option<String>,

    /// When the issue was remediated, instead of the bug changelog
    #[arg(long)]
    pub issue_remediated: Option<String>,

    /// When users were contacted, instead of the bug changelog
    #[arg(long)]
    pub user_contacted: Option<String>,

    /// When the postmortem was completed, instead of the epic changelog
    #[arg(long)]
    pub postmortem_complete: Option<String>,

    /// Compute and print the metrics without touching the warehouse
    #[arg(long)]
    pub dry_run: bool,

    /// Append a new row or replace the epic's existing row
    #[arg(long, value_enum, default_value_t = UpsertMode::Append)]
    pub upsert_mode: UpsertMode,

    /// How many linked bugs an epic may have
    #[arg(long, value_enum, env = "BUG_LINK_POLICY", default_value_t = LinkPolicy::FirstMatch)]
    pub bug_link_policy: LinkPolicy,

    /// What update mode does when the old row cannot be removed
    #[arg(long, value_enum, env = "ON_DELETE_FAILURE", default_value_t = DeleteFailurePolicy::AppendAnyway)]
    pub on_delete_failure: DeleteFailurePolicy,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn credentials(&self) -> JiraCredentials {
        JiraCredentials {
            user: self.api_user.clone(),
            api_token: self.api_token.clone(),
        }
    }

    /// Collector settings, with the business timezone offset taken at `now`.
    pub fn collector_config(&self, now: DateTime<Utc>) -> CollectorConfig {
        CollectorConfig {
            metrics: MetricsContext {
                start_time_field: self.start_time_field.clone(),
                default_offset: business_offset(now),
            },
            link_policy: self.bug_link_policy,
            overrides: TimestampOverrides {
                issue_addressed: self.issue_addressed.clone(),
                issue_remediated: self.issue_remediated.clone(),
                user_contacted: self.user_contacted.clone(),
                postmortem_complete: self.postmortem_complete.clone(),
            },
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            mode: self.upsert_mode,
            on_delete_failure: self.on_delete_failure,
        }
    }
}
