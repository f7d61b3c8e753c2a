use chrono::{DateTime, Duration, FixedOffset, Timelike};
use serde::Serialize;

use crate::changelog::{self, find_transition};
use crate::models::JiraIssue;
use crate::timestamps::{duration, parse_timestamp, TimestampError};

pub const DEFAULT_START_TIME_FIELD: &str = "customfield_10064";

/// Explicit timestamps supplied by the caller. Each one replaces the value the
/// changelog would otherwise provide.
#[derive(Debug, Clone, Default)]
pub struct TimestampOverrides {
    pub issue_addressed: Option<String>,
    pub issue_remediated: Option<String>,
    pub user_contacted: Option<String>,
    pub postmortem_complete: Option<String>,
}

/// What the builder needs besides the two issues.
#[derive(Debug, Clone)]
pub struct MetricsContext {
    /// Field on the bug holding the incident start time.
    pub start_time_field: String,
    /// Offset applied to timestamps that carry none.
    pub default_offset: FixedOffset,
}

/// Metrics for one production incident.
///
/// Every incident has two Jira tickets: the bug filed by the on-call engineer once the
/// incident begins, and the epic created after it is resolved and linked to the bug.
/// Everything here is derived from those two tickets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentMetrics {
    /// Jira id of the bug.
    pub id: Option<String>,
    /// Key of the epic.
    pub issue_id: Option<String>,
    pub is_business_hours: bool,
    pub is_blocker: bool,
    pub incident_timestamp: Option<DateTime<FixedOffset>>,
    pub issue_addressed: Option<DateTime<FixedOffset>>,
    pub issue_remediated: Option<DateTime<FixedOffset>>,
    pub mortem_scheduled: Option<DateTime<FixedOffset>>,
    pub postmortem_complete: Option<DateTime<FixedOffset>>,
    pub user_contacted: Option<DateTime<FixedOffset>>,
}

/// Time from the incident start to each response milestone.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseIntervals {
    pub time_to_issue_addressed: Option<Duration>,
    pub time_to_user_contacted: Option<Duration>,
    pub time_to_issue_remediated: Option<Duration>,
    pub time_to_mortem_scheduled: Option<Duration>,
    pub time_to_postmortem_complete: Option<Duration>,
}

impl ResponseIntervals {
    /// Intervals as whole seconds, keyed by name.
    pub fn as_seconds(&self) -> Vec<(&'static str, Option<i64>)> {
        [
            ("time_to_issue_addressed", self.time_to_issue_addressed),
            ("time_to_user_contacted", self.time_to_user_contacted),
            ("time_to_issue_remediated", self.time_to_issue_remediated),
            ("time_to_mortem_scheduled", self.time_to_mortem_scheduled),
            ("time_to_postmortem_complete", self.time_to_postmortem_complete),
        ]
        .into_iter()
        .map(|(name, interval)| (name, interval.map(|d| d.num_seconds())))
        .collect()
    }
}

/// Business hours as seconds from midnight, both ends inclusive.
const BUSINESS_HOURS: std::ops::RangeInclusive<u32> = 9 * 3600..=16 * 3600;

/// Whether `start` falls within business hours, 09:00 to 16:00 inclusive, on its own
/// wall clock.
pub fn is_business_hours(start: DateTime<FixedOffset>) -> bool {
    BUSINESS_HOURS.contains(&start.num_seconds_from_midnight())
}

impl IncidentMetrics {
    pub fn build(
        bug: &JiraIssue,
        epic: &JiraIssue,
        overrides: &TimestampOverrides,
        context: &MetricsContext,
    ) -> Result<Self, TimestampError> {
        let parse = |raw: Option<&str>| parse_timestamp(raw, context.default_offset);

        let start_raw = bug
            .fields
            .custom_str(&context.start_time_field)
            .filter(|raw| !raw.trim().is_empty())
            .or(bug.fields.created.as_deref());
        let start_time = parse(start_raw)?;

        let bug_changes = &bug.changelog.histories;
        let epic_changes = &epic.changelog.histories;

        let issue_addressed = overrides
            .issue_addressed
            .as_deref()
            .or(bug.fields.created.as_deref());
        let issue_remediated = overrides
            .issue_remediated
            .as_deref()
            .or_else(|| find_transition(bug_changes, &changelog::REMEDIATED));
        let mortem_scheduled = find_transition(epic_changes, &changelog::REVIEW_SCHEDULED);
        let postmortem_complete = overrides
            .postmortem_complete
            .as_deref()
            .or_else(|| find_transition(epic_changes, &changelog::REVIEW_COMPLETE));
        let user_contacted = overrides
            .user_contacted
            .as_deref()
            .or_else(|| find_transition(bug_changes, &changelog::USERS_INFORMED));

        Ok(Self {
            id: bug.id.clone(),
            issue_id: epic.key.clone(),
            is_business_hours: start_time.is_some_and(is_business_hours),
            is_blocker: bug.fields.priority_name() == Some("Blocker"),
            incident_timestamp: start_time,
            issue_addressed: parse(issue_addressed)?,
            issue_remediated: parse(issue_remediated)?,
            mortem_scheduled: parse(mortem_scheduled)?,
            postmortem_complete: parse(postmortem_complete)?,
            user_contacted: parse(user_contacted)?,
        })
    }

    pub fn response_intervals(&self) -> ResponseIntervals {
        let since_start = |end| duration(self.incident_timestamp, end);
        ResponseIntervals {
            time_to_issue_addressed: since_start(self.issue_addressed),
            time_to_user_contacted: since_start(self.user_contacted),
            time_to_issue_remediated: since_start(self.issue_remediated),
            time_to_mortem_scheduled: since_start(self.mortem_scheduled),
            time_to_postmortem_complete: since_start(self.postmortem_complete),
        }
    }
}
