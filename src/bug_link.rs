use itertools::Itertools;
use thiserror::Error;

use crate::models::{JiraIssue, LinkedIssue};

const BUG_ISSUE_TYPE: &str = "Bug";

/// How many linked bugs an epic may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LinkPolicy {
    /// Exactly one linked bug.
    StrictSingle,
    /// One or more linked bugs; the first one is used.
    #[default]
    FirstMatch,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BugLinkError {
    #[error("Jira epic {epic} has an incorrect number of Remediated bugs: found {} [{}]", .found.len(), .found.iter().join(", "))]
    IncorrectBugCount { epic: String, found: Vec<String> },
}

fn linked_bug(issue: &LinkedIssue) -> Option<&str> {
    if issue.issue_type_name() == Some(BUG_ISSUE_TYPE) {
        issue.key.as_deref()
    } else {
        None
    }
}

/// Keys of all bugs linked from `epic`, outward links checked before inward ones.
pub fn linked_bug_keys(epic: &JiraIssue) -> Vec<String> {
    epic.fields
        .issue_links
        .iter()
        .filter_map(|link| {
            link.outward_issue
                .as_ref()
                .and_then(linked_bug)
                .or_else(|| link.inward_issue.as_ref().and_then(linked_bug))
        })
        .map(str::to_string)
        .collect()
}

/// Pick the bug whose metrics describe the incident behind `epic`.
pub fn resolve_bug_key(epic: &JiraIssue, policy: LinkPolicy) -> Result<String, BugLinkError> {
    let found = linked_bug_keys(epic);
    let acceptable = match policy {
        LinkPolicy::StrictSingle => found.len() == 1,
        LinkPolicy::FirstMatch => !found.is_empty(),
    };
    if !acceptable {
        return Err(BugLinkError::IncorrectBugCount {
            epic: epic.key.clone().unwrap_or_default(),
            found,
        });
    }
    if found.len() > 1 {
        tracing::warn!(
            bugs = %found.iter().join(", "),
            "Epic links several bugs, using the first"
        );
    }
    Ok(found.into_iter().next().unwrap_or_default())
}
