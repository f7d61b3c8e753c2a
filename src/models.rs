use serde::Deserialize;
use serde_json::{Map, Value};

/// A Jira issue as returned by `issue/{key}?expand=changelog`.
///
/// Every lookup is optional. Jira error documents (`{"errorMessages": [...]}`) decode
/// into an issue with nothing set rather than failing.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct JiraIssue {
    pub id: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub fields: JiraIssueFields,
    #[serde(default)]
    pub changelog: Changelog,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct JiraIssueFields {
    pub status: Option<NamedField>,
    pub priority: Option<NamedField>,
    pub created: Option<String>,
    #[serde(rename = "issuelinks", default)]
    pub issue_links: Vec<IssueLink>,
    /// Everything else, including the `customfield_*` entries.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl JiraIssueFields {
    /// String value of an arbitrary field such as `customfield_10064`.
    pub fn custom_str(&self, name: &str) -> Option<&str> {
        self.other.get(name).and_then(Value::as_str)
    }

    pub fn priority_name(&self) -> Option<&str> {
        self.priority.as_ref().and_then(|p| p.name.as_deref())
    }

    pub fn status_name(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.name.as_deref())
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct NamedField {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct IssueLink {
    #[serde(rename = "outwardIssue")]
    pub outward_issue: Option<LinkedIssue>,
    #[serde(rename = "inwardIssue")]
    pub inward_issue: Option<LinkedIssue>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct LinkedIssue {
    pub key: Option<String>,
    #[serde(default)]
    pub fields: LinkedIssueFields,
}

impl LinkedIssue {
    pub fn issue_type_name(&self) -> Option<&str> {
        self.fields
            .issue_type
            .as_ref()
            .and_then(|t| t.name.as_deref())
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct LinkedIssueFields {
    #[serde(rename = "issuetype")]
    pub issue_type: Option<NamedField>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<ChangeEvent>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ChangeEvent {
    pub created: Option<String>,
    #[serde(default)]
    pub items: Vec<ChangeItem>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ChangeItem {
    pub field: Option<String>,
    #[serde(rename = "fromString")]
    pub from_value: Option<String>,
    #[serde(rename = "toString")]
    pub to_value: Option<String>,
}
