use crate::models::ChangeEvent;

/// A change the scanner looks for: the first item of an event moving to `to`,
/// optionally only from one of `from`, optionally only on `field`.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub to: &'static str,
    pub from: &'static [&'static str],
    pub field: Option<&'static str>,
}

impl Transition {
    pub const fn to(to: &'static str) -> Self {
        Self {
            to,
            from: &[],
            field: None,
        }
    }

    pub const fn from_any(self, from: &'static [&'static str]) -> Self {
        Self { from, ..self }
    }

    pub const fn on_field(self, field: &'static str) -> Self {
        Self {
            field: Some(field),
            ..self
        }
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        let Some(item) = event.items.first() else {
            return false;
        };
        if let Some(field) = self.field {
            if item.field.as_deref() != Some(field) {
                return false;
            }
        }
        if item.to_value.as_deref() != Some(self.to) {
            return false;
        }
        self.from.is_empty()
            || item
                .from_value
                .as_deref()
                .is_some_and(|from| self.from.contains(&from))
    }
}

/// Bug moved to "Remediated".
pub const REMEDIATED: Transition =
    Transition::to("Remediated").from_any(&["To Do", "In Progress", "On Dev"]);

/// Epic moved to "incident review Scheduled".
pub const REVIEW_SCHEDULED: Transition =
    Transition::to("incident review Scheduled").from_any(&["To Do", "Needs incident review"]);

/// Epic moved to "incident review Meeting Complete".
pub const REVIEW_COMPLETE: Transition = Transition::to("incident review Meeting Complete")
    .from_any(&["incident review Scheduled", "Needs incident review"]);

/// Bug's "Users Informed" flag flipped from "No" to "Yes".
pub const USERS_INFORMED: Transition = Transition::to("Yes")
    .from_any(&["No"])
    .on_field("Users Informed");

/// Raw `created` stamp of the first event in `events` matching `transition`.
///
/// Events are taken in the order Jira returns them; no sorting is applied.
pub fn find_transition<'a>(events: &'a [ChangeEvent], transition: &Transition) -> Option<&'a str> {
    let found = events
        .iter()
        .filter(|event| transition.matches(event))
        .find_map(|event| event.created.as_deref());
    tracing::debug!(to = transition.to, found = ?found, "Scanned changelog");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeItem;

    fn event(created: &str, field: &str, from: &str, to: &str) -> ChangeEvent {
        ChangeEvent {
            created: Some(created.to_string()),
            items: vec![ChangeItem {
                field: Some(field.to_string()),
                from_value: Some(from.to_string()),
                to_value: Some(to.to_string()),
            }],
        }
    }

    #[test]
    fn empty_changelog_has_no_transition() {
        assert_eq!(find_transition(&[], &REMEDIATED), None);
    }

    #[test]
    fn no_event_reaching_target_state() {
        let events = vec![
            event("2023-01-01T10:00:00.000-0500", "status", "To Do", "In Progress"),
            event("2023-01-02T10:00:00.000-0500", "status", "In Progress", "On Dev"),
        ];
        assert_eq!(find_transition(&events, &REMEDIATED), None);
    }

    #[test]
    fn first_matching_event_wins() {
        let events = vec![
            event("2023-01-01T10:00:00.000-0500", "status", "To Do", "In Progress"),
            event("2023-01-02T10:00:00.000-0500", "status", "In Progress", "Remediated"),
            event("2023-01-03T10:00:00.000-0500", "status", "On Dev", "Remediated"),
        ];
        assert_eq!(
            find_transition(&events, &REMEDIATED),
            Some("2023-01-02T10:00:00.000-0500")
        );
    }

    #[test]
    fn unexpected_origin_is_skipped_and_scanning_continues() {
        let events = vec![
            event("2023-01-01T10:00:00.000-0500", "status", "Done", "Remediated"),
            event("2023-01-04T10:00:00.000-0500", "status", "On Dev", "Remediated"),
        ];
        assert_eq!(
            find_transition(&events, &REMEDIATED),
            Some("2023-01-04T10:00:00.000-0500")
        );
    }

    #[test]
    fn without_origin_constraint_any_origin_matches() {
        let events = vec![event("2023-01-01T10:00:00.000-0500", "status", "Done", "Remediated")];
        assert_eq!(
            find_transition(&events, &Transition::to("Remediated")),
            Some("2023-01-01T10:00:00.000-0500")
        );
    }

    #[test]
    fn field_constraint_ignores_other_fields() {
        let events = vec![
            event("2023-01-01T10:00:00.000-0500", "Customer Impact", "No", "Yes"),
            event("2023-01-02T10:00:00.000-0500", "Users Informed", "No", "Yes"),
        ];
        assert_eq!(
            find_transition(&events, &USERS_INFORMED),
            Some("2023-01-02T10:00:00.000-0500")
        );
    }

    #[test]
    fn match_without_timestamp_is_passed_over() {
        let mut undated = event("", "status", "In Progress", "Remediated");
        undated.created = None;
        let events = vec![
            undated,
            event("2023-01-02T10:00:00Z", "status", "On Dev", "Remediated"),
        ];
        assert_eq!(
            find_transition(&events, &REMEDIATED),
            Some("2023-01-02T10:00:00Z")
        );
    }

    #[test]
    fn only_first_item_is_consulted() {
        let mut ev = event("2023-01-01T10:00:00.000-0500", "assignee", "alice", "bob");
        ev.items.push(ChangeItem {
            field: Some("status".to_string()),
            from_value: Some("In Progress".to_string()),
            to_value: Some("Remediated".to_string()),
        });
        let empty = ChangeEvent {
            created: Some("2023-01-02T10:00:00.000-0500".to_string()),
            items: vec![],
        };
        assert_eq!(find_transition(&[ev, empty], &REMEDIATED), None);
    }
}
