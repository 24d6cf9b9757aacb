//! Status conditions shared by all fleet records

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";
pub const CONDITION_STATUS_UNKNOWN: &str = "Unknown";

/// Status condition
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, unique within a conditions list
    #[serde(rename = "type")]
    pub type_: String,

    /// Status (True, False, Unknown)
    pub status: String,

    /// Machine-readable reason for the last transition
    #[serde(default)]
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Generation of the record this condition was computed against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Last time the status changed
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn new(type_: &str, status: &str, reason: &str, message: impl Into<String>) -> Self {
        Self {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: reason.to_string(),
            message: message.into(),
            observed_generation: None,
            last_transition_time: Utc::now(),
        }
    }

    pub fn with_observed_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == CONDITION_STATUS_TRUE
    }

    pub fn is_false(&self) -> bool {
        self.status == CONDITION_STATUS_FALSE
    }
}

/// Upsert a condition by type.
///
/// An existing entry of the same type is replaced in place. Its transition
/// time is kept unless the status changed.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            let last_transition_time = if existing.status == condition.status {
                existing.last_transition_time
            } else {
                condition.last_transition_time
            };
            *existing = Condition {
                last_transition_time,
                ..condition
            };
        }
        None => conditions.push(condition),
    }
}

/// Find a condition by type
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn set_condition_appends_new_type() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::new("Ready", CONDITION_STATUS_TRUE, "Ok", "fine"),
        );
        set_condition(
            &mut conditions,
            Condition::new("Synced", CONDITION_STATUS_FALSE, "Pending", "later"),
        );

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[1].type_, "Synced");
    }

    #[test]
    fn set_condition_replaces_in_place_without_duplicating() {
        let mut conditions = vec![
            Condition::new("A", CONDITION_STATUS_TRUE, "X", ""),
            Condition::new("B", CONDITION_STATUS_TRUE, "X", ""),
        ];
        set_condition(
            &mut conditions,
            Condition::new("A", CONDITION_STATUS_FALSE, "Y", "changed"),
        );

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].type_, "A");
        assert_eq!(conditions[0].reason, "Y");
        assert!(conditions[0].is_false());
    }

    #[test]
    fn transition_time_only_moves_on_status_change() {
        let old = Utc::now() - Duration::hours(1);
        let mut conditions = vec![Condition {
            last_transition_time: old,
            ..Condition::new("A", CONDITION_STATUS_TRUE, "X", "")
        }];

        set_condition(
            &mut conditions,
            Condition::new("A", CONDITION_STATUS_TRUE, "Z", "same status"),
        );
        assert_eq!(conditions[0].last_transition_time, old);
        assert_eq!(conditions[0].reason, "Z");

        set_condition(
            &mut conditions,
            Condition::new("A", CONDITION_STATUS_FALSE, "Z", "flipped"),
        );
        assert!(conditions[0].last_transition_time > old);
    }

    #[test]
    fn find_condition_by_type() {
        let conditions = vec![Condition::new("A", CONDITION_STATUS_UNKNOWN, "X", "")];
        assert!(find_condition(&conditions, "A").is_some());
        assert!(find_condition(&conditions, "B").is_none());
    }
}
