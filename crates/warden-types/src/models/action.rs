//! Owner-issued remote actions.

use serde::{Deserialize, Serialize};

/// A remote action, decoded once at the API boundary.
///
/// The wire form is a tagged union:
///
/// ```json
/// {"action": "lock", "password": "hunter2", "message": "Return to reception"}
/// {"action": "alarm"}
/// {"action": "wipe", "paths": ["/data/secrets"]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Full-screen lock requiring an exact (case-sensitive) password match
    Lock {
        password: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Continuous audible alert until cleared
    Alarm,
    /// Return an alarming device to active without requiring unlock
    ClearAlarm,
    /// Display owner text without blocking input (one-shot)
    Message { text: String },
    /// Remote deletion of the given paths (validated against the allowlist)
    Wipe { paths: Vec<String> },
}

impl Action {
    /// Short name used in activity logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Lock { .. } => "lock",
            Self::Alarm => "alarm",
            Self::ClearAlarm => "clear_alarm",
            Self::Message { .. } => "message",
            Self::Wipe { .. } => "wipe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_decode() {
        let action: Action =
            serde_json::from_str(r#"{"action":"lock","password":"danish26"}"#).unwrap();
        assert_eq!(
            action,
            Action::Lock { password: "danish26".to_string(), message: None }
        );
    }

    #[test]
    fn test_lock_with_message_decode() {
        let action: Action = serde_json::from_str(
            r#"{"action":"lock","password":"pw","message":"Call +60 12-345"}"#,
        )
        .unwrap();
        match action {
            Action::Lock { password, message } => {
                assert_eq!(password, "pw");
                assert_eq!(message.as_deref(), Some("Call +60 12-345"));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_unit_variants_decode() {
        let alarm: Action = serde_json::from_str(r#"{"action":"alarm"}"#).unwrap();
        assert_eq!(alarm, Action::Alarm);
        let clear: Action = serde_json::from_str(r#"{"action":"clear_alarm"}"#).unwrap();
        assert_eq!(clear, Action::ClearAlarm);
    }

    #[test]
    fn test_wipe_kind() {
        let action = Action::Wipe { paths: vec!["/data/secrets".to_string()] };
        assert_eq!(action.kind(), "wipe");
    }
}
