//! Maintenance alert vocabulary and validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Severity of an alert submitted by an operator.
pub const SEVERITY_GENERAL: i16 = 3;

/// Severity of a critical failure-risk alert. Highest on the 1..=5 scale.
pub const SEVERITY_CRITICAL: i16 = 5;

pub const MIN_SEVERITY: i16 = 1;
pub const MAX_SEVERITY: i16 = 5;

/// Alert type recorded for operator-submitted alerts.
pub const ALERT_TYPE_GENERAL: &str = "General";

/// Alert type recorded when a critical alert halts a machine.
pub const ALERT_TYPE_CRITICAL: &str = "Critical Failure Risk";

/// Longest accepted alert message.
const MAX_MESSAGE_LEN: usize = 2000;

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(CoreError::Validation(format!(
                "Unknown alert status: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate an alert message: non-blank and at most `MAX_MESSAGE_LEN`
/// characters.
pub fn validate_alert_message(message: &str) -> Result<(), CoreError> {
    if message.trim().is_empty() {
        return Err(CoreError::Validation(
            "Alert message must not be empty".to_string(),
        ));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(CoreError::Validation(format!(
            "Alert message must not exceed {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a severity on the 1..=5 scale.
pub fn validate_severity(severity: i16) -> Result<(), CoreError> {
    if (MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Severity must be between {MIN_SEVERITY} and {MAX_SEVERITY}, got {severity}"
        )))
    }
}
