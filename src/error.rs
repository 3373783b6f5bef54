//! Typed failures for roster and session commands.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-field validation messages, keyed by the input field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// A roster mutation was attempted without an admin session.
    #[error("{action} requires an admin session")]
    Forbidden { action: &'static str },

    #[error("invalid student: {} field(s) failed validation", .0.len())]
    Validation(FieldErrors),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

impl CommandError {
    /// Stable wire code for the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Forbidden { .. } => "forbidden",
            CommandError::Validation(_) => "validation_failed",
            CommandError::MissingCredential(_) => "missing_credential",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            CommandError::Forbidden { action } => Some(serde_json::json!({ "action": action })),
            CommandError::Validation(fields) => {
                Some(serde_json::json!({ "fieldErrors": fields }))
            }
            CommandError::MissingCredential(field) => {
                Some(serde_json::json!({ "field": field }))
            }
        }
    }
}
