use crate::error::CommandError;
use crate::model::{Role, Session};
use serde::Deserialize;

/// Login form contents. Which fields matter depends on the selected role.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub username: String,
    // Accepted and never checked.
    #[allow(dead_code)]
    pub password: String,
    pub name: String,
    #[serde(alias = "rollno", alias = "roll")]
    pub roll_number: String,
}

/// Holds the single active session, if any.
#[derive(Debug, Default)]
pub struct AuthStore {
    session: Option<Session>,
}

impl AuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Starts a session for `role`, replacing any current one.
    ///
    /// Credentials are not verified; only non-empty identity fields are required.
    pub fn login(&mut self, role: Role, credentials: &Credentials) -> Result<&Session, CommandError> {
        let (display_name, roll_number) = match role {
            Role::Admin => (required(&credentials.username, "username")?, None),
            Role::Student => (
                required(&credentials.name, "name")?,
                Some(required(&credentials.roll_number, "rollNumber")?),
            ),
        };

        if let Some(prev) = self.session.as_ref() {
            tracing::debug!(previous_role = prev.role.as_str(), "replacing active session");
        }
        tracing::info!(role = role.as_str(), "login");

        Ok(&*self.session.insert(Session {
            role,
            display_name,
            roll_number,
            logged_in_at: chrono::Utc::now().to_rfc3339(),
        }))
    }

    /// Clears the session. No-op when nobody is logged in.
    pub fn logout(&mut self) {
        if let Some(prev) = self.session.take() {
            tracing::info!(role = prev.role.as_str(), "logout");
        }
    }

    /// Gate for roster mutations.
    pub fn require_admin(&self, action: &'static str) -> Result<&Session, CommandError> {
        match self.session.as_ref() {
            Some(s) if s.role == Role::Admin => Ok(s),
            other => {
                tracing::warn!(
                    action,
                    role = other.map(|s| s.role.as_str()).unwrap_or("none"),
                    "mutation rejected"
                );
                Err(CommandError::Forbidden { action })
            }
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, CommandError> {
    let t = value.trim();
    if t.is_empty() {
        return Err(CommandError::MissingCredential(field));
    }
    Ok(t.to_string())
}
