use thiserror::Error;

/// Typed failures from the external collaborators the reporter talks to
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("query '{name}' failed: {reason}")]
    QueryFailed { name: String, reason: String },

    #[error("webhook returned {status}: {body}")]
    WebhookRejected { status: u16, body: String },

    #[error("command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReporterError {
    pub fn query(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::QueryFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
