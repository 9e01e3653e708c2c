use thiserror::Error;

/// Failures surfaced by the status and agent collaborators.
///
/// The `Display` text is what ends up inside user-visible error messages, so
/// every variant renders something a person can read.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with HTTP {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("{0}")]
    Backend(String),
}

impl ClientError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Text describing the failure, or `"Unknown error"` when there is none.
    pub fn detail(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            text
        }
    }
}

fn body_suffix(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Conversation log violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("a thinking placeholder is already present")]
    PlaceholderExists,
}
