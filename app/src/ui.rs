use chrono::{DateTime, Local, Utc};
use vidpilot_core::auth::{StatusDisplay, StatusView};
use vidpilot_core::conversation::{Entry, Message, MessageRole};
use vidpilot_core::orchestrator::{IgnoreReason, SendOutcome};

pub fn role_badge(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "You",
        MessageRole::Agent => "Vidpilot",
    }
}

pub fn status_line(view: &StatusView) -> String {
    let mut line = match view.display() {
        StatusDisplay::Checking => "Checking connection...".to_string(),
        StatusDisplay::Connected {
            hours_remaining: Some(hours),
        } => format!("Connected ({hours}h remaining)"),
        StatusDisplay::Connected {
            hours_remaining: None,
        } => "Connected".to_string(),
        StatusDisplay::NotConnected => "Not Connected".to_string(),
        StatusDisplay::ConnectionError => match &view.last_error {
            Some(detail) => format!("Connection Error: {detail}"),
            None => "Connection Error".to_string(),
        },
    };
    if view.needs_refresh {
        line.push_str(" - token refresh needed");
    }
    line
}

pub fn message_line(message: &Message) -> String {
    let marker = if message.is_error { " [error]" } else { "" };
    format!(
        "[{}] {}{}: {}",
        local_time(message.created_at),
        role_badge(message.role),
        marker,
        message.content
    )
}

pub fn entry_line(entry: &Entry) -> String {
    match entry {
        Entry::Message(message) => message_line(message),
        Entry::Thinking(placeholder) => format!("... {}", placeholder.content),
    }
}

/// Extra line to show for outcomes that did not add a reply.
pub fn outcome_notice(outcome: &SendOutcome) -> Option<&'static str> {
    match outcome {
        SendOutcome::Ignored(IgnoreReason::InFlight) => {
            Some("Still waiting on the previous reply; message not sent.")
        }
        SendOutcome::Ignored(IgnoreReason::Disposed) => Some("Session closed."),
        SendOutcome::Discarded => Some("Reply dropped; the conversation was reset or closed."),
        SendOutcome::Ignored(IgnoreReason::EmptyInput)
        | SendOutcome::Resolved(_)
        | SendOutcome::Failed(_) => None,
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}
