pub mod auth;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod session;
pub mod telemetry;

pub use auth::{AuthStatus, AuthStatusStore, StatusDisplay, StatusSource, StatusView};
pub use client::{AgentClient, Backend, BackendKind, HttpBackend, MockBackend, StatusClient};
pub use config::{ClientSettings, ConfigError};
pub use conversation::{ConversationStore, Entry, Message, MessageRole, NewMessage};
pub use error::{ClientError, ConversationError};
pub use orchestrator::{ConversationOrchestrator, ExchangeState, IgnoreReason, SendOutcome};
pub use poller::StatusPoller;
pub use session::DashboardSession;
