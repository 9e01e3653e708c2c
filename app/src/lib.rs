pub mod app;
pub mod config;
pub mod ui;

pub use app::{parse_context, ChatConsole, ConsoleCommand};
pub use config::CliOverrides;
