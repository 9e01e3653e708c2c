use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use tokio::io::BufReader;
use tokio::runtime::Runtime;
use vidpilot::{parse_context, ui, ChatConsole, CliOverrides};
use vidpilot_core::auth::AuthStatusStore;
use vidpilot_core::client::Backend;
use vidpilot_core::config::ClientSettings;
use vidpilot_core::orchestrator::SendOutcome;
use vidpilot_core::session::DashboardSession;
use vidpilot_core::telemetry;

#[derive(Parser, Debug)]
#[command(name = "vidpilot", version, about = "Terminal client for the Vidpilot assistant")]
struct Cli {
    #[command(flatten)]
    overrides: CliOverrides,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the YouTube connection once.
    Status,
    /// Keep polling the connection status until interrupted.
    Watch,
    /// Ask a single question and print the reply.
    Ask {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Run a quick action such as `generate_titles`.
    Quick {
        action: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Interactive chat (the default).
    Chat,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_logging("warn")?;

    let cli = Cli::parse();
    let settings = cli.overrides.load_settings()?;
    tracing::debug!(api_url = %settings.api_url, backend = ?settings.backend, "settings loaded");

    let runtime = Runtime::new()?;
    runtime.block_on(run(cli.command.unwrap_or(Command::Chat), settings))
}

async fn run(command: Command, settings: ClientSettings) -> Result<()> {
    let backend = Backend::from_settings(&settings)?;
    match command {
        Command::Status => {
            let store = AuthStatusStore::new(backend.status, settings.user_id.clone());
            store.check_status().await;
            println!("{}", ui::status_line(&store.view()));
        }
        Command::Watch => watch(&settings, backend).await?,
        Command::Ask { message } => {
            let session = DashboardSession::init(&settings, backend);
            let outcome = session.orchestrator().send_message(&message.join(" ")).await;
            print_outcome(&outcome);
            session.dispose().await;
        }
        Command::Quick { action, context } => {
            let session = DashboardSession::init(&settings, backend);
            let outcome = session
                .orchestrator()
                .send_quick_action(&action, parse_context(context.as_deref()))
                .await;
            print_outcome(&outcome);
            session.dispose().await;
        }
        Command::Chat => {
            let session = DashboardSession::init(&settings, backend);
            let console = ChatConsole::new(session);
            let mut stdout = io::stdout();
            console
                .run(BufReader::new(tokio::io::stdin()), &mut stdout)
                .await?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn watch(settings: &ClientSettings, backend: Backend) -> Result<()> {
    let session = DashboardSession::init(settings, backend);
    let mut updates = session.subscribe_status();
    let mut last = String::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = ui::status_line(&updates.borrow_and_update());
                if line != last {
                    println!("{} {line}", chrono::Local::now().format("%H:%M:%S"));
                    last = line;
                }
            }
        }
    }
    session.dispose().await;
    Ok(())
}

fn print_outcome(outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Resolved(message) | SendOutcome::Failed(message) => {
            println!("{}", ui::message_line(message));
        }
        other => {
            if let Some(notice) = ui::outcome_notice(other) {
                println!("{notice}");
            }
        }
    }
}
