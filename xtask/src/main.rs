use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::info;
use vidpilot_core::client::{Backend, MockBackend};
use vidpilot_core::orchestrator::SendOutcome;
use vidpilot_core::session::DashboardSession;
use vidpilot_core::telemetry;

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for Vidpilot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a session end to end against the in-process mock backend.
    Smoke,
}

fn main() -> Result<()> {
    telemetry::init_logging("info")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke => smoke_test(),
    }
}

fn smoke_test() -> Result<()> {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let mock = Arc::new(MockBackend::default());
        let session = DashboardSession::with_interval(
            Backend::new(mock.clone(), mock.clone()),
            "smoke_user",
            Duration::from_millis(200),
        );

        let mut updates = session.subscribe_status();
        updates.wait_for(|view| view.status.is_some()).await?;
        info!(
            "authenticated" = session.status_view().is_authenticated(),
            "status poll completed"
        );

        let chat = session.orchestrator().send_message("ping from xtask").await;
        let quick = session
            .orchestrator()
            .send_quick_action("generate_titles", serde_json::json!("smoke"))
            .await;
        for outcome in [&chat, &quick] {
            if !matches!(outcome, SendOutcome::Resolved(_)) {
                bail!("smoke exchange did not resolve: {outcome:?}");
            }
        }

        info!(
            "messages" = session.conversation().len(),
            "smoke test conversation completed"
        );
        session.dispose().await;
        Ok::<(), anyhow::Error>(())
    })
}
