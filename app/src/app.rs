use crate::ui;
use anyhow::Result;
use serde_json::Value;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use vidpilot_core::orchestrator::SendOutcome;
use vidpilot_core::session::DashboardSession;

const HELP: &str = "Commands:
  <text>                     ask the assistant
  /quick <action> [context]  run a quick action, e.g. /quick generate_titles gaming
  /status                    show the YouTube connection status
  /history                   print the conversation so far
  /reset                     clear the conversation
  /quit                      leave";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Send(String),
    QuickAction { action: String, context: Value },
    Status,
    History,
    Reset,
    Help,
    Quit,
    Nothing,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Self::Nothing);
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Ok(Self::Send(line.trim_end_matches(['\r', '\n']).to_string()));
        };
        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        match name {
            "quick" | "q" => {
                let (action, context) = match rest.split_once(char::is_whitespace) {
                    Some((action, context)) => (action, Some(context.trim())),
                    None => (rest, None),
                };
                if action.is_empty() {
                    return Err("usage: /quick <action> [context]".to_string());
                }
                Ok(Self::QuickAction {
                    action: action.to_string(),
                    context: parse_context(context),
                })
            }
            "status" => Ok(Self::Status),
            "history" => Ok(Self::History),
            "reset" => Ok(Self::Reset),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command /{other}; try /help")),
        }
    }
}

/// JSON when the text parses as JSON, otherwise the text as a string.
pub fn parse_context(raw: Option<&str>) -> Value {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Value::Null,
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

/// Line-oriented chat front end over a [`DashboardSession`].
///
/// Exchanges run on spawned tasks so input keeps flowing while the agent
/// thinks; anything typed meanwhile hits the orchestrator's in-flight guard.
pub struct ChatConsole {
    session: DashboardSession,
    tx: UnboundedSender<SendOutcome>,
    rx: UnboundedReceiver<SendOutcome>,
    pending: usize,
    last_status: Option<String>,
}

impl ChatConsole {
    pub fn new(session: DashboardSession) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            session,
            tx,
            rx,
            pending: 0,
            last_status: None,
        }
    }

    pub fn session(&self) -> &DashboardSession {
        &self.session
    }

    /// Read commands until EOF or `/quit`, then wait for any exchange still
    /// running and dispose the session.
    pub async fn run<R, W>(mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        let mut status_rx = self.session.subscribe_status();
        writeln!(out, "Type /help for commands.")?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match ConsoleCommand::parse(&line) {
                        Ok(ConsoleCommand::Quit) => break,
                        Ok(command) => self.execute(command, out)?,
                        Err(message) => writeln!(out, "{message}")?,
                    }
                }
                Some(outcome) = self.rx.recv() => self.report(outcome, out)?,
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = status_rx.borrow_and_update().clone();
                    self.print_status_if_changed(&ui::status_line(&view), out)?;
                }
            }
        }

        while self.pending > 0 {
            let Some(outcome) = self.rx.recv().await else {
                break;
            };
            self.report(outcome, out)?;
        }
        self.session.dispose().await;
        Ok(())
    }

    fn execute<W: Write>(&mut self, command: ConsoleCommand, out: &mut W) -> Result<()> {
        match command {
            ConsoleCommand::Send(content) => {
                let orchestrator = self.session.orchestrator();
                self.spawn(async move { orchestrator.send_message(&content).await });
            }
            ConsoleCommand::QuickAction { action, context } => {
                let orchestrator = self.session.orchestrator();
                self.spawn(async move { orchestrator.send_quick_action(&action, context).await });
            }
            ConsoleCommand::Status => {
                writeln!(out, "{}", ui::status_line(&self.session.status_view()))?;
            }
            ConsoleCommand::History => {
                for entry in self.session.conversation().entries() {
                    writeln!(out, "{}", ui::entry_line(&entry))?;
                }
            }
            ConsoleCommand::Reset => {
                self.session.reset_conversation();
                writeln!(out, "Conversation cleared.")?;
            }
            ConsoleCommand::Help => writeln!(out, "{HELP}")?,
            ConsoleCommand::Quit | ConsoleCommand::Nothing => {}
        }
        Ok(())
    }

    fn spawn<F>(&mut self, exchange: F)
    where
        F: std::future::Future<Output = SendOutcome> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            let outcome = exchange.await;
            if tx.send(outcome).is_err() {
                tracing::warn!("console closed before the exchange completed");
            }
        });
    }

    fn report<W: Write>(&mut self, outcome: SendOutcome, out: &mut W) -> Result<()> {
        self.pending = self.pending.saturating_sub(1);
        match &outcome {
            SendOutcome::Resolved(message) | SendOutcome::Failed(message) => {
                writeln!(out, "{}", ui::message_line(message))?;
            }
            other => {
                if let Some(notice) = ui::outcome_notice(other) {
                    writeln!(out, "{notice}")?;
                }
            }
        }
        Ok(())
    }

    fn print_status_if_changed<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()> {
        if self.last_status.as_deref() != Some(line) {
            writeln!(out, "[status] {line}")?;
            self.last_status = Some(line.to_string());
        }
        Ok(())
    }
}
