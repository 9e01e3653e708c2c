use std::sync::Arc;
use std::time::Duration;
use vidpilot::ChatConsole;
use vidpilot_core::client::{Backend, MockBackend};
use vidpilot_core::session::DashboardSession;

fn mock_session() -> (DashboardSession, Arc<MockBackend>) {
    let mock = Arc::new(MockBackend::default().with_latency(Duration::from_millis(5)));
    let session = DashboardSession::with_interval(
        Backend::new(mock.clone(), mock.clone()),
        "default_user",
        Duration::from_secs(30),
    );
    (session, mock)
}

async fn run_console(input: &str, session: DashboardSession) -> String {
    let mut out = Vec::new();
    ChatConsole::new(session)
        .run(input.as_bytes(), &mut out)
        .await
        .expect("console run");
    String::from_utf8(out).expect("utf8 output")
}

#[tokio::test]
async fn console_prints_agent_reply_before_exit() {
    let (session, _mock) = mock_session();
    let output = run_console("What's my CTR?\n", session).await;
    assert!(
        output.contains("Vidpilot: [Mock agent] received 'What's my CTR?'."),
        "{output}"
    );
}

#[tokio::test]
async fn console_reports_failures_as_error_messages() {
    let (session, mock) = mock_session();
    mock.fail_next_agent_call("quota exceeded");
    let output = run_console("/quick generate_titles gaming\n", session).await;
    assert!(
        output.contains("Vidpilot [error]: Sorry, I encountered an error: quota exceeded"),
        "{output}"
    );
}

#[tokio::test]
async fn console_rejects_unknown_commands() {
    let (session, _mock) = mock_session();
    let output = run_console("/dance\n/quit\n", session).await;
    assert!(output.contains("unknown command /dance"), "{output}");
}
