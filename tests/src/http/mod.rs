use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use vidpilot_core::auth::{AuthStatusStore, StatusSource};
use vidpilot_core::client::{
    AgentClient, ChatRequest, HttpBackend, QuickActionRequest, StatusClient,
};
use vidpilot_core::conversation::ConversationStore;
use vidpilot_core::error::ClientError;
use vidpilot_core::orchestrator::{ConversationOrchestrator, SendOutcome};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn backend_for(server: &MockServer) -> Arc<HttpBackend> {
    let base = Url::parse(&server.uri()).expect("mock server url");
    Arc::new(HttpBackend::new(base, Duration::from_secs(5)).expect("http backend"))
}

#[tokio::test]
async fn status_request_hits_user_path_and_decodes_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/status/creator_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_authenticated": true,
            "expires_in_seconds": 5400,
            "needs_refresh": false,
            "scopes": ["youtube.readonly", "yt-analytics.readonly"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let payload = backend.fetch_status("creator_42").await.expect("status");
    assert!(payload.is_authenticated);
    assert_eq!(payload.expires_in_seconds, Some(5400));
    assert_eq!(payload.scopes.map(|s| s.len()), Some(2));
}

#[tokio::test]
async fn chat_posts_content_and_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/chat"))
        .and(body_json(json!({ "content": "What's my CTR?", "user_id": "u1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": "Your CTR is 5.2%" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let reply = backend
        .chat(&ChatRequest {
            content: "What's my CTR?".into(),
            user_id: "u1".into(),
        })
        .await
        .expect("reply");
    assert_eq!(reply.response, "Your CTR is 5.2%");
}

#[tokio::test]
async fn quick_action_posts_action_user_and_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/quick-action"))
        .and(body_json(json!({
            "action": "generate_titles",
            "user_id": "u1",
            "context": "gaming"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": "1. Speedrun secrets" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let reply = backend
        .quick_action(&QuickActionRequest {
            action: "generate_titles".into(),
            user_id: "u1".into(),
            context: json!("gaming"),
        })
        .await
        .expect("reply");
    assert_eq!(reply.response, "1. Speedrun secrets");
}

#[tokio::test]
async fn non_success_status_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("agent crashed"))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let err = backend
        .chat(&ChatRequest {
            content: "hi".into(),
            user_id: "u1".into(),
        })
        .await
        .expect_err("500 must fail");
    assert!(matches!(err, ClientError::Status { status: 500, .. }), "{err:?}");
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/status/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let err = backend.fetch_status("u1").await.expect_err("decode failure");
    assert!(matches!(err, ClientError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn server_error_becomes_error_message_in_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/chat"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let orchestrator = ConversationOrchestrator::new(ConversationStore::new(), backend, "u1");
    let outcome = orchestrator.send_message("hello").await;
    let SendOutcome::Failed(message) = outcome else {
        panic!("expected a failed exchange");
    };
    assert!(message.is_error);
    assert!(message.content.contains("503"), "{}", message.content);
    assert!(orchestrator.conversation().thinking().is_none());
}

#[tokio::test]
async fn failed_poll_keeps_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/status/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_authenticated": true,
            "needs_refresh": true
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let store = AuthStatusStore::new(backend, "u1");
    store.check_status().await;
    let before = store.view();
    assert!(before.is_authenticated());
    assert!(before.needs_refresh);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/oauth/status/u1"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    store.check_status().await;
    let after = store.view();
    assert!(after.connection_error);
    assert!(after.is_authenticated());
    assert_eq!(after.status.map(|s| s.source), Some(StatusSource::Store));
}
