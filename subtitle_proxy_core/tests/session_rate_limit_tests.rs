//! Tests for session handling and call spacing against the mock endpoint

mod common;

use common::{TEST_INTERVAL, session_config};
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtitle_proxy_core::protocol::{ProtocolError, Value};
use subtitle_proxy_core::{SessionClient, SessionConfig, SessionState};
use subtitle_proxy_test_utils::fixtures;
use subtitle_proxy_test_utils::{LoginBehavior, MockTransport};

fn client(transport: &MockTransport) -> Arc<SessionClient> {
    Arc::new(SessionClient::new(
        session_config(),
        Arc::new(transport.clone()),
    ))
}

fn search_args() -> Vec<Value> {
    vec![Value::Array(vec![Value::structure([(
        "imdbid",
        Value::from("120338"),
    )])])]
}

#[tokio::test]
async fn test_calls_are_spaced_by_min_interval() {
    let transport = MockTransport::new();
    let client = client(&transport);

    for _ in 0..3 {
        client.call("SearchSubtitles", search_args()).await.unwrap();
    }

    // LogIn + three searches
    assert_eq!(transport.calls().len(), 4);
    let gap = transport.min_gap().unwrap();
    assert!(gap >= TEST_INTERVAL, "calls only {gap:?} apart");
}

#[tokio::test]
async fn test_concurrent_callers_share_the_rate_gate() {
    let transport = MockTransport::new();
    let client = client(&transport);
    client.ensure_session().await.unwrap();

    let started = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.call("SearchSubtitles", search_args()).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(transport.call_count("LogIn"), 1);
    assert_eq!(transport.call_count("SearchSubtitles"), 4);
    assert!(transport.min_gap().unwrap() >= TEST_INTERVAL);
    assert!(started.elapsed() >= TEST_INTERVAL * 3);
}

#[tokio::test]
async fn test_concurrent_first_calls_log_in_once() {
    let transport = MockTransport::new().with_delay(Duration::from_millis(20));
    let client = client(&transport);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.ensure_session().await })
        })
        .collect();

    let mut tokens = Vec::new();
    for handle in handles {
        tokens.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(transport.call_count("LogIn"), 1);
    assert!(tokens.iter().all(|token| token == &tokens[0]));
}

#[tokio::test]
async fn test_revoked_session_is_renewed_once() {
    let transport = MockTransport::new();
    let client = client(&transport);

    client.call("SearchSubtitles", search_args()).await.unwrap();
    transport.revoke_sessions();
    client.call("SearchSubtitles", search_args()).await.unwrap();

    assert_eq!(
        transport.methods(),
        vec![
            "LogIn",
            "SearchSubtitles",
            "SearchSubtitles",
            "LogIn",
            "SearchSubtitles"
        ]
    );

    let searches = transport.calls_to("SearchSubtitles");
    assert_eq!(searches[1].token(), Some("mock-token-1"));
    assert_eq!(searches[2].token(), Some("mock-token-2"));
}

#[tokio::test]
async fn test_persistent_rejection_is_not_retried_forever() {
    let transport = MockTransport::new();
    transport.push_reply("SearchSubtitles", Ok(fixtures::status("406 No session")));
    transport.push_reply("SearchSubtitles", Ok(fixtures::status("406 No session")));
    let client = client(&transport);

    let err = client.call("SearchSubtitles", search_args()).await.unwrap_err();
    assert!(err.requires_reauth());
    assert_eq!(transport.call_count("LogIn"), 2);
    assert_eq!(transport.call_count("SearchSubtitles"), 2);
}

#[tokio::test]
async fn test_rejected_login() {
    let transport = MockTransport::new();
    transport.set_login_behavior(LoginBehavior::Reject("401 Unauthorized".to_string()));
    let client = client(&transport);

    let err = client.call("SearchSubtitles", search_args()).await.unwrap_err();
    assert!(matches!(err, ProtocolError::AuthenticationFailed { .. }));
    assert_eq!(transport.call_count("SearchSubtitles"), 0);
    assert_eq!(client.state().await, SessionState::LoggedOut);
}

#[tokio::test]
async fn test_unreachable_login_is_authentication_failure() {
    let transport = MockTransport::new();
    transport.set_login_behavior(LoginBehavior::Unreachable("connection refused".to_string()));
    let client = client(&transport);

    let err = client.ensure_session().await.unwrap_err();
    assert!(matches!(err, ProtocolError::AuthenticationFailed { .. }));

    // A later attempt logs in again once the endpoint recovers
    transport.set_login_behavior(LoginBehavior::Accept);
    assert_eq!(client.ensure_session().await.unwrap(), "mock-token-1");
}

#[tokio::test]
async fn test_expired_token_triggers_fresh_login() {
    let transport = MockTransport::new();
    let client = Arc::new(SessionClient::new(
        SessionConfig {
            session_ttl: Duration::from_millis(150),
            ..session_config()
        },
        Arc::new(transport.clone()),
    ));

    assert_eq!(client.ensure_session().await.unwrap(), "mock-token-1");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.ensure_session().await.unwrap(), "mock-token-2");
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let transport = MockTransport::new().with_delay(Duration::from_millis(500));
    let client = SessionClient::new(
        SessionConfig {
            request_timeout: Duration::from_millis(100),
            ..session_config()
        },
        Arc::new(transport.clone()),
    );

    let err = client.server_info().await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout(_)));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let transport = MockTransport::new();
    let client = client(&transport);

    client.ensure_session().await.unwrap();
    assert!(client.is_authenticated().await);

    client.logout().await;
    assert_eq!(client.state().await, SessionState::LoggedOut);
    assert_eq!(transport.calls_to("LogOut")[0].token(), Some("mock-token-1"));

    let info = client.session_info().await;
    assert!(!info.authenticated);
    assert_eq!(info.state, "logged_out");
}

#[tokio::test]
async fn test_credentials_are_sent_with_login() {
    let transport = MockTransport::new();
    let client = client(&transport);
    client.ensure_session().await.unwrap();

    let login = &transport.calls_to("LogIn")[0];
    let params: Vec<_> = login.params.iter().filter_map(Value::as_str).collect();
    assert_eq!(params, vec!["tester", "secret", "en", "SubtitleAPI v1.0"]);
}
