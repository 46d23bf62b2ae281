//! Integration tests for the cloud backend against a mock HTTP server.

mod common;

use std::time::Duration;

use common::{chat_body, fast_retries};
use gitai::config::Config;
use gitai::error::BackendError;
use gitai::llm::{Backend, BackendKind, RemoteBackend};
use gitai::prompt::Prompt;
use serial_test::serial;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1/chat/completions";

fn prompt() -> Prompt {
    Prompt {
        system: "You write precise, technical git commit messages.".to_string(),
        user: "FILES:\nsrc/lib.rs\n\nDIFF:\n+fn a() {}".to_string(),
    }
}

fn backend(server: &MockServer, max_attempts: u32) -> RemoteBackend {
    RemoteBackend::new(
        format!("{}{}", server.uri(), ENDPOINT),
        "gpt-5-mini",
        "sk-test",
        Duration::from_secs(5),
    )
    .with_retry_policy(fast_retries(max_attempts))
}

#[tokio::test]
async fn test_success_returns_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-5-mini",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("feat: add a\n\n- adds a")))
        .expect(1)
        .mount(&server)
        .await;

    let response = backend(&server, 3).send(&prompt()).await.unwrap();
    assert_eq!(response.text, "feat: add a\n\n- adds a");
    assert_eq!(response.backend, BackendKind::Remote);
    assert_eq!(response.model, "gpt-5-mini");

    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 1200);
    assert_eq!(usage.completion_tokens, 80);
    assert!(!usage.estimated);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(3)
        .mount(&server)
        .await;

    let result = backend(&server, 3).send(&prompt()).await;
    assert!(matches!(
        result,
        Err(BackendError::Http { status: 500, ref body }) if body == "upstream exploded"
    ));
}

#[tokio::test]
async fn test_persistent_rate_limit_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let result = backend(&server, 2).send(&prompt()).await;
    assert!(matches!(result, Err(BackendError::Http { status: 429, .. })));
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("fix: retry")))
        .expect(1)
        .mount(&server)
        .await;

    let response = backend(&server, 3).send(&prompt()).await.unwrap();
    assert_eq!(response.text, "fix: retry");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let result = backend(&server, 3).send(&prompt()).await;
    assert!(matches!(
        result,
        Err(BackendError::Http { status: 401, ref body }) if body == "invalid api key"
    ));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = backend(&server, 3).send(&prompt()).await;
    assert!(matches!(result, Err(BackendError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("late"))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let backend = RemoteBackend::new(
        format!("{}{}", server.uri(), ENDPOINT),
        "gpt-5-mini",
        "sk-test",
        Duration::from_millis(100),
    )
    .with_retry_policy(fast_retries(2));

    assert!(matches!(
        backend.send(&prompt()).await,
        Err(BackendError::Timeout { secs: 0 })
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_unavailable() {
    // Bind then drop a server so the port is closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let backend = RemoteBackend::new(
        format!("{}{}", uri, ENDPOINT),
        "gpt-5-mini",
        "sk-test",
        Duration::from_secs(2),
    )
    .with_retry_policy(fast_retries(3));

    assert!(matches!(
        backend.send(&prompt()).await,
        Err(BackendError::BackendUnavailable { attempts: 3, .. })
    ));
}

#[test]
#[serial]
fn test_missing_api_key_is_auth_error() {
    let config = Config {
        api_key_env_name: "GITAI_TEST_MISSING_KEY".to_string(),
        ..Config::default()
    };
    temp_env::with_var_unset("GITAI_TEST_MISSING_KEY", || {
        assert!(matches!(
            RemoteBackend::from_config(&config),
            Err(BackendError::AuthError { ref env_var }) if env_var == "GITAI_TEST_MISSING_KEY"
        ));
    });
}

#[test]
#[serial]
fn test_blank_api_key_is_auth_error() {
    let config = Config {
        api_key_env_name: "GITAI_TEST_BLANK_KEY".to_string(),
        ..Config::default()
    };
    temp_env::with_var("GITAI_TEST_BLANK_KEY", Some("   "), || {
        assert!(matches!(
            RemoteBackend::from_config(&config),
            Err(BackendError::AuthError { .. })
        ));
    });
}

#[test]
#[serial]
fn test_api_key_from_environment() {
    let config = Config {
        api_key_env_name: "GITAI_TEST_PRESENT_KEY".to_string(),
        ..Config::default()
    };
    temp_env::with_var("GITAI_TEST_PRESENT_KEY", Some("sk-live"), || {
        let backend = RemoteBackend::from_config(&config).unwrap();
        assert_eq!(backend.model(), config.api_model);
        assert_eq!(backend.kind(), BackendKind::Remote);
    });
}
