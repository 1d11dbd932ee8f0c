//! `OpenAICompletionClient` against a mock chat completions endpoint.

use serde_json::{Value, json};
use sow_chat::{ChatError, CompletionClient, CompletionRequest, OpenAICompletionClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAICompletionClient {
    OpenAICompletionClient::new("test-key")
        .with_base_url(format!("{}/v1/", server.uri()))
        .with_model("gpt-4-turbo")
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system: "You are an expert SOW writer and supply chain advisor.".into(),
        prompt: "Draft a SOW for warehouse racking".into(),
        max_tokens: 2000,
        temperature: 0.2,
    }
}

fn service_error(err: ChatError) -> String {
    match err {
        ChatError::CompletionService { provider, message } => {
            assert_eq!(provider, "OpenAI");
            message
        }
        other => panic!("expected a completion service error, got {other:?}"),
    }
}

#[tokio::test]
async fn reply_is_the_trimmed_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "\n1. Scope\n2. Fees  \n" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server).complete(&request()).await.unwrap();
    assert_eq!(reply, "1. Scope\n2. Fees");

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["model"], "gpt-4-turbo");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "Draft a SOW for warehouse racking");
    assert_eq!(body["max_tokens"], 2000);
}

#[tokio::test]
async fn rate_limit_is_reported_as_such() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
        )
        .mount(&server)
        .await;

    let message = service_error(client(&server).complete(&request()).await.unwrap_err());
    assert!(message.starts_with("rate limited"), "{message}");
    assert!(message.contains("Rate limit reached"), "{message}");
}

#[tokio::test]
async fn server_error_keeps_the_raw_body_when_it_is_not_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("gateway down"))
        .mount(&server)
        .await;

    let message = service_error(client(&server).complete(&request()).await.unwrap_err());
    assert!(message.contains("503"), "{message}");
    assert!(message.contains("gateway down"), "{message}");
}

#[tokio::test]
async fn empty_choices_and_bad_json_are_service_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ truncated"))
        .mount(&server)
        .await;

    let client = client(&server);
    let message = service_error(client.complete(&request()).await.unwrap_err());
    assert!(message.contains("no choices"), "{message}");
    let message = service_error(client.complete(&request()).await.unwrap_err());
    assert!(message.contains("failed to parse response"), "{message}");
}

#[tokio::test]
async fn missing_key_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenAICompletionClient::new("").with_base_url(server.uri());
    assert!(matches!(client.complete(&request()).await, Err(ChatError::Config(_))));
}
