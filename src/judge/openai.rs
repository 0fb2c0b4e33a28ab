use crate::error::{OtrError, Result};
use crate::judge::{CompletionClient, CompletionRequest};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Request structure for the chat completions API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    n: u8,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response structure from the chat completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client
///
/// The API key is supplied by the caller; nothing is read from the
/// environment here. One HTTP request per `complete` call, no retries.
pub struct OpenAIChatClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAIChatClient {
    /// Create a new chat client
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token for the API
    /// * `base_url` - API root, e.g. "https://api.openai.com/v1"
    /// * `timeout` - Per-request timeout; expiry is reported as a transport error
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OtrError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAIChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let start = std::time::Instant::now();
        let body = ChatRequest {
            model: &request.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            n: 1,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| OtrError::Transport(format!("Network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(OtrError::Auth(format!("{}: {}", status, body)));
            }
            return Err(OtrError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| OtrError::Completion(format!("Failed to parse response: {}", e)))?;

        log::debug!("Completion API call took {:?}", start.elapsed());

        let content = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OtrError::Completion("response has no choices".to_string()))?
            .message
            .content
            .ok_or_else(|| OtrError::Completion("first choice has no content".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    /// Serve `reply` with `status` on /chat/completions; returns the base URL.
    async fn spawn_stub(status: u16, reply: Value, captured: Captured) -> String {
        spawn_slow_stub(status, reply, captured, Duration::ZERO).await
    }

    /// Like `spawn_stub`, but waits `delay` before answering.
    async fn spawn_slow_stub(
        status: u16,
        reply: Value,
        captured: Captured,
        delay: Duration,
    ) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let reply = reply.clone();
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    captured.lock().unwrap().push((auth, body));
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    (
                        axum::http::StatusCode::from_u16(status).unwrap(),
                        Json(reply),
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4".to_string(),
            prompt: "Is it relevant?".to_string(),
            temperature: 0.0,
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = OpenAIChatClient::new(
            "test-key".to_string(),
            "https://api.openai.com/v1/",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_sends_single_user_message_and_returns_trimmed_content() {
        let captured: Captured = Arc::default();
        let base = spawn_stub(
            200,
            json!({"choices": [{"message": {
                "role": "assistant",
                "content": "  {\"relevance\": 1}\n"
            }}]}),
            captured.clone(),
        )
        .await;
        let client =
            OpenAIChatClient::new("sk-test".to_string(), &base, Duration::from_secs(5)).unwrap();

        let text = client.complete(&request()).await.unwrap();
        assert_eq!(text, r#"{"relevance": 1}"#);

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (auth, body) = &calls[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["n"], 1);
        assert_eq!(body["temperature"].as_f64(), Some(0.0));
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Is it relevant?");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let base = spawn_stub(401, json!({"error": {"message": "bad key"}}), Arc::default()).await;
        let client =
            OpenAIChatClient::new("wrong".to_string(), &base, Duration::from_secs(5)).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, OtrError::Auth(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_auth_error() {
        let reply = json!({"error": {"message": "no access"}});
        let base = spawn_stub(403, reply, Arc::default()).await;
        let client =
            OpenAIChatClient::new("sk".to_string(), &base, Duration::from_secs(5)).unwrap();
        match client.complete(&request()).await.unwrap_err() {
            OtrError::Auth(message) => assert!(message.contains("no access")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let captured: Captured = Arc::default();
        let base = spawn_slow_stub(
            200,
            json!({"choices": [{"message": {"content": "{\"relevance\": 1}"}}]}),
            captured.clone(),
            Duration::from_secs(5),
        )
        .await;
        let client =
            OpenAIChatClient::new("sk".to_string(), &base, Duration::from_millis(200)).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, OtrError::Transport(_)), "got {:?}", err);
        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_error() {
        let base = spawn_stub(503, json!({"error": "overloaded"}), Arc::default()).await;
        let client =
            OpenAIChatClient::new("sk".to_string(), &base, Duration::from_secs(5)).unwrap();
        match client.complete(&request()).await.unwrap_err() {
            OtrError::Api { status, body } => {
                assert_eq!(status, 503);
                assert!(body.contains("overloaded"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_completion_error() {
        let base = spawn_stub(200, json!({"choices": []}), Arc::default()).await;
        let client =
            OpenAIChatClient::new("sk".to_string(), &base, Duration::from_secs(5)).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, OtrError::Completion(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = OpenAIChatClient::new(
            "sk".to_string(),
            &format!("http://{}", addr),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, OtrError::Transport(_)));
    }
}
