//! Scripted completion client for tests.

use crate::error::{OtrError, Result};
use crate::judge::{CompletionClient, CompletionRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    TransportFailure(String),
}

#[derive(Debug, Default)]
struct State {
    keyed: Vec<(String, String)>,
    delays: Vec<(String, Duration)>,
    queue: VecDeque<Reply>,
    fallback: Option<String>,
    requests: Vec<CompletionRequest>,
}

/// Mock completion client for tests.
///
/// A reply registered with [`reply_when`](Self::reply_when) for a substring of
/// the prompt wins; otherwise queued replies are served in order, then the
/// fixed reply, or a transport error if none is set. Every request is recorded
/// when it arrives, and [`delay_when`](Self::delay_when) holds back the answer.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionClient {
    state: Arc<Mutex<State>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client answering every call with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        let client = Self::new();
        client.lock().fallback = Some(reply.into());
        client
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock().queue.push_back(Reply::Text(reply.into()));
    }

    pub fn push_transport_failure(&self, message: impl Into<String>) {
        self.lock()
            .queue
            .push_back(Reply::TransportFailure(message.into()));
    }

    /// Answer `reply` to any prompt containing `needle`.
    pub fn reply_when(&self, needle: impl Into<String>, reply: impl Into<String>) {
        self.lock().keyed.push((needle.into(), reply.into()));
    }

    /// Wait `delay` before answering any prompt containing `needle`.
    pub fn delay_when(&self, needle: impl Into<String>, delay: Duration) {
        self.lock().delays.push((needle.into(), delay));
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_reply(&self, request: &CompletionRequest) -> (Result<String>, Option<Duration>) {
        let mut state = self.lock();
        state.requests.push(request.clone());
        let delay = state
            .delays
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, d)| *d);

        let keyed = state
            .keyed
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());
        let reply = match keyed {
            Some(text) => Ok(text),
            None => match state.queue.pop_front() {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::TransportFailure(message)) => Err(OtrError::Transport(message)),
                None => state
                    .fallback
                    .clone()
                    .ok_or_else(|| OtrError::Transport("no mock reply available".to_string())),
            },
        };
        (reply.map(|text| text.trim().to_string()), delay)
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let (reply, delay) = self.next_reply(request);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            model: "test-model".to_string(),
            prompt: prompt.to_string(),
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn queued_replies_then_fallback() {
        let client = MockCompletionClient::always(r#"{"relevance": 0}"#);
        client.push_reply("  first  ");
        assert_eq!(client.complete(&request("a")).await.unwrap(), "first");
        assert_eq!(
            client.complete(&request("b")).await.unwrap(),
            r#"{"relevance": 0}"#
        );
        let prompts: Vec<String> = client.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn keyed_reply_beats_queue() {
        let client = MockCompletionClient::new();
        client.push_reply("queued");
        client.reply_when("special", "keyed");
        assert_eq!(client.complete(&request("a special prompt")).await.unwrap(), "keyed");
        assert_eq!(client.complete(&request("plain")).await.unwrap(), "queued");
    }

    #[tokio::test]
    async fn empty_mock_fails_like_a_transport_error() {
        let client = MockCompletionClient::new();
        let err = client.complete(&request("a")).await.unwrap_err();
        assert!(matches!(err, OtrError::Transport(_)));
        assert_eq!(client.call_count(), 1);
    }
}
