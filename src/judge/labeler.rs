//! Batch relevance labeling over a [`CompletionClient`].

use crate::error::Result;
use crate::eval::{RelevanceFlag, RelevanceItem};
use crate::judge::parse::{parse_relevance, parse_relevance_lenient, ParseError};
use crate::judge::{CompletionClient, CompletionRequest, PromptTemplate};
use futures_util::stream::{self, StreamExt, TryStreamExt};

/// Labels items by asking a completion model for a `{"relevance": 0|1}` verdict.
///
/// One request per item. A reply that cannot be parsed yields
/// [`RelevanceFlag::FALLBACK`] and the batch continues; a failed request
/// (network, auth, API status) aborts the batch and no partial output is
/// returned.
pub struct RelevanceLabeler<C> {
    client: C,
    model: String,
    template: PromptTemplate,
    temperature: f32,
    concurrency: usize,
    lenient_json: bool,
}

impl<C: CompletionClient> RelevanceLabeler<C> {
    /// Labeler with temperature 0, sequential requests, strict JSON parsing.
    pub fn new(client: C, model: impl Into<String>, template: PromptTemplate) -> Self {
        Self {
            client,
            model: model.into(),
            template,
            temperature: 0.0,
            concurrency: 1,
            lenient_json: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Allow up to `n` requests in flight. Output order still follows input order.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_lenient_json(mut self, lenient: bool) -> Self {
        self.lenient_json = lenient;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Render the prompt and fetch the model's reply for one item.
    async fn ask(&self, item: &RelevanceItem) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: self.template.render(item.query(), item.document()),
            temperature: self.temperature,
        };
        log::debug!(
            "qid {}: requesting judgment ({} prompt bytes)",
            item.trace_id(),
            request.prompt.len()
        );
        self.client.complete(&request).await
    }

    /// Interpret a reply. `Err` here is a recoverable parse failure.
    pub fn parse_reply(&self, reply: &str) -> std::result::Result<RelevanceFlag, ParseError> {
        if self.lenient_json {
            parse_relevance_lenient(reply)
        } else {
            parse_relevance(reply)
        }
    }

    /// Judge one item. Transport errors propagate; parse errors become
    /// [`RelevanceFlag::FALLBACK`].
    pub async fn judge(&self, item: &RelevanceItem) -> Result<RelevanceFlag> {
        let reply = self.ask(item).await?;
        let flag = self.parse_reply(&reply).unwrap_or_else(|e| {
            log::warn!(
                "qid {}: unusable judgment ({}), labeling as not relevant",
                item.trace_id(),
                e
            );
            RelevanceFlag::FALLBACK
        });
        Ok(flag)
    }

    /// Label every item, returning new items in input order with `relevance` set.
    pub async fn label_items(&self, items: &[RelevanceItem]) -> Result<Vec<RelevanceItem>> {
        log::info!(
            "Labeling {} items with model {} (concurrency {})",
            items.len(),
            self.model,
            self.concurrency
        );

        let labeled = if self.concurrency <= 1 {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let flag = self.judge(item).await?;
                out.push(item.with_relevance(flag));
            }
            out
        } else {
            stream::iter(items)
                .map(|item| async move {
                    let flag = self.judge(item).await?;
                    Ok::<_, crate::error::OtrError>(item.with_relevance(flag))
                })
                .buffered(self.concurrency)
                .try_collect::<Vec<_>>()
                .await?
        };

        let relevant = labeled
            .iter()
            .filter(|i| i.relevance().map(RelevanceFlag::is_relevant).unwrap_or(false))
            .count();
        log::info!("Labeled {} items ({} relevant)", labeled.len(), relevant);
        Ok(labeled)
    }
}
