//! OpenAI-compatible `/chat/completions` provider over reqwest.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use super::sse::{parse_chunk, SseParser, StreamAction};
use super::{CompletionError, CompletionProvider, CompletionRequest, FragmentStream};
use crate::config::EndpointConfig;

pub struct OpenAiProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn from_config(endpoint: &EndpointConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            api_key: endpoint.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": request.stream,
        })
    }

    async fn post(&self, request: &CompletionRequest) -> Result<reqwest::Response, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            url = %url,
            model = %self.model,
            stream = request.stream,
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let mut builder = self.http.post(&url).json(&self.body(request));
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::RateLimited {
                retry_after,
                message,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Text of `choices[0].message.content` in a non-streamed reply.
pub fn message_content(body: &Value) -> Result<String, CompletionError> {
    if let Some(error) = body.get("error") {
        return Err(CompletionError::Decode(error.to_string()));
    }
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or(CompletionError::EmptyResponse)
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let response = self.post(request).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;
        message_content(&body)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, CompletionError> {
        let response = self.post(request).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();
        Ok(fragments(bytes))
    }
}

struct StreamState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    parser: SseParser,
    pending: VecDeque<Result<String, CompletionError>>,
    finished: bool,
}

impl StreamState {
    /// Queue the actions of decoded payloads; stops at `[DONE]` or an error.
    fn absorb(&mut self, payloads: Vec<String>) {
        for payload in payloads {
            match parse_chunk(&payload) {
                StreamAction::TextDelta(text) => self.pending.push_back(Ok(text)),
                StreamAction::Done => {
                    self.finished = true;
                    return;
                }
                StreamAction::Error(message) => {
                    self.pending.push_back(Err(CompletionError::Stream(message)));
                    self.finished = true;
                    return;
                }
                StreamAction::Ignore => {}
            }
        }
    }
}

fn fragments(bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> FragmentStream {
    let state = StreamState {
        bytes,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.parser.feed(&chunk);
                    state.absorb(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(CompletionError::Stream(e.to_string())), state));
                }
                None => {
                    let payloads = state.parser.flush();
                    state.absorb(payloads);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
