//! Provider wrapper that retries throttled calls with bounded backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use coordination::RetryPolicy;
use tracing::{debug, warn};

use super::{CompletionError, CompletionProvider, CompletionRequest, FragmentStream};

/// What a call produced, shaped by `CompletionRequest::stream`.
pub enum Completion {
    Text(String),
    Stream(FragmentStream),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// The single entry point executors use to reach a model.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send `request`, streaming or not according to its `stream` flag.
    pub async fn send(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        if request.stream {
            self.stream(request).await.map(Completion::Stream)
        } else {
            self.complete(request).await.map(Completion::Text)
        }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.with_retry("complete", || self.provider.complete(request))
            .await
    }

    /// Open a fragment stream. Only opening is retried; an error in the
    /// middle of a stream is returned to the caller as-is.
    pub async fn stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<FragmentStream, CompletionError> {
        self.with_retry("stream", || self.provider.stream(request))
            .await
    }

    fn delay_for(&self, retry: u32, error: &CompletionError) -> Duration {
        let backoff = self.policy.backoff_duration(retry);
        let delay = match error.retry_after() {
            Some(hint) if hint > backoff => hint,
            _ => backoff,
        };
        delay.min(Duration::from_millis(self.policy.max_backoff_ms))
    }

    async fn with_retry<T, F, Fut>(
        &self,
        call: &'static str,
        mut attempt: F,
    ) -> Result<T, CompletionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CompletionError>>,
    {
        let mut retries = 0u32;
        loop {
            match attempt().await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(call, retries, "Provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_rate_limited() && self.policy.should_retry(retries) => {
                    let backoff = self.delay_for(retries, &e);
                    warn!(
                        call,
                        provider = self.provider.name(),
                        attempt = retries + 1,
                        max_retries = self.policy.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Rate limited, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
