//! Scripted transport used by unit tests across the crate.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use super::ChatTransport;
use super::error::TransportError;
use super::types::{ChatRequest, ChatResponse, Choice, ChoiceMessage, Usage};

type Responder =
    Box<dyn Fn(&ChatRequest, u32) -> Result<ChatResponse, TransportError> + Send + Sync>;

pub struct MockTransport {
    responder: Responder,
    calls: AtomicU32,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    latency: Duration,
}

impl MockTransport {
    /// `responder` receives the request and the 1-based call number.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest, u32) -> Result<ChatResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub fn always(result: Result<ChatResponse, TransportError>) -> Self {
        Self::new(move |_, _| result.clone())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ChatTransport for MockTransport {
    async fn post(&self, req: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.responder)(req, call)
    }
}

/// A 2xx response whose first choice carries `content`.
pub fn review_response(content: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![Choice {
            message: Some(ChoiceMessage {
                content: Some(content.to_string()),
            }),
        }],
        usage: Usage {
            prompt_tokens: 100,
            completion_tokens: 40,
            total_tokens: 140,
            ..Usage::default()
        },
    }
}
