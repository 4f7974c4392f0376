pub mod adapter;
pub mod client;
pub mod error;
pub mod types;

use std::future::Future;

pub use adapter::CallAdapter;
pub use client::ZaiClient;
pub use error::TransportError;
pub use types::{ChatRequest, ChatResponse};

/// One round trip to the chat-completions service.
///
/// Implementations perform exactly one call; retrying is the caller's job
/// (see [`CallAdapter`]).
pub trait ChatTransport: Send + Sync {
    fn post(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, TransportError>> + Send;
}

#[cfg(test)]
pub(crate) mod mock;
