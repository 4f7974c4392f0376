//! Tipos de erro de transporte para a API da Z.ai.
//!
//! Define [`TransportError`] com as classes de falha que a camada de
//! transporte distingue. Usa `thiserror` para derivar `Display` e `Error`.

use thiserror::Error;

/// Falhas de uma única chamada HTTP ao endpoint de chat completions.
///
/// - [`Timeout`](TransportError::Timeout): o tempo limite da requisição expirou
/// - [`Http`](TransportError::Http): o servidor respondeu com status fora de 2xx
/// - [`Connection`](TransportError::Connection): DNS, conexão recusada, TLS, etc.
/// - [`Decode`](TransportError::Decode): 2xx com corpo que não é JSON válido
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Se a camada de transporte deve tentar de novo.
    ///
    /// Um corpo indecifrável veio de uma ida e volta bem-sucedida; repetir a
    /// mesma chamada aqui não ajuda, então a falha sobe para a camada de
    /// processamento.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Decode(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}
