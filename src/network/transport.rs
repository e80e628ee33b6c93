//! Raw access to the semantic network's HTTP endpoints.
//!
//! Uses `ureq` for synchronous requests. No retry policy: a failed request is
//! reported once and the client degrades to "no data".

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Why a request produced no usable payload.
#[derive(Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("HTTP status {code}")]
    Status { code: u16 },

    #[error("network unreachable: {message}")]
    Unreachable { message: String },

    #[error("undecodable response: {message}")]
    Decode { message: String },
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Issues GET requests against the network's endpoints.
///
/// `path` is relative to the service root (`/v0/...`); `params` are query
/// parameters, repeated keys allowed.
pub trait Transport {
    fn get(&self, path: &str, params: &[(&'static str, String)]) -> TransportResult<Value>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: builder.build(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, params: &[(&'static str, String)]) -> TransportResult<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.agent.get(&url);
        for (name, value) in params {
            request = request.query(name, value);
        }
        tracing::debug!(%url, ?params, "GET");

        match request.call() {
            Ok(response) => response.into_json::<Value>().map_err(|e| TransportError::Decode {
                message: e.to_string(),
            }),
            Err(ureq::Error::Status(code, _)) => Err(TransportError::Status { code }),
            Err(ureq::Error::Transport(transport)) => Err(TransportError::Unreachable {
                message: transport.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}
