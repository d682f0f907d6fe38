//! GraphQL transport: one query string in, one status code and body out.
//!
//! Uses async reqwest internally on a shared tokio runtime, but presents a
//! blocking interface; the crawler never has more than one query in flight.

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout (search pages are small; a stalled request is a failure)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const USER_AGENT: &str = concat!("hubcrawl/", env!("CARGO_PKG_VERSION"));

/// Raw transport outcome. Status interpretation is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Failure before any status line was received
#[derive(Debug)]
pub enum TransportError {
    /// Connect, TLS, timeout or body read failure
    Network(String),
    /// Request could not be built
    Encode(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::Encode(message) => write!(f, "cannot encode request: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Build from a reqwest error without leaking the endpoint URL
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Network(e.without_url().to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Anything that can carry a GraphQL query to the API
pub trait Transport {
    fn send(&self, query: &str) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, query: &str) -> Result<Response, TransportError> {
        (**self).send(query)
    }
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// POSTs `{"query": ...}` to a GraphQL endpoint with a bearer token
pub struct GraphqlHttp {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for GraphqlHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlHttp")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GraphqlHttp {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(TransportError::from_reqwest)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

impl Transport for GraphqlHttp {
    fn send(&self, query: &str) -> Result<Response, TransportError> {
        let payload = serde_json::to_vec(&serde_json::json!({ "query": query }))
            .map_err(|e| TransportError::Encode(e.to_string()))?;

        SHARED_RUNTIME.handle().block_on(async {
            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload)
                .send()
                .await
                .map_err(TransportError::from_reqwest)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(TransportError::from_reqwest)?;
            Ok::<_, TransportError>(Response { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_200_only() {
        assert!(Response::new(200, "{}").is_success());
        assert!(!Response::new(201, "{}").is_success());
        assert!(!Response::new(502, "").is_success());
    }

    #[test]
    fn network_retryable_encode_not() {
        assert!(TransportError::Network("reset".into()).is_retryable());
        assert!(!TransportError::Encode("bad".into()).is_retryable());
    }

    #[test]
    fn display_network_error() {
        let err = TransportError::Network("connection refused".into());
        assert_eq!(format!("{err}"), "network error: connection refused");
    }

    #[test]
    fn graphql_http_debug_hides_token() {
        let http = GraphqlHttp::new("https://example.invalid/graphql", "secret-token").unwrap();
        let dbg = format!("{http:?}");
        assert!(dbg.contains("example.invalid"));
        assert!(!dbg.contains("secret-token"));
    }
}
