//! Boundary with the HTTP collaborator that performs network requests.
//!
//! The engine never talks to the network itself. It hands an [`HttpRequest`]
//! to a [`Transport`] and caches what comes back.

use std::sync::Arc;

use bytes::Bytes;

/// Errors raised by a transport. Cancellation and timeouts belong here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Request timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    Timeout(String),

    /// Connection could not be established (DNS, refused, TLS).
    #[error("CONNECT_FAILED: {0}")]
    Connect(String),

    /// The request could not be built (bad method, bad header).
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// Any other network failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),
}

/// An outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response returned by the transport.
///
/// `headers` is a multimap: a name may repeat, as `Set-Cookie` usually does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    /// All values for a header name, compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Performs a single blocking HTTP exchange.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}
