//! Executes `HttpRequest` values over the network.
//!
//! `Transport` is the seam between the sans-IO client and a real HTTP stack.
//! Implementations block; `Session` runs them on a blocking worker so the
//! completion context is never tied up by I/O.

use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round-trip.
///
/// Any status code is a successful exchange. `Err` means no response was
/// received at all.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Largest response body `UreqTransport` reads by default. Unpaged lists of
/// big sheets go well past ureq's own 10 MB default.
pub const DEFAULT_BODY_LIMIT: u64 = 64 * 1024 * 1024;

/// `Transport` backed by a shared `ureq` agent.
///
/// Status codes are returned as data rather than errors so the interpreter
/// sees every response. A body that cannot be read in full (connection
/// closed early, size over the limit) fails the exchange. Timeouts are
/// ureq's defaults.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Cap on the number of response body bytes read per exchange.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = request.method.as_str(), url = %request.url, "executing request");

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(&request.url), request).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&request.url), request).call(),
            HttpMethod::Post => send(with_headers(self.agent.post(&request.url), request), request),
            HttpMethod::Patch => send(with_headers(self.agent.patch(&request.url), request), request),
        };
        let mut response = result.map_err(TransportError::exchange)?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(TransportError::exchange)?;

        Ok(HttpResponse { status, body })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match request.body.as_bytes() {
        Some(bytes) => builder.send(bytes),
        None => builder.send_empty(),
    }
}
