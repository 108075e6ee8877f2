//! HTTP exchange types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The builder produces `HttpRequest`
//! values and the interpreter consumes `HttpResponse` values; whoever holds a
//! `Transport` performs the actual round-trip in between.
//!
//! Response bodies are raw bytes: deciding whether they decode is the
//! interpreter's job, not the transport's.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Body attached to an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// No body was supplied.
    Empty,

    /// JSON-encoded payload.
    Json(String),

    /// A body was supplied but could not be encoded. The request still goes
    /// out, with an empty body on the wire.
    Dropped { reason: String },
}

impl RequestBody {
    /// Bytes to put on the wire, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RequestBody::Json(body) => Some(body.as_bytes()),
            RequestBody::Empty | RequestBody::Dropped { .. } => None,
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RequestBuilder`. The caller (or a `Transport`) executes it and
/// hands back the corresponding `HttpResponse`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data. Only the status and body
/// matter to the interpreter.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
