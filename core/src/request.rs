//! Turns logical queries into fully-formed `HttpRequest` values.
//!
//! # Design
//! The URL is `base_url/path` followed by already-encoded parameters joined
//! with `&` behind a single `?`. Filters are percent-encoded whole (key,
//! `=` and value together) so a filter string survives any reserved
//! characters it contains; one malformed filter fails the whole request.
//!
//! Body encoding failures do not fail the request. They are logged and the
//! request carries `RequestBody::Dropped`, which goes out as an empty body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::SdkError;
use crate::http::{HttpMethod, HttpRequest, RequestBody};
use crate::types::{Credentials, ListRequest, Projection};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.fieldbook.com/v1";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Everything outside the RFC 3986 unreserved set is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Builds requests against one API root, optionally authenticated.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    credentials: Option<Credentials>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl RequestBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        self.credentials = credentials;
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a body-less request for `path` with pre-encoded `parameters`.
    pub fn build(
        &self,
        path: &str,
        parameters: &[String],
        method: HttpMethod,
    ) -> Result<HttpRequest, SdkError> {
        self.compose(path, parameters, method, RequestBody::Empty)
    }

    /// Build a request carrying `body` encoded as JSON.
    pub fn build_with_body<B>(
        &self,
        path: &str,
        method: HttpMethod,
        body: &B,
    ) -> Result<HttpRequest, SdkError>
    where
        B: Serialize + ?Sized,
    {
        self.compose(path, &[], method, encode_body(body))
    }

    fn compose(
        &self,
        path: &str,
        parameters: &[String],
        method: HttpMethod,
        body: RequestBody,
    ) -> Result<HttpRequest, SdkError> {
        let url = self.url_for(path, parameters)?;

        let mut headers = Vec::with_capacity(3);
        if !matches!(body, RequestBody::Empty) {
            headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        headers.push(("accept".to_string(), JSON_CONTENT_TYPE.to_string()));
        if let Some(credentials) = &self.credentials {
            headers.push(("authorization".to_string(), basic_auth(credentials)));
        }

        debug!(method = method.as_str(), %url, "built request");
        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn url_for(&self, path: &str, parameters: &[String]) -> Result<String, SdkError> {
        if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(SdkError::MalformedQuery(format!(
                "{path:?} contains spaces or control characters"
            )));
        }

        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        for (i, parameter) in parameters.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(parameter);
        }

        Url::parse(&url).map_err(|e| SdkError::MalformedQuery(format!("{url}: {e}")))?;
        Ok(url)
    }
}

/// Encoded query parameters for a list call: paging window, filters, then
/// projection.
pub fn list_parameters(request: &ListRequest) -> Result<Vec<String>, SdkError> {
    let mut parameters = Vec::new();
    if request.is_paged() {
        parameters.push(format!("limit={}", request.limit));
        parameters.push(format!("offset={}", request.offset));
    }
    for filter in &request.filters {
        parameters.push(encode_filter(filter)?);
    }
    parameters.extend(projection_parameters(&request.projection));
    Ok(parameters)
}

/// `include=` and `exclude=` parameters, in that order.
pub fn projection_parameters(projection: &Projection) -> Vec<String> {
    let mut parameters = Vec::new();
    if let Some(include) = &projection.include {
        parameters.push(format!("include={}", encode_csv(include)));
    }
    if let Some(exclude) = &projection.exclude {
        parameters.push(format!("exclude={}", encode_csv(exclude)));
    }
    parameters
}

/// Percent-encode a `key=value` filter as a single unit.
pub fn encode_filter(filter: &str) -> Result<String, SdkError> {
    match filter.split_once('=') {
        Some((key, _)) if !key.is_empty() => Ok(utf8_percent_encode(filter, COMPONENT).to_string()),
        _ => Err(SdkError::MalformedQuery(format!(
            "filter {filter:?} is not of the form key=value"
        ))),
    }
}

fn encode_csv(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| utf8_percent_encode(field, COMPONENT).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_body<B>(body: &B) -> RequestBody
where
    B: Serialize + ?Sized,
{
    match serde_json::to_string(body) {
        Ok(json) => RequestBody::Json(json),
        Err(e) => {
            warn!(error = %e, "failed to encode request body, sending it empty");
            RequestBody::Dropped {
                reason: e.to_string(),
            }
        }
    }
}

fn basic_auth(credentials: &Credentials) -> String {
    let pair = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", STANDARD.encode(pair))
}
