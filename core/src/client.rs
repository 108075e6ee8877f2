//! Sans-IO request builder and response parser for the Fieldbook API.
//!
//! # Design
//! `FieldbookClient` holds a `RequestBuilder` (base URL and credentials) and
//! no other state. Each CRUD operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes the
//! exchange outcome. The caller executes the round-trip in between, so the
//! client stays deterministic and free of I/O.

use serde::Serialize;

use crate::error::{SdkError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::request::{list_parameters, projection_parameters, RequestBuilder};
use crate::response::{interpret, Expect, Payload};
use crate::types::{Credentials, ListRequest, ListResult, Projection, Record, RecordId};

/// Outcome of executing an `HttpRequest`.
pub type Exchange = Result<HttpResponse, TransportError>;

/// Stateless client for the Fieldbook API.
#[derive(Debug, Clone, Default)]
pub struct FieldbookClient {
    builder: RequestBuilder,
}

impl FieldbookClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            builder: RequestBuilder::new(base_url),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.builder = self.builder.with_credentials(credentials);
        self
    }

    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        self.builder.set_credentials(credentials);
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn build_list(&self, request: &ListRequest) -> Result<HttpRequest, SdkError> {
        let parameters = list_parameters(request)?;
        self.builder.build(&request.query, &parameters, HttpMethod::Get)
    }

    pub fn build_get(
        &self,
        query: &str,
        id: RecordId,
        projection: &Projection,
    ) -> Result<HttpRequest, SdkError> {
        self.builder.build(
            &record_path(query, id),
            &projection_parameters(projection),
            HttpMethod::Get,
        )
    }

    /// `fields` must not carry an `id`; the server assigns it.
    pub fn build_create<F>(&self, query: &str, fields: &F) -> Result<HttpRequest, SdkError>
    where
        F: Serialize + ?Sized,
    {
        self.builder.build_with_body(query, HttpMethod::Post, fields)
    }

    /// Only the fields present are changed on the server.
    pub fn build_update<F>(
        &self,
        query: &str,
        id: RecordId,
        fields: &F,
    ) -> Result<HttpRequest, SdkError>
    where
        F: Serialize + ?Sized,
    {
        self.builder
            .build_with_body(&record_path(query, id), HttpMethod::Patch, fields)
    }

    pub fn build_delete(&self, query: &str, id: RecordId) -> Result<HttpRequest, SdkError> {
        self.builder.build(&record_path(query, id), &[], HttpMethod::Delete)
    }

    /// Parse a list response. `request` must be the one the exchange was
    /// built from; its paging window decides how `has_more` is computed.
    pub fn parse_list(&self, request: &ListRequest, exchange: Exchange) -> Result<ListResult, SdkError> {
        parse_list(request, exchange)
    }

    pub fn parse_get(&self, exchange: Exchange) -> Result<Record, SdkError> {
        parse_record(exchange)
    }

    pub fn parse_create(&self, exchange: Exchange) -> Result<Record, SdkError> {
        parse_record(exchange)
    }

    pub fn parse_update(&self, exchange: Exchange) -> Result<Record, SdkError> {
        parse_record(exchange)
    }

    pub fn parse_delete(&self, exchange: Exchange) -> Result<(), SdkError> {
        parse_nothing(exchange)
    }
}

fn record_path(query: &str, id: RecordId) -> String {
    format!("{}/{id}", query.trim_end_matches('/'))
}

pub(crate) fn parse_list(request: &ListRequest, exchange: Exchange) -> Result<ListResult, SdkError> {
    let offset = request.is_paged().then_some(request.offset);
    match interpret(exchange, Expect::List { offset })? {
        Payload::Records(result) => Ok(result),
        _ => Err(SdkError::UnexpectedResponseShape),
    }
}

pub(crate) fn parse_record(exchange: Exchange) -> Result<Record, SdkError> {
    match interpret(exchange, Expect::Single)? {
        Payload::Record(record) => Ok(record),
        _ => Err(SdkError::UnexpectedResponseShape),
    }
}

pub(crate) fn parse_nothing(exchange: Exchange) -> Result<(), SdkError> {
    interpret(exchange, Expect::Nothing).map(|_| ())
}
