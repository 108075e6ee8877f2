//! Classifies a completed exchange into a typed payload or an `SdkError`.
//!
//! # Design
//! The body is decoded once, up front, and decode failures are not errors in
//! themselves: a 2xx without a usable payload becomes
//! `UnexpectedResponseShape`, a non-2xx without one still becomes `ApiError`
//! with a placeholder message.
//!
//! List endpoints answer in one of two shapes. Paged requests get
//! `{"items": [...], "count": n}`, unbounded ones get a bare array.

use serde_json::Value;
use tracing::debug;

use crate::error::{SdkError, TransportError, NO_DETAILS};
use crate::http::HttpResponse;
use crate::types::{ListResult, Record};

/// Payload shape an operation expects on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// A record list. `offset` is the requested offset for paged requests,
    /// `None` for unbounded ones.
    List { offset: Option<u64> },
    /// A single record.
    Single,
    /// Nothing; any body is ignored.
    Nothing,
}

/// Successful outcome of an exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Records(ListResult),
    Record(Record),
    Nothing,
}

/// Interpret the outcome of one exchange.
pub fn interpret(
    outcome: Result<HttpResponse, TransportError>,
    expect: Expect,
) -> Result<Payload, SdkError> {
    let response = outcome?;
    debug!(status = response.status, bytes = response.body.len(), "received response");
    let payload = decode_body(&response.body);

    if !response.is_success() {
        return Err(api_error(response.status, payload.as_ref()));
    }

    match expect {
        Expect::Nothing => Ok(Payload::Nothing),
        Expect::Single => {
            let payload = payload.ok_or(SdkError::UnexpectedResponseShape)?;
            single_record(payload).map(Payload::Record)
        }
        Expect::List { offset } => {
            let payload = payload.ok_or(SdkError::UnexpectedResponseShape)?;
            record_list(payload, offset).map(Payload::Records)
        }
    }
}

/// Decode a JSON body, treating an empty or undecodable body as absent.
pub fn decode_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "response body is not JSON");
            None
        }
    }
}

/// Build an `ApiError` from a non-2xx status and whatever payload came with it.
pub fn api_error(status: u16, payload: Option<&Value>) -> SdkError {
    let message = payload
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(NO_DETAILS)
        .to_string();
    SdkError::ApiError { status, message }
}

/// `offset + received < count`, the paging rule shared by every list call.
pub fn has_more(offset: u64, received: usize, count: u64) -> bool {
    offset.saturating_add(received as u64) < count
}

fn single_record(payload: Value) -> Result<Record, SdkError> {
    match payload {
        Value::Object(_) => to_record(payload),
        _ => Err(SdkError::UnexpectedResponseShape),
    }
}

fn record_list(payload: Value, offset: Option<u64>) -> Result<ListResult, SdkError> {
    match payload {
        Value::Object(mut page) if page.contains_key("items") => {
            let count = page
                .get("count")
                .and_then(Value::as_u64)
                .ok_or(SdkError::UnexpectedResponseShape)?;
            let items = match page.remove("items") {
                Some(Value::Array(items)) => items,
                _ => return Err(SdkError::UnexpectedResponseShape),
            };
            let records = to_records(items)?;
            let has_more = offset.is_some_and(|offset| has_more(offset, records.len(), count));
            Ok(ListResult { records, has_more })
        }
        Value::Array(items) => Ok(ListResult {
            records: to_records(items)?,
            has_more: false,
        }),
        _ => Err(SdkError::UnexpectedResponseShape),
    }
}

fn to_records(items: Vec<Value>) -> Result<Vec<Record>, SdkError> {
    items.into_iter().map(single_record).collect()
}

fn to_record(value: Value) -> Result<Record, SdkError> {
    serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "record does not match expected shape");
        SdkError::UnexpectedResponseShape
    })
}
