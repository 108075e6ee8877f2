//! Client core for the Fieldbook spreadsheet API.
//!
//! # Overview
//! Builds `HttpRequest` values and interprets completed exchanges without
//! touching the network (host-does-IO pattern). `Session` layers async CRUD
//! on top for callers that want the SDK to drive a `Transport` itself.
//!
//! # Design
//! - `RequestBuilder` owns URL composition, parameter encoding and headers.
//! - `response::interpret` owns status classification and payload shapes.
//! - `FieldbookClient` splits each operation into `build_*` / `parse_*`.
//! - `Session` runs the exchange on a blocking worker and completes on the
//!   caller's runtime handle.
//! - Credentials live on the client, never in global state.

pub mod client;
pub mod error;
pub mod http;
pub mod pager;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{Exchange, FieldbookClient};
pub use error::{BoxError, SdkError, TransportError, NO_DETAILS};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use pager::Pager;
pub use request::{RequestBuilder, DEFAULT_BASE_URL};
pub use response::{interpret, Expect, Payload};
pub use session::{Call, Session};
pub use transport::{Transport, UreqTransport, DEFAULT_BODY_LIMIT};
pub use types::{Credentials, ListRequest, ListResult, Projection, Record, RecordId};
