//! Asynchronous CRUD operations over a `Transport`.
//!
//! # Design
//! A `Session` pairs a `FieldbookClient` with a transport and a completion
//! context, a tokio runtime `Handle` chosen by the caller. Every operation
//! spawns one task on that context: the blocking transport runs on the
//! runtime's blocking pool, then interpretation and completion resume back
//! on the context. Results therefore never surface on the transport's
//! worker thread.
//!
//! One request is in flight per call. There is no cancellation: dropping a
//! `Call` detaches it and the exchange still runs to completion.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::{parse_list, parse_nothing, parse_record, Exchange, FieldbookClient};
use crate::error::{SdkError, TransportError};
use crate::http::HttpRequest;
use crate::pager::Pager;
use crate::transport::Transport;
use crate::types::{ListRequest, ListResult, Projection, Record, RecordId};

/// Pending result of a `Session` operation.
///
/// Resolves exactly once. Await it, or hand it a callback with
/// `on_complete`.
#[must_use = "a Call does nothing useful unless awaited or given a callback"]
pub struct Call<T> {
    task: JoinHandle<Result<T, SdkError>>,
    context: Handle,
}

impl<T: Send + 'static> Call<T> {
    /// Run `callback` with the result, on the session's completion context.
    pub fn on_complete<F>(self, callback: F)
    where
        F: FnOnce(Result<T, SdkError>) + Send + 'static,
    {
        let context = self.context.clone();
        context.spawn(async move { callback(self.await) });
    }
}

impl<T> Future for Call<T> {
    type Output = Result<T, SdkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| {
            joined.unwrap_or_else(|e| Err(TransportError::Interrupted(e.to_string()).into()))
        })
    }
}

/// CRUD operations that deliver their results on a designated context.
pub struct Session<T> {
    client: FieldbookClient,
    transport: Arc<T>,
    context: Handle,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            transport: Arc::clone(&self.transport),
            context: self.context.clone(),
        }
    }
}

impl<T: Transport + 'static> Session<T> {
    pub fn new(client: FieldbookClient, transport: T, context: Handle) -> Self {
        Self {
            client,
            transport: Arc::new(transport),
            context,
        }
    }

    /// Session completing on the runtime the caller is currently running in.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    pub fn on_current_runtime(client: FieldbookClient, transport: T) -> Self {
        Self::new(client, transport, Handle::current())
    }

    pub fn client(&self) -> &FieldbookClient {
        &self.client
    }

    pub fn context(&self) -> &Handle {
        &self.context
    }

    pub fn list(&self, request: &ListRequest) -> Call<ListResult> {
        let built = self.client.build_list(request);
        let request = request.clone();
        self.dispatch(built, move |exchange| parse_list(&request, exchange))
    }

    /// Every record of `query`, unpaged.
    pub fn list_all(&self, query: &str) -> Call<ListResult> {
        self.list(&ListRequest::new(query))
    }

    pub fn get(&self, query: &str, id: RecordId, projection: &Projection) -> Call<Record> {
        self.dispatch(self.client.build_get(query, id, projection), parse_record)
    }

    pub fn create<F>(&self, query: &str, fields: &F) -> Call<Record>
    where
        F: Serialize + ?Sized,
    {
        self.dispatch(self.client.build_create(query, fields), parse_record)
    }

    pub fn update<F>(&self, query: &str, id: RecordId, fields: &F) -> Call<Record>
    where
        F: Serialize + ?Sized,
    {
        self.dispatch(self.client.build_update(query, id, fields), parse_record)
    }

    pub fn delete(&self, query: &str, id: RecordId) -> Call<()> {
        self.dispatch(self.client.build_delete(query, id), parse_nothing)
    }

    /// Fetch the pager's next page and fold it in. Returns `None` once the
    /// pager reports no more pages.
    ///
    /// A `MalformedQuery` ends paging, since every later request would be
    /// built the same way. Any other error leaves the pager where it was, so
    /// the next call retries the same page.
    pub async fn next_page(&self, pager: &mut Pager) -> Option<Result<Vec<Record>, SdkError>> {
        let request = pager.next_request()?;
        let result = self.list(&request).await;
        if let Err(SdkError::MalformedQuery(_)) = &result {
            pager.finish();
        }
        Some(result.map(|page| pager.advance(page)))
    }

    fn dispatch<R, P>(&self, built: Result<HttpRequest, SdkError>, parse: P) -> Call<R>
    where
        R: Send + 'static,
        P: FnOnce(Exchange) -> Result<R, SdkError> + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        let task = self.context.spawn(async move {
            let request = built?;
            let exchange = tokio::task::spawn_blocking(move || transport.execute(&request))
                .await
                .unwrap_or_else(|e| Err(TransportError::Interrupted(e.to_string())));
            if let Err(e) = &exchange {
                debug!(error = %e, "exchange did not complete");
            }
            parse(exchange)
        });
        Call {
            task,
            context: self.context.clone(),
        }
    }
}
