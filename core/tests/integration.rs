//! Full CRUD lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every `Session`
//! operation over real HTTP with `UreqTransport`. Validates that request
//! building and response interpretation agree with the server end-to-end.

use std::collections::HashMap;
use std::io::{Read, Write};

use fieldbook_core::{
    Credentials, FieldbookClient, ListRequest, Pager, Projection, SdkError, Session,
    TransportError, UreqTransport,
};
use mock_server::Db;
use serde_json::json;

const KEY: &str = "key-3";
const SECRET: &str = "ni2YUysqcSBhVQqhvH1r";

/// Serve `db` on an ephemeral port from its own thread; returns the API root.
fn start_server(db: Db) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, db).await
        })
        .unwrap();
    });

    format!("http://{addr}/v1")
}

fn session(base_url: &str, credentials: Option<Credentials>) -> Session<UreqTransport> {
    let mut client = FieldbookClient::new(base_url);
    client.set_credentials(credentials);
    Session::on_current_runtime(client, UreqTransport::new())
}

#[tokio::test]
async fn crud_lifecycle() {
    let base = start_server(Db::new().with_credentials(KEY, SECRET));
    let session = session(&base, Some(Credentials::new(KEY, SECRET)));

    // Step 1: the sheet does not exist yet.
    let err = session.list_all("b1/s1").await.unwrap_err();
    assert!(err.is_not_found(), "expected 404, got {err:?}");

    // Step 2: create three records.
    let mut ids = Vec::new();
    for n in 1..=3 {
        let created = session
            .create("b1/s1", &json!({"col_1": format!("{n} 1"), "col_2": n * 11, "col_3": "x"}))
            .await
            .unwrap();
        assert_eq!(created.get("col_2"), Some(&json!(n * 11)));
        ids.push(created.id.expect("server assigns an id"));
    }
    assert_eq!(ids, vec![1, 2, 3]);

    // Step 3: get with projection.
    let fetched = session
        .get("b1/s1", ids[1], &Projection::default().include(["col_1"]))
        .await
        .unwrap();
    assert_eq!(fetched.id, Some(2));
    assert_eq!(fetched.fields.len(), 1);
    assert_eq!(fetched.get("col_1"), Some(&json!("2 1")));

    // Step 4: filtered, paged list.
    let page = session
        .list(&ListRequest::new("b1/s1").limit(5).offset(0).filter("col_1=2 1"))
        .await
        .unwrap();
    assert_eq!(page.records.len(), 1);
    assert!(!page.has_more);

    // Step 5: partial update returns the full record.
    let updated = session
        .update("b1/s1", ids[0], &json!({"col_3": "y"}))
        .await
        .unwrap();
    assert_eq!(updated.get("col_1"), Some(&json!("1 1")));
    assert_eq!(updated.get("col_3"), Some(&json!("y")));

    // Step 6: page through everything two at a time.
    let mut pager = Pager::new(ListRequest::new("b1/s1"), 2);
    let first = session.next_page(&mut pager).await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert!(pager.has_more());
    let second = session.next_page(&mut pager).await.unwrap().unwrap();
    assert_eq!(second.len(), 1);
    assert!(session.next_page(&mut pager).await.is_none());
    assert_eq!(pager.loaded(), 3);

    // Step 7: delete, then it is gone.
    session.delete("b1/s1", ids[2]).await.unwrap();
    let err = session.get("b1/s1", ids[2], &Projection::default()).await.unwrap_err();
    assert!(err.is_not_found());
    let err = session.delete("b1/s1", ids[2]).await.unwrap_err();
    assert!(err.is_not_found());

    // Step 8: unbounded list reflects the deletion.
    let all = session.list_all("b1/s1").await.unwrap();
    assert_eq!(all.records.len(), 2);
    assert!(!all.has_more);
}

#[tokio::test]
async fn writes_without_credentials_are_api_errors() {
    let base = start_server(Db::new().with_credentials(KEY, SECRET));
    let session = session(&base, None);

    let err = session.create("b1/s1", &json!({"col_1": "a"})).await.unwrap_err();
    match err {
        SdkError::ApiError { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Authentication required");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn unencodable_body_is_sent_empty() {
    let base = start_server(Db::new());
    let session = session(&base, None);

    // The POST still goes out; the server rejects the empty body.
    let mut fields = HashMap::new();
    fields.insert((1, 2), "a");
    let err = session.create("b1/s1", &fields).await.unwrap_err();
    match err {
        SdkError::ApiError { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Request body must be a JSON object");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let session = session(&format!("http://{addr}/v1"), None);

    let err = session.list_all("b1/s1").await.unwrap_err();
    assert!(matches!(err, SdkError::Transport(_)), "got {err:?}");
}

/// Answer one connection with `response` verbatim, then close it.
fn serve_raw_once(response: &'static [u8]) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(response).unwrap();
    });

    format!("http://{addr}/v1")
}

#[tokio::test]
async fn body_cut_short_is_a_transport_error() {
    let base = serve_raw_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"id\":1,",
    );
    let session = session(&base, None);

    let err = session
        .get("b1/s1", 1, &Projection::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, SdkError::Transport(TransportError::Exchange(_))),
        "got {err:?}"
    );
}

#[tokio::test]
async fn body_over_the_limit_is_a_transport_error() {
    let base = start_server(Db::new().with_sheet(
        "b1",
        "s1",
        (0..50).map(|n| json!({"col_1": format!("row {n}")})).collect(),
    ));
    let transport = UreqTransport::new().with_body_limit(64);
    let session = Session::on_current_runtime(FieldbookClient::new(&base), transport);

    let err = session.list_all("b1/s1").await.unwrap_err();
    assert!(
        matches!(err, SdkError::Transport(TransportError::Exchange(_))),
        "got {err:?}"
    );
}
