//! Router-level tests: requests go through the full axum stack via `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use ideas_ledger::{IdeaLedger, SharedLedger};
use ideas_nullables::NullClock;
use ideas_rpc::{create_router, AppState, RpcServer, CALLER_HEADER};
use ideas_store::MemoryContentStore;
use ideas_types::Address;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn admin() -> Address {
    Address::from_index(0xad)
}

fn alice() -> Address {
    Address::from_index(1)
}

fn bob() -> Address {
    Address::from_index(2)
}

fn app() -> Router {
    let ledger = SharedLedger::new(IdeaLedger::new(admin()), Arc::new(NullClock::new(1_000)));
    create_router(AppState::new(ledger, Arc::new(MemoryContentStore::new())))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    caller: Option<&Address>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header(CALLER_HEADER, caller.as_str());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create(app: &Router, author: &Address, title: &str) -> u64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/ideas",
        Some(author),
        Some(json!({ "title": title, "description_locator": "h1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_u64().unwrap()
}

// ---------------------------------------------------------------------------
// 1. Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_then_list_in_order() {
    let app = app();
    assert_eq!(create(&app, &alice(), "t1").await, 0);
    assert_eq!(create(&app, &alice(), "t2").await, 1);

    let (status, body) = send(&app, Method::GET, "/ideas", Some(&bob()), None).await;
    assert_eq!(status, StatusCode::OK);
    let ideas = body.as_array().unwrap();
    assert_eq!(ideas.len(), 2);
    assert_eq!(ideas[0]["title"], "t1");
    assert_eq!(ideas[1]["title"], "t2");
    assert_eq!(ideas[0]["user_vote"], "pending");
    assert_eq!(ideas[0]["can_vote_for_idea"], true);
    assert_eq!(ideas[0]["can_change"], false);
    assert_eq!(ideas[0]["created_on"], 1_000);
}

#[tokio::test]
async fn anonymous_reads_are_allowed() {
    let app = app();
    create(&app, &alice(), "t").await;
    let (status, body) = send(&app, Method::GET, "/ideas/0", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_change"], false);
}

#[tokio::test]
async fn live_filter_hides_tombstones() {
    let app = app();
    create(&app, &alice(), "gone").await;
    create(&app, &alice(), "kept").await;
    let (status, _) = send(&app, Method::DELETE, "/ideas/0", Some(&alice()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = send(&app, Method::GET, "/ideas", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["title"], "");

    let (_, live) = send(&app, Method::GET, "/ideas?live=true", None, None).await;
    assert_eq!(live.as_array().unwrap().len(), 1);
    assert_eq!(live[0]["title"], "kept");
}

#[tokio::test]
async fn pages_follow_cursors() {
    let app = app();
    for n in 0..3 {
        create(&app, &alice(), &format!("t{n}")).await;
    }

    let (status, first) = send(&app, Method::GET, "/ideas/page?count=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["ideas"].as_array().unwrap().len(), 2);
    let cursor = first["cursor"].as_str().unwrap().to_string();

    let (_, second) = send(
        &app,
        Method::GET,
        &format!("/ideas/page?count=2&cursor={cursor}"),
        None,
        None,
    )
    .await;
    let ideas = second["ideas"].as_array().unwrap();
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0]["title"], "t2");
    assert!(second.get("cursor").is_none());

    let (status, body) = send(&app, Method::GET, "/ideas/page?cursor=zz", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn unknown_idea_is_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/ideas/9", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "idea 9 not found");
}

// ---------------------------------------------------------------------------
// 2. Identity and error mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mutations_require_a_caller() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/ideas",
        None,
        Some(json!({ "title": "t", "description_locator": "h" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_CALLER");
}

#[tokio::test]
async fn malformed_and_zero_callers_are_rejected() {
    let app = app();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/ideas/0")
        .header(CALLER_HEADER, "alice")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, "/ideas/0", Some(&Address::zero()), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_title_is_invalid_input() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/ideas",
        Some(&alice()),
        Some(json!({ "title": "", "description_locator": "h" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert_eq!(body["error"], "invalid input: title must not be empty");
}

#[tokio::test]
async fn stranger_cannot_delete_but_admin_can() {
    let app = app();
    create(&app, &alice(), "t").await;

    let (status, body) = send(&app, Method::DELETE, "/ideas/0", Some(&bob()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = send(&app, Method::DELETE, "/ideas/0", Some(&admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sequence"], 2);
}

#[tokio::test]
async fn edits_by_author() {
    let app = app();
    create(&app, &alice(), "t").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/ideas/0/title",
        Some(&alice()),
        Some(json!({ "title": "renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/ideas/0/description",
        Some(&alice()),
        Some(json!({ "description_locator": "h2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, idea) = send(&app, Method::GET, "/ideas/0", None, None).await;
    assert_eq!(idea["title"], "renamed");
    assert_eq!(idea["description_locator"], "h2");
}

// ---------------------------------------------------------------------------
// 3. Votes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn self_vote_is_forbidden() {
    let app = app();
    create(&app, &alice(), "t").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/ideas/0/votes",
        Some(&alice()),
        Some(json!({ "decision": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "SELF_VOTE_FORBIDDEN");
}

#[tokio::test]
async fn vote_switch_is_reflected_in_listing() {
    let app = app();
    create(&app, &alice(), "t").await;
    for decision in [1, 2] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/ideas/0/votes",
            Some(&bob()),
            Some(json!({ "decision": decision })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, idea) = send(&app, Method::GET, "/ideas/0", Some(&bob()), None).await;
    assert_eq!(idea["approved_count"], 0);
    assert_eq!(idea["rejected_count"], 1);
    assert_eq!(idea["user_vote"], "rejected");
}

#[tokio::test]
async fn unknown_decision_code_is_invalid() {
    let app = app();
    create(&app, &alice(), "t").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/ideas/0/votes",
        Some(&bob()),
        Some(json!({ "decision": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn malformed_arguments_are_invalid_input() {
    let app = app();
    create(&app, &alice(), "t").await;

    let cases = [
        (Method::POST, "/ideas/0/votes", Some(json!({ "decision": 300 }))),
        (Method::POST, "/ideas/0/votes", Some(json!({}))),
        (Method::POST, "/ideas", Some(json!({ "description_locator": "h1" }))),
        (Method::PUT, "/ideas/0/title", Some(json!({ "title": 7 }))),
        (Method::PUT, "/ideas/abc/title", Some(json!({ "title": "x" }))),
        (Method::DELETE, "/ideas/abc", None),
        (Method::DELETE, "/comments/-1", None),
        (Method::GET, "/ideas/abc", None),
    ];
    for (method, uri, body) in cases {
        let label = format!("{method} {uri}");
        let (status, response) = send(&app, method, uri, Some(&bob()), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{label}");
        assert_eq!(response["code"], "INVALID_INPUT", "{label}");
        assert!(response["error"].as_str().is_some(), "{label}");
    }

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(
        "ideas_commands_rejected_total{command=\"vote_for_idea\",reason=\"invalid_input\"} 2"
    ));
    assert!(text.contains(
        "ideas_commands_rejected_total{command=\"edit_idea_title\",reason=\"invalid_input\"} 2"
    ));
    assert!(text.contains(
        "ideas_commands_rejected_total{command=\"delete_idea\",reason=\"invalid_input\"} 1"
    ));
}

// ---------------------------------------------------------------------------
// 4. Comments and content
// ---------------------------------------------------------------------------

#[tokio::test]
async fn comment_lifecycle() {
    let app = app();
    create(&app, &alice(), "t").await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/ideas/0/comments",
        Some(&bob()),
        Some(json!({ "description_locator": "c1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = created["id"].as_u64().unwrap();

    let (_, idea) = send(&app, Method::GET, "/ideas/0", Some(&bob()), None).await;
    assert_eq!(idea["comments"][0]["can_delete"], true);

    let uri = format!("/comments/{comment_id}");
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(&bob()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn commenting_on_deleted_idea_is_404() {
    let app = app();
    create(&app, &alice(), "t").await;
    send(&app, Method::DELETE, "/ideas/0", Some(&alice()), None).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/ideas/0/comments",
        Some(&bob()),
        Some(json!({ "description_locator": "c1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inline_description_is_stored_and_fetchable() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/ideas",
        Some(&alice()),
        Some(json!({ "title": "t", "description": "a longer body" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, idea) = send(&app, Method::GET, "/ideas/0", None, None).await;
    let locator = idea["description_locator"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri(format!("/content/{locator}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"a longer body");
}

#[tokio::test]
async fn description_needs_exactly_one_source() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/ideas",
        Some(&alice()),
        Some(json!({ "title": "t" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/ideas",
        Some(&alice()),
        Some(json!({ "title": "t", "description": "x", "description_locator": "h" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unpin_then_fetch_is_404() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/content")
        .header(CALLER_HEADER, alice().as_str())
        .body(Body::from("raw bytes"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let uri = format!("/content/{}", body["locator"].as_str().unwrap());

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// 5. Events and metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_replay_from_mark() {
    let app = app();
    create(&app, &alice(), "t").await;
    send(
        &app,
        Method::POST,
        "/ideas/0/votes",
        Some(&bob()),
        Some(json!({ "decision": 1 })),
    )
    .await;

    let (status, replay) = send(&app, Method::GET, "/events?since=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["gap"], false);
    assert_eq!(replay["high_water_mark"], 2);
    let events = replay["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["sequence"], 2);
    assert_eq!(events[0]["event"]["type"], "user_vote_performed");
    assert_eq!(events[0]["event"]["decision"], "approved");
}

#[tokio::test]
async fn metrics_count_commands() {
    let app = app();
    create(&app, &alice(), "t").await;
    send(
        &app,
        Method::POST,
        "/ideas/0/votes",
        Some(&alice()),
        Some(json!({ "decision": 1 })),
    )
    .await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("ideas_commands_accepted_total{command=\"create_idea\"} 1"));
    assert!(text.contains(
        "ideas_commands_rejected_total{command=\"vote_for_idea\",reason=\"self_vote_forbidden\"} 1"
    ));
    assert!(text.contains("ideas_idea_slots 1"));
}

#[tokio::test]
async fn health_reports_counters() {
    let app = app();
    create(&app, &alice(), "t").await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["live_ideas"], 1);
    assert_eq!(body["last_sequence"], 1);
}

#[tokio::test]
async fn graceful_shutdown_closes_the_listener() {
    let ledger = SharedLedger::new(IdeaLedger::new(admin()), Arc::new(NullClock::new(1_000)));
    let state = AppState::new(ledger, Arc::new(MemoryContentStore::new()));
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let (addr, handle) = RpcServer::new("127.0.0.1:0".parse().unwrap())
        .start_until(state, async move {
            let _ = stopped.await;
        })
        .await
        .unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not drain")
        .unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}
