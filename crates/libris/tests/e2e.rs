// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the HTTP surface.
//!
//! Each test creates an isolated TestHarness with a temp SQLite database, an
//! in-memory directory and a manual clock, and drives it through the axum
//! router. Tests are independent and order-insensitive.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use libris_core::{Clock, EventId, EventStore, UserId};
use libris_test_utils::{TEST_BEARER_TOKEN, TestHarness};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(
    h: &TestHarness,
    method: &str,
    uri: &str,
    user: UserId,
    admin: bool,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {TEST_BEARER_TOKEN}"))
        .header("x-user-id", user.to_string());
    if admin {
        req = req.header("x-user-role", "admin");
    }
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = h.router().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn publish(h: &TestHarness, admin: UserId, body: Value) -> String {
    let (status, resp) = call(h, "POST", "/admin/events", admin, true, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    resp["id"].as_str().unwrap().to_string()
}

async fn feed(h: &TestHarness, user: UserId, query: &str) -> Value {
    let (status, page) = call(h, "GET", &format!("/notifications{query}"), user, false, None).await;
    assert_eq!(status, StatusCode::OK, "{page}");
    page
}

async fn unread(h: &TestHarness, user: UserId) -> u64 {
    let (status, body) = call(h, "GET", "/notifications/unread_count", user, false, None).await;
    assert_eq!(status, StatusCode::OK);
    body["count"].as_u64().unwrap()
}

async fn mark_read(h: &TestHarness, user: UserId, id: &str) -> bool {
    let (status, body) = call(
        h,
        "POST",
        &format!("/notifications/{id}/read"),
        user,
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["changed"].as_bool().unwrap()
}

fn system_alert(title: &str, audience: Value) -> Value {
    json!({
        "type": "SYSTEM_ALERT",
        "title": title,
        "message": "message",
        "audience": audience,
    })
}

fn users(ids: &[UserId]) -> Value {
    json!({ "user_ids": ids.iter().map(|u| u.to_string()).collect::<Vec<_>>() })
}

// ---- Scenario 1: targeted publish & read ----

#[tokio::test]
async fn targeted_publish_and_read() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u1 = h.add_user().await;

    let e1 = publish(
        &h,
        admin,
        json!({
            "type": "BOOK_AVAILABLE",
            "title": "Now available",
            "message": "Piranesi is back on the shelf.",
            "audience": users(&[u1]),
        }),
    )
    .await;

    let page = feed(&h, u1, "").await;
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], e1.as_str());
    assert_eq!(items[0]["type"], "BOOK_AVAILABLE");
    assert_eq!(items[0]["is_read"], false);
    assert!(items[0]["object"].is_null());
    assert!(items[0]["metadata"].is_null());
    assert!(items[0]["created_at"].as_str().unwrap().ends_with('Z'));

    assert!(mark_read(&h, u1, &e1).await);
    assert!(!mark_read(&h, u1, &e1).await);
    assert_eq!(unread(&h, u1).await, 0);
}

// ---- Scenario 2: broadcast lazy materialization ----

#[tokio::test]
async fn broadcast_lazy_materialization() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u1 = h.add_user().await;
    let u2 = h.add_user().await;

    let e2 = publish(&h, admin, system_alert("Maintenance", json!("broadcast"))).await;
    let event_id: EventId = e2.parse().unwrap();

    let page = feed(&h, u1, "").await;
    assert_eq!(page["items"][0]["id"], e2.as_str());
    assert_eq!(page["items"][0]["is_read"], false);
    assert!(h.store.recipient_status(u1, event_id).await.unwrap().is_none());

    assert!(mark_read(&h, u1, &e2).await);
    assert!(h.store.recipient_status(u1, event_id).await.unwrap().is_some());

    let other = feed(&h, u2, "").await;
    assert_eq!(other["items"][0]["is_read"], false);
    assert!(h.store.recipient_status(u2, event_id).await.unwrap().is_none());
}

// ---- Scenario 3: fan-out on stock increment ----

#[tokio::test]
async fn fan_out_on_stock_increment() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let mut holders = Vec::new();
    for _ in 0..3 {
        let u = h.add_user().await;
        h.directory.add_reservation("b-11", u, h.clock.now()).await;
        holders.push(u);
    }

    let (status, report) = call(
        &h,
        "POST",
        "/admin/triggers",
        admin,
        true,
        Some(json!({
            "trigger": { "kind": "book_available", "book_id": "b-11", "title": "Kindred" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["ok"], 3);
    assert_eq!(report["failed"], json!([]));

    for u in holders {
        let page = feed(&h, u, "").await;
        let items = page["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["type"], "BOOK_AVAILABLE");
        assert_eq!(items[0]["object"]["kind"], "book");
        assert_eq!(items[0]["object"]["id"], "b-11");
    }
    assert!(feed(&h, admin, "").await["items"]
        .as_array()
        .unwrap()
        .is_empty());
}

// ---- Scenario 4: partial failure in fan-out ----

#[tokio::test]
async fn partial_failure_in_fan_out() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let mut holders = Vec::new();
    for _ in 0..3 {
        let u = h.add_user().await;
        h.directory.add_reservation("b-12", u, h.clock.now()).await;
        holders.push(u);
    }
    h.directory.remove_user(holders[1]).await;
    h.directory.fail_user_lookups(2);

    let (_, report) = call(
        &h,
        "POST",
        "/admin/triggers",
        admin,
        true,
        Some(json!({
            "trigger": { "kind": "book_available", "book_id": "b-12", "title": "Kindred" },
        })),
    )
    .await;

    assert_eq!(report["ok"], 2);
    assert_eq!(
        report["failed"],
        json!([[holders[1].to_string(), "UnknownUser"]])
    );
    assert_eq!(unread(&h, holders[0]).await, 1);
    assert_eq!(unread(&h, holders[2]).await, 1);
}

// ---- Scenario 5: mark_all_read ----

#[tokio::test]
async fn mark_all_read_then_new_arrival() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u1 = h.add_user().await;

    publish(&h, admin, system_alert("E1", users(&[u1]))).await;
    publish(&h, admin, system_alert("E2", json!("broadcast"))).await;
    publish(&h, admin, system_alert("E3", users(&[u1]))).await;
    assert_eq!(unread(&h, u1).await, 3);

    let (status, body) = call(&h, "POST", "/notifications/mark_all_read", u1, false, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 3);
    assert_eq!(unread(&h, u1).await, 0);

    publish(&h, admin, system_alert("E4", users(&[u1]))).await;
    assert_eq!(unread(&h, u1).await, 1);
}

// ---- Scenario 6: pagination determinism ----

#[tokio::test]
async fn pagination_determinism() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u1 = h.add_user().await;
    let mut published = Vec::new();
    for i in 0..120 {
        published.push(publish(&h, admin, system_alert(&format!("n{i}"), users(&[u1]))).await);
    }
    published.reverse();

    let mut seen: Vec<String> = Vec::new();
    let mut sizes = Vec::new();
    let mut query = "?limit=50".to_string();
    loop {
        let page = feed(&h, u1, &query).await;
        let items = page["items"].as_array().unwrap();
        sizes.push(items.len());
        seen.extend(items.iter().map(|i| i["id"].as_str().unwrap().to_string()));
        match page["next_cursor"].as_str() {
            Some(cursor) => query = format!("?limit=50&cursor={cursor}"),
            None => break,
        }
    }

    assert_eq!(sizes, vec![50, 50, 20]);
    // Time-descending, no duplicates, no gaps.
    assert_eq!(seen, published);
}

// ---- Properties ----

#[tokio::test]
async fn unread_count_equals_unread_feed_items() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u1 = h.add_user().await;
    let u2 = h.add_user().await;
    let mut ids = Vec::new();
    for i in 0..9 {
        let audience = match i % 3 {
            0 => json!("broadcast"),
            1 => users(&[u1]),
            _ => users(&[u1, u2]),
        };
        ids.push(publish(&h, admin, system_alert(&format!("p{i}"), audience)).await);
    }
    for id in ids.iter().step_by(2) {
        mark_read(&h, u1, id).await;
    }

    for u in [u1, u2] {
        let page = feed(&h, u, "?limit=100").await;
        let unread_items = page["items"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|i| i["is_read"] == false)
            .count() as u64;
        assert_eq!(unread(&h, u).await, unread_items);
    }
}

#[tokio::test]
async fn targeted_publish_creates_exactly_n_rows() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let mut audience = Vec::new();
    for _ in 0..5 {
        audience.push(h.add_user().await);
    }
    let id: EventId = publish(&h, admin, system_alert("t", users(&audience)))
        .await
        .parse()
        .unwrap();

    let rows = h.store.recipients_of(id).await.unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| !r.is_read));
}

#[tokio::test]
async fn events_are_not_mutated_by_reads() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u1 = h.add_user().await;
    let id = publish(
        &h,
        admin,
        json!({
            "type": "RESERVATION_READY",
            "title": "Ready for pickup",
            "message": "At the north branch.",
            "object": { "kind": "reservation", "id": "r-77", "title": "Kindred" },
            "metadata": {"shelf":"H-2",  "hold_days": 7},
            "audience": users(&[u1]),
        }),
    )
    .await;
    let event_id: EventId = id.parse().unwrap();
    let before = h.store.get_event(event_id).await.unwrap().unwrap();

    mark_read(&h, u1, &id).await;
    call(&h, "POST", "/notifications/mark_all_read", u1, false, None).await;

    let after = h.store.get_event(event_id).await.unwrap().unwrap();
    assert_eq!(before.title, after.title);
    assert_eq!(before.message, after.message);
    assert_eq!(before.created_at, after.created_at);
    assert_eq!(
        before.metadata.as_ref().map(|m| m.get().to_string()),
        after.metadata.as_ref().map(|m| m.get().to_string())
    );

    let page = feed(&h, u1, "").await;
    assert_eq!(page["items"][0]["metadata"]["hold_days"], 7);
    assert_eq!(page["items"][0]["object"]["title"], "Kindred");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mark_read_leaves_one_row() {
    let h = Arc::new(TestHarness::new().await.unwrap());
    let admin = h.add_user().await;
    let u1 = h.add_user().await;
    let id = publish(&h, admin, system_alert("race", json!("broadcast"))).await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let h = Arc::clone(&h);
            let id = id.clone();
            tokio::spawn(async move { mark_read(&h, u1, &id).await })
        })
        .collect();
    let changed = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();

    assert_eq!(changed, 1);
    let rows = h.store.recipients_of(id.parse().unwrap()).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn fan_out_dedup_bounds_event_count() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let mut holders = Vec::new();
    for _ in 0..4 {
        let u = h.add_user().await;
        h.directory.add_reservation("b-13", u, h.clock.now()).await;
        holders.push(u);
    }
    let body = json!({
        "trigger": { "kind": "book_available", "book_id": "b-13", "title": "Beloved" },
        "trigger_key": "restock:b-13:1",
    });

    for _ in 0..3 {
        call(&h, "POST", "/admin/triggers", admin, true, Some(body.clone())).await;
    }

    for u in holders {
        assert_eq!(unread(&h, u).await, 1);
    }
}
