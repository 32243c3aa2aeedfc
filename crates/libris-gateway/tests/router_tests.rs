// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface: authentication, routing, and error bodies.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use libris_core::{EventId, UserId};
use libris_test_utils::{TEST_BEARER_TOKEN, TestHarness};
use serde_json::{Value, json};
use tower::ServiceExt;

struct Call {
    method: Method,
    uri: String,
    user: Option<UserId>,
    role: Option<&'static str>,
    token: Option<&'static str>,
    body: Option<Value>,
}

impl Call {
    fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            user: None,
            role: None,
            token: Some(TEST_BEARER_TOKEN),
            body: None,
        }
    }

    fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    fn as_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    fn as_admin(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self.role = Some("admin");
        self
    }

    fn token(mut self, token: Option<&'static str>) -> Self {
        self.token = token;
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    async fn send(self, h: &TestHarness) -> (StatusCode, Value) {
        let mut req = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        if let Some(user) = self.user {
            req = req.header("x-user-id", user.to_string());
        }
        if let Some(role) = self.role {
            req = req.header("x-user-role", role);
        }
        let body = match self.body {
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
}

#[tokio::test]
async fn health_needs_no_auth() {
    let h = TestHarness::new().await.unwrap();
    let (status, body) = Call::get("/health").token(None).send(&h).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"]["status"], "healthy");
}

#[tokio::test]
async fn missing_or_wrong_token_is_unauthorized() {
    let h = TestHarness::new().await.unwrap();
    let u = h.add_user().await;

    let (status, _) = Call::get("/notifications")
        .as_user(u)
        .token(None)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = Call::get("/notifications")
        .as_user(u)
        .token(Some("nope"))
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_or_malformed_user_header_is_unauthorized() {
    let h = TestHarness::new().await.unwrap();
    let (status, _) = Call::get("/notifications").send(&h).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/notifications/unread_count")
        .header("authorization", format!("Bearer {TEST_BEARER_TOKEN}"))
        .header("x-user-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let resp = h.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let h = TestHarness::new().await.unwrap();
    let u = h.add_user().await;
    let body = json!({
        "type": "SYSTEM_ALERT",
        "title": "t",
        "message": "m",
        "audience": "broadcast",
    });

    let (status, _) = Call::post("/admin/events")
        .as_user(u)
        .json(body.clone())
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = Call::post("/admin/events")
        .as_admin(u)
        .json(body)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn publish_then_read_over_http() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u = h.add_user().await;

    let (status, body) = Call::post("/admin/events")
        .as_admin(admin)
        .json(json!({
            "type": "BOOK_AVAILABLE",
            "title": "Now available",
            "message": "Dune is back on the shelf.",
            "object": { "kind": "book", "id": "b-1", "title": "Dune" },
            "metadata": { "copies": 1 },
            "audience": { "user_ids": [u.to_string()] },
        }))
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, feed) = Call::get("/notifications").as_user(u).send(&h).await;
    assert_eq!(status, StatusCode::OK);
    let items = feed["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id.as_str());
    assert_eq!(items[0]["type"], "BOOK_AVAILABLE");
    assert_eq!(items[0]["is_read"], false);
    assert_eq!(items[0]["metadata"]["copies"], 1);
    assert!(feed.get("next_cursor").is_none());

    let (_, count) = Call::get("/notifications/unread_count")
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(count["count"], 1);

    let uri = format!("/notifications/{id}/read");
    let (status, first) = Call::post(uri.clone()).as_user(u).send(&h).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["changed"], true);
    let (_, second) = Call::post(uri).as_user(u).send(&h).await;
    assert_eq!(second["changed"], false);

    let (_, count) = Call::get("/notifications/unread_count")
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn mark_all_read_reports_updated_count() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u = h.add_user().await;
    for title in ["one", "two"] {
        let (status, _) = Call::post("/admin/events")
            .as_admin(admin)
            .json(json!({
                "type": "SYSTEM_ALERT",
                "title": title,
                "message": "m",
                "audience": "broadcast",
            }))
            .send(&h)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = Call::post("/notifications/mark_all_read")
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);
}

#[tokio::test]
async fn paging_over_http_follows_cursor() {
    let h = TestHarness::new().await.unwrap();
    let u = h.add_user().await;
    for i in 0..5 {
        h.publish(libris_core::PublishRequest::targeted(
            libris_core::EventType::SystemAlert,
            format!("n{i}"),
            "m",
            [u],
        ))
        .await
        .unwrap();
    }

    let (_, first) = Call::get("/notifications?limit=3").as_user(u).send(&h).await;
    assert_eq!(first["items"].as_array().unwrap().len(), 3);
    let cursor = first["next_cursor"].as_str().unwrap();

    let (_, second) = Call::get(format!("/notifications?limit=3&cursor={cursor}"))
        .as_user(u)
        .send(&h)
        .await;
    let titles: Vec<&str> = second["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["n1", "n0"]);
    assert!(second.get("next_cursor").is_none());
}

#[tokio::test]
async fn empty_query_values_mean_defaults() {
    let h = TestHarness::new().await.unwrap();
    let u = h.add_user().await;
    h.publish(libris_core::PublishRequest::targeted(
        libris_core::EventType::SystemAlert,
        "hello",
        "m",
        [u],
    ))
    .await
    .unwrap();

    for uri in [
        "/notifications?cursor=&limit=",
        "/notifications?cursor=",
        "/notifications?limit=",
    ] {
        let (status, body) = Call::get(uri).as_user(u).send(&h).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
        assert_eq!(body["items"].as_array().unwrap().len(), 1, "{uri}");
    }

    let (status, body) = Call::get("/notifications?limit=ten").as_user(u).send(&h).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn error_bodies_carry_kind() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let u = h.add_user().await;
    let other = h.add_user().await;

    let (status, body) = Call::get("/notifications?cursor=garbage")
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert!(body["detail"].is_string());

    let (status, body) = Call::post(format!("/notifications/{}/read", EventId::new()))
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "EventNotFound");

    let (status, body) = Call::post("/notifications/not-an-id/read")
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (_, published) = Call::post("/admin/events")
        .as_admin(admin)
        .json(json!({
            "type": "SYSTEM_ALERT",
            "title": "private",
            "message": "m",
            "audience": { "user_ids": [other.to_string()] },
        }))
        .send(&h)
        .await;
    let id = published["id"].as_str().unwrap();
    let (status, body) = Call::post(format!("/notifications/{id}/read"))
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NotVisible");

    let (status, body) = Call::get("/notifications/unread_count")
        .as_user(UserId::new())
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UnknownUser");
}

#[tokio::test]
async fn publish_validation_errors() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;

    let cases = [
        json!({ "type": "SYSTEM_ALERT", "title": "", "message": "m", "audience": "broadcast" }),
        json!({ "type": "NOPE", "title": "t", "message": "m", "audience": "broadcast" }),
        json!({ "type": "SYSTEM_ALERT", "title": "t", "message": "m", "audience": { "user_ids": [] } }),
        json!({ "type": "SYSTEM_ALERT", "title": "t", "message": "m", "audience": "broadcast", "extra": 1 }),
        json!({ "type": "SYSTEM_ALERT", "title": "t", "message": "m", "audience": "broadcast", "metadata": [1, 2] }),
    ];
    for case in cases {
        let (status, body) = Call::post("/admin/events")
            .as_admin(admin)
            .json(case.clone())
            .send(&h)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
        assert_eq!(body["error"], "ValidationError", "{case}");
    }

    let (status, body) = Call::post("/admin/events")
        .as_admin(admin)
        .json(json!({
            "type": "SYSTEM_ALERT",
            "title": "t",
            "message": "m",
            "audience": { "user_ids": [UserId::new().to_string()] },
        }))
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UnknownUser");
}

#[tokio::test]
async fn trigger_endpoint_returns_report() {
    let h = TestHarness::new().await.unwrap();
    let admin = h.add_user().await;
    let holder = h.add_user().await;
    h.directory
        .add_reservation("b-3", holder, libris_core::Clock::now(&*h.clock))
        .await;

    let body = json!({
        "trigger": { "kind": "book_available", "book_id": "b-3", "title": "Emma" },
        "trigger_key": "stock:b-3",
    });
    let (status, report) = Call::post("/admin/triggers")
        .as_admin(admin)
        .json(body.clone())
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["trigger"], "book_available");
    assert_eq!(report["ok"], 1);
    assert_eq!(report["failed"].as_array().unwrap().len(), 0);

    let (_, again) = Call::post("/admin/triggers")
        .as_admin(admin)
        .json(body)
        .send(&h)
        .await;
    assert_eq!(again["ok"], 0);
    assert_eq!(again["skipped"], 1);

    let (status, bad) = Call::post("/admin/triggers")
        .as_admin(admin)
        .json(json!({ "trigger": { "kind": "book_returned" } }))
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(bad["error"], "ValidationError");
}

#[tokio::test]
async fn requests_after_shutdown_are_unavailable() {
    let h = TestHarness::new().await.unwrap();
    let u = h.add_user().await;
    h.shutdown.cancel();

    let (status, body) = Call::get("/notifications/unread_count")
        .as_user(u)
        .send(&h)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Cancelled");
}
