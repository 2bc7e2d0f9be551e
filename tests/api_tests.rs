//! HTTP-level tests: the full router over the in-memory catalog store

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookshelf_server::{
    api,
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Caller, Role},
    repository::MemoryStore,
    services::{identity::IdentityProvider, Services},
    AppState,
};

/// Maps fixed tokens to callers
struct StaticIdentity;

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn validate(&self, token: &str) -> AppResult<Caller> {
        let (user_id, username, role) = match token {
            "admin-token" => (1, "admin", Role::Admin),
            "librarian-token" => (2, "lib", Role::Librarian),
            "alice-token" => (3, "alice", Role::Member),
            "bob-token" => (4, "bob", Role::Member),
            _ => return Err(AppError::Authentication("Invalid token".to_string())),
        };
        Ok(Caller {
            user_id,
            username: username.to_string(),
            role,
            email: format!("{}@example.org", username),
            mobile: "0600000000".to_string(),
        })
    }
}

fn app() -> Router {
    let config = AppConfig::default();
    let services = Services::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StaticIdentity),
        &config.circulation,
    );
    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("jwt={}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_book(app: &Router, title: &str, total_count: i32) -> i64 {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/books/createBook",
            Some("admin-token"),
            Some(json!({
                "title": title,
                "author": "Octavia E. Butler",
                "genre": "Science fiction",
                "publication_date": "01/06/1979",
                "total_count": total_count
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["book_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, request("GET", "/ready", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let app = app();
    let (status, body) = send(&app, request("GET", "/books", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);

    let (status, _) = send(&app, request("GET", "/books", Some("forged"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_header_accepted() {
    let app = app();
    let req = Request::builder()
        .uri("/books")
        .header(header::AUTHORIZATION, "Bearer alice-token")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_members_cannot_manage_catalog() {
    let app = app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/books/createBook",
            Some("alice-token"),
            Some(json!({"title": "Kindred", "total_count": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 3);

    let id = create_book(&app, "Kindred", 1).await;
    let (status, _) = send(
        &app,
        request("DELETE", &format!("/books/deleteBook/{}", id), Some("bob-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_and_fetch_book() {
    let app = app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/books/createBook",
            Some("librarian-token"),
            Some(json!({
                "title": "The Left Hand of Darkness",
                "author": "Ursula K. Le Guin",
                "genre": "Science fiction",
                "publication_date": "01/03/1969",
                "total_count": 2
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["publication_date"], "01/03/1969");
    assert_eq!(body["borrowed_count"], 0);
    assert_eq!(body["availability_status"], true);
    let id = body["book_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        request("GET", &format!("/books/id/{}", id), Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "The Left Hand of Darkness");

    let (status, body) = send(
        &app,
        request(
            "GET",
            "/books/title/The%20Left%20Hand%20of%20Darkness",
            Some("alice-token"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book_id"], id);

    let (status, _) = send(&app, request("GET", "/books/id/999", Some("alice-token"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_input_is_bad_request() {
    let app = app();
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/books/createBook",
            Some("admin-token"),
            Some(json!({"title": "Kindred", "publication_date": "1979-06-01", "total_count": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/books/createBook",
            Some("admin-token"),
            Some(json!({"title": "Kindred", "total_count": -3})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 6);

    let (status, _) = send(&app, request("GET", "/books/id/abc", Some("admin-token"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_borrow_and_return_flow() {
    let app = app();
    let id = create_book(&app, "Kindred", 1).await;

    let (status, body) = send(
        &app,
        request("POST", &format!("/books/{}/borrow", id), Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["book_id"], id);
    assert!(body.get("returned_on").is_none());

    let (status, body) = send(
        &app,
        request("POST", &format!("/books/{}/borrow", id), Some("bob-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 7);

    // Staff accounts do not borrow.
    let (status, _) = send(
        &app,
        request("POST", &format!("/books/{}/borrow", id), Some("librarian-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(
        &app,
        request("GET", &format!("/books/id/{}", id), Some("bob-token"), None),
    )
    .await;
    assert_eq!(body["borrowed_count"], 1);
    assert_eq!(body["availability_status"], false);

    let (status, _) = send(
        &app,
        request("POST", &format!("/books/{}/return", id), Some("bob-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        request("POST", &format!("/books/{}/return", id), Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["returned_on"].is_string());

    let (_, body) = send(
        &app,
        request("GET", &format!("/books/id/{}", id), Some("bob-token"), None),
    )
    .await;
    assert_eq!(body["borrowed_count"], 0);
    assert_eq!(body["availability_status"], true);
}

#[tokio::test]
async fn test_update_and_delete_respect_loans() {
    let app = app();
    let id = create_book(&app, "Parable of the Sower", 2).await;
    send(
        &app,
        request("POST", &format!("/books/{}/borrow", id), Some("alice-token"), None),
    )
    .await;
    send(
        &app,
        request("POST", &format!("/books/{}/borrow", id), Some("bob-token"), None),
    )
    .await;

    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/books/updateBook/{}", id),
            Some("admin-token"),
            Some(json!({"total_count": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/books/updateBook/{}", id),
            Some("admin-token"),
            Some(json!({"title": "", "genre": "Dystopia", "total_count": 4})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Parable of the Sower");
    assert_eq!(body["genre"], "Dystopia");
    assert_eq!(body["total_count"], 4);
    assert_eq!(body["borrowed_count"], 2);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/books/deleteBook/{}", id), Some("admin-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_listing_pagination_and_search() {
    let app = app();
    for i in 0..12 {
        create_book(&app, &format!("Xenogenesis {}", i), 1).await;
    }
    create_book(&app, "Kindred", 1).await;

    let (status, body) = send(
        &app,
        request("GET", "/books?page=2&limit=5&search=xeno", Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 12);
    assert_eq!(body["page"], 2);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["books"].as_array().unwrap().len(), 5);

    let (status, body) = send(
        &app,
        request("GET", "/books?page=abc&limit=0", Some("alice-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["total"], 13);
    assert_eq!(body["books"].as_array().unwrap().len(), 10);

    let (status, body) = send(
        &app,
        request(
            "GET",
            "/books?page=9223372036854775807&limit=10",
            Some("alice-token"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 13);
    assert!(body["books"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_scoped_to_member() {
    let app = app();
    let id = create_book(&app, "Kindred", 3).await;
    for token in ["alice-token", "bob-token"] {
        let (status, _) = send(
            &app,
            request("POST", &format!("/books/{}/borrow", id), Some(token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, request("GET", "/history", Some("alice-token"), None)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["username"], "alice");
    assert_eq!(entries[0]["book_title"], "Kindred");

    let (_, body) = send(&app, request("GET", "/history", Some("librarian-token"), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}
