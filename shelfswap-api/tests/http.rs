use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use shelfswap_api::{
    email::LogEmailSender,
    server::{self, ServerState},
};
use shelfswap_db::MemoryStore;
use std::sync::Arc;
use tower::ServiceExt;

const ISBN: u64 = 9_780_134_093_413;

fn app() -> Router {
    let store = Arc::new(MemoryStore::default());
    let email = Arc::new(LogEmailSender::new("noreply@school.edu".to_owned()));
    server::app(ServerState::new(store, email, None))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

/// Signs up and logs in, returning the user id and bearer token.
async fn register(app: &Router, email: &str) -> (u64, String) {
    let (status, _) = send(
        app,
        Method::POST,
        "/signup",
        None,
        Some(json!({ "email": email, "name": "Student", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": email, "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let user_id = body["user"]["id"].as_u64().unwrap();
    let token = body["token"].as_str().unwrap().to_owned();
    (user_id, token)
}

async fn create_post(app: &Router, token: &str, body: Value) -> Value {
    let (status, post) = send(app, Method::POST, "/posts", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{post}");
    post
}

#[tokio::test]
async fn price_drop_reaches_watcher() {
    let app = app();
    let (seller_id, seller) = register(&app, "seller@school.edu").await;
    let (watcher_id, watcher) = register(&app, "watcher@school.edu").await;

    let post = create_post(
        &app,
        &seller,
        json!({ "user_id": seller_id, "isbn": ISBN, "price": 50, "condition": "Good" }),
    )
    .await;
    assert_eq!(post["textbook"]["isbn"], ISBN);
    assert_eq!(post["user"]["id"], seller_id);
    assert_eq!(post["comments"], json!([]));
    let post_id = post["id"].as_u64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/users/{watcher_id}/watchlist"),
        Some(&watcher),
        Some(json!({ "post_id": post_id, "textbook_id": post["textbook"]["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/posts/{post_id}"),
        Some(&seller),
        Some(json!({ "price": 40 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 40.0);

    let (status, notifications) = send(
        &app,
        Method::GET,
        &format!("/users/{watcher_id}/notifications"),
        Some(&watcher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let message = notifications[0]["message"].as_str().unwrap();
    assert!(message.contains("Price dropped"));
    assert!(message.contains("$50.00"));
    assert!(message.contains("$40.00"));
    assert_eq!(notifications[0]["read"], false);

    let notification_id = notifications[0]["id"].as_u64().unwrap();
    let (status, marked) = send(
        &app,
        Method::PATCH,
        &format!("/notifications/{notification_id}"),
        Some(&watcher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["read"], true);

    // The seller may not read the watcher's notifications.
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/users/{watcher_id}/notifications"),
        Some(&seller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn geo_search_filters_by_radius() {
    let app = app();
    let (_, seller) = register(&app, "seller@school.edu").await;

    let near = create_post(
        &app,
        &seller,
        json!({ "isbn": ISBN, "price": 30, "condition": "Fair", "latitude": 10.0, "longitude": 10.0 }),
    )
    .await;
    // About 20 miles north.
    create_post(
        &app,
        &seller,
        json!({ "isbn": ISBN, "price": 20, "condition": "New", "latitude": 10.29, "longitude": 10.0 }),
    )
    .await;

    let (status, found) = send(&app, Method::GET, "/posts?lat=10&lng=10&radius=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], near["id"]);
    assert_eq!(found[0]["distance"], 0.0);

    let (_, everything) = send(&app, Method::GET, "/posts", None, None).await;
    assert_eq!(everything.as_array().unwrap().len(), 2);
    assert!(everything[0].get("distance").is_none());

    let (_, by_price) = send(&app, Method::GET, "/posts?sort=price", None, None).await;
    assert_eq!(by_price[0]["price"], 20.0);

    // Both listings sell the same book.
    assert_eq!(everything[0]["textbook"]["id"], everything[1]["textbook"]["id"]);

    let (status, _) = send(&app, Method::GET, "/posts?lat=10", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/signup",
        None,
        Some(json!({ "email": "someone@gmail.com", "name": "X", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains(".edu"));

    let (_, seller) = register(&app, "seller@school.edu").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/posts",
        Some(&seller),
        Some(json!({ "isbn": 12345, "price": 50, "condition": "Good" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/posts",
        None,
        Some(json!({ "isbn": ISBN, "price": 50, "condition": "Good" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn watchlist_and_delete_cascade() {
    let app = app();
    let (_, seller) = register(&app, "seller@school.edu").await;
    let (watcher_id, watcher) = register(&app, "watcher@school.edu").await;

    let post = create_post(
        &app,
        &seller,
        json!({ "isbn": ISBN, "price": 50, "condition": "Like New" }),
    )
    .await;
    assert_eq!(post["condition"], "Like New");
    let post_id = post["id"].as_u64().unwrap();
    let watch = json!({ "post_id": post_id, "textbook_id": post["textbook"]["id"] });
    let watchlist_uri = format!("/users/{watcher_id}/watchlist");

    let (status, _) = send(&app, Method::POST, &watchlist_uri, Some(&watcher), Some(watch.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, Method::POST, &watchlist_uri, Some(&watcher), Some(watch)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, comment) = send(
        &app,
        Method::POST,
        &format!("/posts/{post_id}/comments"),
        Some(&watcher),
        Some(json!({ "text": "Would you take 45?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["text"], "Would you take 45?");

    let comments_uri = format!("/posts/{post_id}/comments");
    let (status, comments) = send(&app, Method::GET, &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments, json!([comment]));

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/posts/{post_id}"),
        Some(&watcher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/posts/{post_id}"),
        Some(&seller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/posts/{post_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, watched) = send(&app, Method::GET, &watchlist_uri, Some(&watcher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(watched, json!([]));
}
