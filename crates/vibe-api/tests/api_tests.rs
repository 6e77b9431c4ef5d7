//! Integration tests for the HTTP API.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use vibe_api::storage::MediaStore;
use vibe_api::tokens::TokenIssuer;
use vibe_api::{AppStateInner, create_router};
use vibe_db::Database;
use vibe_sms::MemoryGateway;

struct TestApp {
    app: Router,
    sms: Arc<MemoryGateway>,
    _media: TempDir,
}

/// Create a test app with an in-memory database and a recording SMS gateway.
fn create_test_app() -> TestApp {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let sms = Arc::new(MemoryGateway::new());
    let tokens = TokenIssuer::new("test-secret", Duration::minutes(10), Duration::days(1));
    let media = tempfile::tempdir().unwrap();
    let state = AppStateInner::new(db, sms.clone(), tokens, MediaStore::new(media.path()));
    TestApp {
        app: create_router(state),
        sms,
        _media: media,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    fn last_code(&self, phone: &str) -> String {
        let message = self.sms.last_to(phone).expect("no SMS sent");
        message.chars().filter(|c| c.is_ascii_digit()).take(4).collect()
    }

    async fn register(&self, phone: &str, first_name: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            "/auth/v1/register",
            None,
            Some(json!({
                "phone_number": phone,
                "first_name": first_name,
                "password": "p@ss1234",
            })),
        )
        .await
    }

    /// Register and activate an account, returning `(id, access token)`.
    async fn active_user(&self, phone: &str, first_name: &str) -> (String, String) {
        let (status, _) = self.register(phone, first_name).await;
        assert_eq!(status, StatusCode::CREATED);
        let code = self.last_code(phone);
        let (status, json) = self
            .call(
                "POST",
                "/auth/v1/register/activate",
                None,
                Some(json!({ "phone_number": phone, "otp": code })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (
            json["id"].as_str().unwrap().to_string(),
            json["access"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let t = create_test_app();

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    assert_eq!(response.headers()[header::EXPIRES], "0");
}

#[tokio::test]
async fn test_register_then_activate() {
    let t = create_test_app();

    let (status, json) = t.register("0551234567", "Ama").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["is_active"], false);
    assert_eq!(json["username"], "0551234567");
    assert!(json["access"].as_str().is_some());
    assert!(json["refresh"].as_str().is_some());

    let code = t.last_code("0551234567");
    assert_eq!(code.len(), 4);

    let (status, json) = t
        .call(
            "POST",
            "/auth/v1/register/activate",
            None,
            Some(json!({ "phone_number": "0551234567", "otp": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_active"], true);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let t = create_test_app();

    assert_eq!(t.register("+233551234567", "Ama").await.0, StatusCode::CREATED);
    let (status, json) = t.register("+233551234567", "Kofi").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn test_register_validation() {
    let t = create_test_app();

    let (status, json) = t.register("05512", "Ama").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = t.register("0551234567", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(t.sms.sent().is_empty());
}

#[tokio::test]
async fn test_wrong_code_is_rejected() {
    let t = create_test_app();
    t.register("0551234567", "Ama").await;
    let code = t.last_code("0551234567");
    let wrong = if code == "0000" { "1111" } else { "0000" };

    let (status, json) = t
        .call(
            "POST",
            "/auth/v1/register/activate",
            None,
            Some(json!({ "phone_number": "0551234567", "otp": wrong })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = t
        .call(
            "POST",
            "/auth/v1/register/activate",
            None,
            Some(json!({ "phone_number": "0559999999", "otp": code })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resend_otp() {
    let t = create_test_app();

    let (status, _) = t
        .call(
            "POST",
            "/auth/v1/register/resend-otp",
            None,
            Some(json!({ "phone_number": "0551234567" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(t.sms.sent().is_empty());

    t.register("0551234567", "Ama").await;
    let first = t.last_code("0551234567");
    let (status, json) = t
        .call(
            "POST",
            "/auth/v1/register/resend-otp",
            None,
            Some(json!({ "phone_number": "0551234567" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["phone_number"], "0551234567");
    assert_eq!(t.sms.sent().len(), 2);
    assert_eq!(t.last_code("0551234567"), first);
}

#[tokio::test]
async fn test_whoami_requires_active_account() {
    let t = create_test_app();

    let (status, _) = t.call("GET", "/auth/v1/users/whoami", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, json) = t.register("0551234567", "Ama").await;
    let inactive_token = json["access"].as_str().unwrap().to_string();
    let (status, _) = t
        .call("GET", "/auth/v1/users/whoami", Some(&inactive_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.call("GET", "/auth/v1/users/whoami", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (id, token) = t.active_user("0201234567", "Kofi").await;
    let (status, json) = t.call("GET", "/auth/v1/users/whoami", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["first_name"], "Kofi");
}

#[tokio::test]
async fn test_login_and_refresh() {
    let t = create_test_app();
    t.register("0551234567", "Ama").await;

    let login = json!({ "phone_number": "0551234567", "password": "p@ss1234" });
    let (status, json) = t.call("POST", "/auth/v1/token", None, Some(login.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "The account is inactive. Please verify account.");

    let code = t.last_code("0551234567");
    t.call(
        "POST",
        "/auth/v1/register/activate",
        None,
        Some(json!({ "phone_number": "0551234567", "otp": code })),
    )
    .await;

    let (status, json) = t.call("POST", "/auth/v1/token", None, Some(login)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["last_login"].is_string());
    let refresh = json["refresh"].as_str().unwrap().to_string();

    let (status, json) = t
        .call("POST", "/auth/v1/token/refresh", None, Some(json!({ "refresh": refresh })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = json["access"].as_str().unwrap().to_string();
    assert_eq!(
        t.call("GET", "/auth/v1/users/whoami", Some(&access), None).await.0,
        StatusCode::OK
    );

    let (status, _) = t
        .call("POST", "/auth/v1/token/verify", None, Some(json!({ "token": "nope" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_follow_unfollow_refollow() {
    let t = create_test_app();
    let (ama, ama_token) = t.active_user("0551111111", "Ama").await;
    let (kofi, kofi_token) = t.active_user("0552222222", "Kofi").await;

    let follow = format!("/auth/v1/user-followership/{}/follow", ama);
    let unfollow = format!("/auth/v1/user-followership/{}/unfollow", ama);
    let followers = format!("/auth/v1/users/{}/followers", ama);

    let (status, json) = t.call("POST", &follow, Some(&kofi_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["follower"]["id"], kofi.as_str());
    let edge_id = json["id"].clone();

    let (_, list) = t.call("GET", &followers, None, None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    assert_eq!(t.call("POST", &unfollow, Some(&kofi_token), None).await.0, StatusCode::OK);
    let (_, list) = t.call("GET", &followers, None, None).await;
    assert!(list.as_array().unwrap().is_empty());
    assert_eq!(
        t.call("POST", &unfollow, Some(&kofi_token), None).await.0,
        StatusCode::NOT_FOUND
    );

    let (status, json) = t.call("POST", &follow, Some(&kofi_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], edge_id);

    let (_, following) = t
        .call("GET", &format!("/auth/v1/users/{}/following", kofi), None, None)
        .await;
    assert_eq!(following.as_array().unwrap().len(), 1);

    let self_follow = format!("/auth/v1/user-followership/{}/follow", ama);
    assert_eq!(
        t.call("POST", &self_follow, Some(&ama_token), None).await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_posts_likes_and_comments() {
    let t = create_test_app();
    let (ama, ama_token) = t.active_user("0551111111", "Ama").await;
    let (_, kofi_token) = t.active_user("0552222222", "Kofi").await;

    let (status, _) = t
        .call("POST", "/post/v1/posts", Some(&ama_token), Some(json!({ "post_type": "TextPost" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, post) = t
        .call("POST", "/post/v1/posts", Some(&ama_token), Some(json!({ "text": "hello vibe" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["user"], ama.as_str());
    assert_eq!(post["post_type"], "TextPost");
    let post_id = post["id"].as_str().unwrap().to_string();

    let (status, liked) = t
        .call("POST", &format!("/post/v1/posts/{}/like", post_id), Some(&kofi_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["liked"], true);
    assert_eq!(liked["likes_count"], 1);

    let (status, comment) = t
        .call(
            "POST",
            "/post/v1/post-comments",
            Some(&kofi_token),
            Some(json!({ "post": post_id, "comment": "nice one" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = comment["id"].as_str().unwrap().to_string();

    let (status, reply) = t
        .call(
            "POST",
            "/post/v1/post-comments",
            Some(&ama_token),
            Some(json!({ "post": post_id, "comment": "thanks", "parent": comment_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["parent"], comment_id.as_str());

    let (_, top_level) = t
        .call(
            "GET",
            &format!("/post/v1/post-comments?post={}&null_parent=true", post_id),
            Some(&ama_token),
            None,
        )
        .await;
    let top_level = top_level.as_array().unwrap();
    assert_eq!(top_level.len(), 1);
    assert_eq!(top_level[0]["replies_count"], 1);

    let (_, feed) = t
        .call("GET", &format!("/post/v1/posts?user={}", ama), Some(&ama_token), None)
        .await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["comment_count"], 2);
    assert_eq!(feed[0]["liked"], false);

    let (status, _) = t
        .call(
            "PATCH",
            &format!("/post/v1/post-comments/{}", comment_id),
            Some(&ama_token),
            Some(json!({ "comment": "hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .call("DELETE", &format!("/post/v1/posts/{}", post_id), Some(&kofi_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_share_nests_original() {
    let t = create_test_app();
    let (_, ama_token) = t.active_user("0551111111", "Ama").await;
    let (_, kofi_token) = t.active_user("0552222222", "Kofi").await;

    let (_, post) = t
        .call("POST", "/post/v1/posts", Some(&ama_token), Some(json!({ "text": "original" })))
        .await;
    let post_id = post["id"].as_str().unwrap().to_string();

    let (status, shared) = t
        .call(
            "POST",
            &format!("/post/v1/posts/{}/share", post_id),
            Some(&kofi_token),
            Some(json!({ "text": "look at this" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shared["shared_from"]["id"], post_id.as_str());
    assert_eq!(shared["shared_from"]["text"], "original");

    let (_, original) = t
        .call("GET", &format!("/post/v1/posts/{}", post_id), Some(&ama_token), None)
        .await;
    assert_eq!(original["shares_count"], 1);
}

#[tokio::test]
async fn test_groups_and_communities() {
    let t = create_test_app();
    let (_, ama_token) = t.active_user("0551111111", "Ama").await;
    let (kofi, kofi_token) = t.active_user("0552222222", "Kofi").await;

    let (status, group) = t
        .call("POST", "/community/v1/groups", Some(&ama_token), Some(json!({ "name": "Runners" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_str().unwrap().to_string();
    assert_eq!(group["members"].as_array().unwrap().len(), 1);

    let add = format!("/community/v1/groups/{}/add-members", group_id);
    let (status, _) = t
        .call("POST", &add, Some(&kofi_token), Some(json!({ "members": [kofi] })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, group) = t
        .call("POST", &add, Some(&ama_token), Some(json!({ "members": [kofi] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group["members"].as_array().unwrap().len(), 2);

    let (_, groups) = t.call("GET", "/community/v1/groups", Some(&kofi_token), None).await;
    assert_eq!(groups.as_array().unwrap().len(), 1);

    let (status, community) = t
        .call(
            "POST",
            "/community/v1/communities",
            Some(&ama_token),
            Some(json!({ "name": "Accra" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(community["announcement"]["name"], "Announcements");
    let community_id = community["id"].as_str().unwrap().to_string();
    let announcement_id = community["announcement"]["id"].as_str().unwrap().to_string();

    let (status, community) = t
        .call(
            "POST",
            &format!("/community/v1/communities/{}/add-groups", community_id),
            Some(&ama_token),
            Some(json!({ "groups": [group_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(community["groups"].as_array().unwrap().len(), 1);

    let (_, communities) = t.call("GET", "/community/v1/communities", Some(&kofi_token), None).await;
    assert_eq!(communities.as_array().unwrap().len(), 1);

    let (status, _) = t
        .call(
            "POST",
            "/post/v1/posts",
            Some(&kofi_token),
            Some(json!({ "text": "hi all", "announcement": announcement_id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, post) = t
        .call(
            "POST",
            "/post/v1/posts",
            Some(&kofi_token),
            Some(json!({ "text": "group run at six", "group": group_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["group"], group_id.as_str());
}

#[tokio::test]
async fn test_picture_upload() {
    let t = create_test_app();
    let (_, ama_token) = t.active_user("0551111111", "Ama").await;
    let (_, kofi_token) = t.active_user("0552222222", "Kofi").await;

    let (_, post) = t
        .call("POST", "/post/v1/posts", Some(&ama_token), Some(json!({ "post_type": "VisualPost" })))
        .await;
    let post_id = post["id"].as_str().unwrap().to_string();
    let uri = format!("/post/v1/posts/{}/pictures", post_id);

    let upload = |token: &str| {
        Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(vec![0x89, b'P', b'N', b'G']))
            .unwrap()
    };

    let (status, _) = t.send(upload(&kofi_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, picture) = t.send(upload(&ama_token)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(picture["image"].as_str().unwrap().starts_with("/media/post_pictures/"));

    let (_, post) = t
        .call("GET", &format!("/post/v1/posts/{}", post_id), Some(&ama_token), None)
        .await;
    assert_eq!(post["pictures"].as_array().unwrap().len(), 1);

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(picture["image"].as_str().unwrap())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
}

#[tokio::test]
async fn test_feed_pages_with_post_cursor() {
    let t = create_test_app();
    let (ama, token) = t.active_user("0551111111", "Ama").await;

    for text in ["one", "two", "three"] {
        let (status, _) = t
            .call("POST", "/post/v1/posts", Some(&token), Some(json!({ "text": text })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, first) = t
        .call("GET", &format!("/post/v1/posts?user={}&limit=2", ama), Some(&token), None)
        .await;
    let first = first.as_array().unwrap().clone();
    assert_eq!(first.len(), 2);

    let last = first[1]["id"].as_str().unwrap();
    let (_, second) = t
        .call(
            "GET",
            &format!("/post/v1/posts?user={}&limit=2&before={}", ama, last),
            Some(&token),
            None,
        )
        .await;
    let second = second.as_array().unwrap();
    assert_eq!(second.len(), 1);

    let mut seen: Vec<&str> = first
        .iter()
        .chain(second.iter())
        .map(|p| p["text"].as_str().unwrap())
        .collect();
    seen.sort();
    assert_eq!(seen, ["one", "three", "two"]);

    let (status, _) = t
        .call(
            "GET",
            &format!("/post/v1/posts?before={}", uuid::Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
