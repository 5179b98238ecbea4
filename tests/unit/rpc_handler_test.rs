//! Unit tests for the RPC handler: JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests exercise the methods through the same code path used by the
//! `newsroom-rpc` binary, against the in-process gateway.

use std::sync::Arc;

use serde_json::{json, Value};

use newsroom::app::App;
use newsroom::rpc_handler::handle_method;
use newsroom::services::memory_gateway::MemoryGateway;

fn setup() -> (App, Arc<MemoryGateway>) {
    let gw = Arc::new(MemoryGateway::new());
    (App::in_memory(gw.clone()).expect("Failed to init App"), gw)
}

fn article(url: &str, title: &str) -> Value {
    json!({"article": {"url": url, "title": title, "source": {"name": "Wire"}}})
}

fn signup_params() -> Value {
    json!({"name": "Ada", "email": "ada@example.com", "password": "pw"})
}

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

#[tokio::test]
async fn test_profile_avatars_lists_enumeration() {
    let (app, _) = setup();
    let res = handle_method(&app, "profile.avatars", &json!({})).await.unwrap();
    let names = res.as_array().unwrap();
    assert_eq!(names.len(), 10);
    assert_eq!(names[0], "avatar1.png");
}

#[tokio::test]
async fn test_guest_bookmark_add_and_list() {
    let (app, _) = setup();
    let res = handle_method(&app, "bookmark.add", &article("https://x/a", "A")).await.unwrap();
    assert_eq!(res["status"]["state"], "pending");
    assert_eq!(res["bookmark"]["article"]["url"], "https://x/a");

    let list = handle_method(&app, "bookmark.list", &json!({})).await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    let saved = handle_method(&app, "bookmark.is_saved", &json!({"url": "https://x/a"})).await.unwrap();
    assert_eq!(saved, json!({"saved": true}));
}

#[tokio::test]
async fn test_bookmark_add_rejects_malformed_article() {
    let (app, _) = setup();
    let res = handle_method(&app, "bookmark.add", &json!({"article": {"title": "no url"}})).await;
    assert!(res.unwrap_err().contains("invalid article"));
}

#[tokio::test]
async fn test_signup_migrates_guest_bookmarks() {
    let (app, gw) = setup();
    handle_method(&app, "bookmark.add", &article("https://x/a", "A")).await.unwrap();

    let res = handle_method(&app, "auth.signup", &signup_params()).await.unwrap();
    assert_eq!(res["user"]["email"], "ada@example.com");
    assert_eq!(res["phase"], "synced");
    assert_eq!(gw.count_requests("POST /bookmarks"), 1);

    let list = handle_method(&app, "bookmark.list", &json!({"sort": "az"})).await.unwrap();
    assert_eq!(list[0]["status"]["state"], "confirmed");
}

#[tokio::test]
async fn test_signup_with_taken_email() {
    let (app, _) = setup();
    handle_method(&app, "auth.signup", &signup_params()).await.unwrap();
    handle_method(&app, "auth.logout", &json!({})).await.unwrap();

    let err = handle_method(&app, "auth.signup", &signup_params()).await.unwrap_err();
    assert!(err.contains("Email already registered"));
    let session = handle_method(&app, "auth.session", &json!({})).await.unwrap();
    assert_eq!(session["user"], Value::Null);
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let (app, _) = setup();
    handle_method(&app, "auth.signup", &signup_params()).await.unwrap();
    handle_method(&app, "auth.logout", &json!({})).await.unwrap();

    let err = handle_method(&app, "auth.login", &json!({"email": "ada@example.com", "password": "x"}))
        .await
        .unwrap_err();
    assert_eq!(err, "Invalid email or password");
}

#[tokio::test]
async fn test_profile_avatar_validation_and_session() {
    let (app, _) = setup();
    let err = handle_method(&app, "profile.avatar", &json!({"avatar": "avatar3.png"})).await.unwrap_err();
    assert_eq!(err, "Not signed in");

    handle_method(&app, "auth.signup", &signup_params()).await.unwrap();
    let err = handle_method(&app, "profile.avatar", &json!({"avatar": "evil.png"})).await.unwrap_err();
    assert!(err.contains("Invalid avatar"));

    let res = handle_method(&app, "profile.avatar", &json!({"avatar": "avatar3.png"})).await.unwrap();
    assert_eq!(res["avatar"], "avatar3.png");
}

#[tokio::test]
async fn test_sync_methods_in_guest_mode() {
    let (app, _) = setup();
    let status = handle_method(&app, "sync.status", &json!({})).await.unwrap();
    assert_eq!(status["phase"], "uninitialized");
    assert_eq!(status["pending"], 0);

    let reconnect = handle_method(&app, "sync.reconnect", &json!({})).await.unwrap();
    assert_eq!(reconnect["report"], Value::Null);
    assert!(handle_method(&app, "sync.flush", &json!({})).await.is_err());
}

#[tokio::test]
async fn test_offline_edit_then_reconnect() {
    let (app, gw) = setup();
    handle_method(&app, "auth.signup", &signup_params()).await.unwrap();
    gw.set_online(false);

    let res = handle_method(&app, "bookmark.add", &article("https://x/a", "A")).await.unwrap();
    assert_eq!(res["status"]["state"], "pending");
    let status = handle_method(&app, "sync.status", &json!({})).await.unwrap();
    assert_eq!(status["pending"], 1);

    gw.set_online(true);
    let res = handle_method(&app, "sync.reconnect", &json!({})).await.unwrap();
    assert_eq!(res["report"]["outcome"], "completed");
    assert_eq!(res["report"]["flush"]["outcome"], "drained");
    let status = handle_method(&app, "sync.status", &json!({})).await.unwrap();
    assert_eq!(status["pending"], 0);
}

#[tokio::test]
async fn test_bookmark_list_rejects_unknown_sort() {
    let (app, _) = setup();
    let err = handle_method(&app, "bookmark.list", &json!({"sort": "newest"})).await.unwrap_err();
    assert!(err.contains("Unknown sort order"));
}

#[tokio::test]
async fn test_bookmark_sources_and_remove() {
    let (app, _) = setup();
    handle_method(&app, "bookmark.add", &article("https://x/a", "A")).await.unwrap();
    let sources = handle_method(&app, "bookmark.sources", &json!({})).await.unwrap();
    assert_eq!(sources, json!(["Wire"]));

    let res = handle_method(&app, "bookmark.remove", &json!({"url": "https://x/a"})).await.unwrap();
    assert_eq!(res, json!({"removed": true}));
    let res = handle_method(&app, "bookmark.remove", &json!({})).await;
    assert_eq!(res.unwrap_err(), "missing url");
}

#[tokio::test]
async fn test_config_get_and_logout_phase() {
    let (app, _) = setup();
    let config = handle_method(&app, "config.get", &json!({})).await.unwrap();
    assert_eq!(config["request_timeout_secs"], 10);

    handle_method(&app, "auth.signup", &signup_params()).await.unwrap();
    handle_method(&app, "auth.logout", &json!({})).await.unwrap();
    let session = handle_method(&app, "auth.session", &json!({})).await.unwrap();
    assert_eq!(session["phase"], "logged_out");
}
