//! Unit tests for the in-process MemoryGateway.

use chrono::{Duration, Utc};

use newsroom::managers::token_store::decode_claims;
use newsroom::services::gateway::{AuthGateway, BookmarkGateway};
use newsroom::services::memory_gateway::{MemoryGateway, TOKEN_TTL_SECS};
use newsroom::types::article::Article;
use newsroom::types::errors::GatewayError;
use newsroom::types::user::{Avatar, LoginRequest, SignupRequest};

async fn sign_up(gw: &MemoryGateway, email: &str) -> (String, String) {
    let response = gw
        .signup(&SignupRequest {
            name: "Ada".into(),
            email: email.into(),
            password: "pw".into(),
        })
        .await
        .unwrap();
    let id = decode_claims(&response.token).unwrap().id.unwrap();
    (id, response.token.clone())
}

#[tokio::test]
async fn test_issued_token_expires_after_seven_days() {
    let gw = MemoryGateway::new();
    let (_, token) = sign_up(&gw, "ada@example.com").await;
    let claims = decode_claims(&token).unwrap();
    assert_eq!(claims.exp - claims.iat.unwrap(), TOKEN_TTL_SECS);
    assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn test_signup_duplicate_email_conflicts() {
    let gw = MemoryGateway::new();
    sign_up(&gw, "ada@example.com").await;
    let err = gw
        .signup(&SignupRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "x".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Conflict { existing: None, .. }));
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let gw = MemoryGateway::new();
    sign_up(&gw, "ada@example.com").await;
    let err = gw
        .login(&LoginRequest {
            email: "ada@example.com".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_missing_and_expired_tokens_are_auth_errors() {
    let gw = MemoryGateway::new();
    let (id, _) = sign_up(&gw, "ada@example.com").await;
    assert_eq!(gw.list("").await.unwrap_err(), GatewayError::Auth("missing token".into()));

    let expired = gw.issue_token(&id, "ada@example.com", Utc::now() - Duration::days(8));
    assert!(gw.list(&expired).await.unwrap_err().is_auth());

    let foreign = MemoryGateway::new().issue_token(&id, "ada@example.com", Utc::now());
    assert!(gw.list(&foreign).await.unwrap_err().is_auth(), "signature is verified");
}

#[tokio::test]
async fn test_create_conflict_carries_existing_bookmark() {
    let gw = MemoryGateway::new();
    let (_, token) = sign_up(&gw, "ada@example.com").await;
    let article = Article::new("https://x/a", "A", "Wire");
    let first = gw.create(&article, &token).await.unwrap();

    match gw.create(&article, &token).await.unwrap_err() {
        GatewayError::Conflict { existing, .. } => assert_eq!(existing.map(|b| *b), Some(first)),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_without_url_is_validation() {
    let gw = MemoryGateway::new();
    let (_, token) = sign_up(&gw, "ada@example.com").await;
    let err = gw.create(&Article::new("", "A", "Wire"), &token).await.unwrap_err();
    assert_eq!(err, GatewayError::Validation("Missing article".into()));
}

#[tokio::test]
async fn test_bookmarks_are_scoped_per_user() {
    let gw = MemoryGateway::new();
    let (_, token_a) = sign_up(&gw, "a@example.com").await;
    let (_, token_b) = sign_up(&gw, "b@example.com").await;
    let article = Article::new("https://x/a", "A", "Wire");

    let theirs = gw.create(&article, &token_a).await.unwrap();
    gw.create(&article, &token_b).await.unwrap();
    assert_eq!(gw.list(&token_a).await.unwrap().len(), 1);

    let err = gw.delete(&theirs.id, &token_b).await.unwrap_err();
    assert!(matches!(err, GatewayError::Forbidden(_)));
    let err = gw.delete("missing", &token_b).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
}

#[tokio::test]
async fn test_offline_calls_fail_without_reaching_server() {
    let gw = MemoryGateway::new();
    let (_, token) = sign_up(&gw, "ada@example.com").await;
    gw.clear_requests();
    gw.set_online(false);

    assert!(gw.list(&token).await.unwrap_err().is_retryable());
    assert!(gw.requests().is_empty());
}

#[tokio::test]
async fn test_update_avatar_checks_owner() {
    let gw = MemoryGateway::new();
    let (id_a, token_a) = sign_up(&gw, "a@example.com").await;
    let (_, token_b) = sign_up(&gw, "b@example.com").await;

    assert_eq!(gw.update_avatar(&id_a, Avatar::Avatar4, &token_a).await.unwrap(), Avatar::Avatar4);
    let err = gw.update_avatar(&id_a, Avatar::Avatar5, &token_b).await.unwrap_err();
    assert!(matches!(err, GatewayError::Forbidden(_)));
    assert_eq!(gw.count_requests("PATCH /users/"), 2);
}
