//! Unit tests for the Newsroom error taxonomy.
//!
//! Checks the user-visible Display text and the conversions between layers.

use newsroom::services::auth_service::parse_avatar;
use newsroom::types::article::Article;
use newsroom::types::bookmark::Bookmark;
use newsroom::types::errors::{AuthError, GatewayError, StoreError, SyncError, TokenError};
use newsroom::types::user::{Avatar, UnknownAvatar};
use rstest::rstest;

#[test]
fn test_store_error_from_rusqlite() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::Database(_)));
    assert!(err.to_string().starts_with("Store database error"));
}

#[test]
fn test_store_error_from_serde() {
    let parse = serde_json::from_str::<Article>("not json").unwrap_err();
    let err: StoreError = parse.into();
    assert!(matches!(err, StoreError::Serialization(_)));
}

#[rstest]
#[case(GatewayError::Network("down".into()), true)]
#[case(GatewayError::Server("HTTP 502".into()), true)]
#[case(GatewayError::Auth("expired".into()), false)]
#[case(GatewayError::Validation("Missing article".into()), false)]
#[case(GatewayError::NotFound("Not found".into()), false)]
#[case(GatewayError::Forbidden("Forbidden".into()), false)]
fn test_gateway_error_retryable(#[case] err: GatewayError, #[case] retryable: bool) {
    assert_eq!(err.is_retryable(), retryable);
}

#[test]
fn test_gateway_error_display() {
    assert_eq!(GatewayError::Network("timeout".into()).to_string(), "Network error: timeout");
    let conflict = GatewayError::Conflict {
        message: "Already bookmarked".into(),
        existing: Some(Box::new(Bookmark::guest(Article::new("https://x/a", "A", "S")))),
    };
    assert_eq!(conflict.to_string(), "Conflict: Already bookmarked");
}

#[rstest]
#[case(GatewayError::Auth("x".into()), "auth")]
#[case(GatewayError::Network("x".into()), "network")]
#[case(GatewayError::Server("x".into()), "network")]
#[case(GatewayError::Validation("x".into()), "validation")]
#[case(GatewayError::NotFound("x".into()), "validation")]
#[case(GatewayError::Forbidden("x".into()), "forbidden")]
fn test_sync_error_from_gateway(#[case] err: GatewayError, #[case] expected: &str) {
    let kind = match SyncError::from(err) {
        SyncError::Auth(_) => "auth",
        SyncError::Network(_) => "network",
        SyncError::Validation(_) => "validation",
        SyncError::Forbidden(_) => "forbidden",
        SyncError::NoSession => "no_session",
        SyncError::Store(_) => "store",
    };
    assert_eq!(kind, expected);
}

#[test]
fn test_auth_error_from_gateway() {
    assert!(matches!(AuthError::from(GatewayError::Auth("x".into())), AuthError::NotAuthenticated));
    assert!(matches!(AuthError::from(GatewayError::Validation("x".into())), AuthError::Validation(_)));
    assert!(matches!(AuthError::from(GatewayError::Forbidden("x".into())), AuthError::Forbidden(_)));
    assert!(matches!(AuthError::from(GatewayError::Network("x".into())), AuthError::Gateway(_)));
}

#[test]
fn test_auth_error_display() {
    assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid email or password");
    assert_eq!(AuthError::NotAuthenticated.to_string(), "Not signed in");
    assert_eq!(
        AuthError::EmailTaken("a@b.c".into()).to_string(),
        "Email already registered: a@b.c"
    );
    assert_eq!(
        AuthError::from(TokenError::Missing).to_string(),
        "Invalid session token: No session token"
    );
}

#[test]
fn test_unknown_avatar_is_a_std_error() {
    let err = "avatar0.png".parse::<Avatar>().unwrap_err();
    assert_eq!(err, UnknownAvatar("avatar0.png".into()));
    let boxed: Box<dyn std::error::Error> = Box::new(err);
    assert_eq!(boxed.to_string(), "Invalid avatar: avatar0.png");
    assert_eq!(
        parse_avatar("avatar0.png").unwrap_err().to_string(),
        "Invalid input: Invalid avatar: avatar0.png"
    );
}
