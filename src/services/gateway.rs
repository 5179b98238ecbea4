//! Ports to the remote bookmark and identity server.
//!
//! The server is the only source of truth for remote state. Every bookmark
//! call is scoped to the identity bound to `token`.

use async_trait::async_trait;

use crate::types::article::Article;
use crate::types::bookmark::Bookmark;
use crate::types::errors::GatewayError;
use crate::types::user::{AuthResponse, Avatar, LoginRequest, SignupRequest};

/// Remote bookmark operations.
#[async_trait]
pub trait BookmarkGateway: Send + Sync {
    /// Stores the article for the caller. A duplicate (same owner and URL)
    /// fails with [`GatewayError::Conflict`] carrying the existing copy when known.
    async fn create(&self, article: &Article, token: &str) -> Result<Bookmark, GatewayError>;

    /// Lists the caller's bookmarks.
    async fn list(&self, token: &str) -> Result<Vec<Bookmark>, GatewayError>;

    /// Deletes one of the caller's bookmarks by its server identifier.
    async fn delete(&self, bookmark_id: &str, token: &str) -> Result<(), GatewayError>;
}

/// Remote identity operations.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, GatewayError>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, GatewayError>;

    /// Changes the avatar of `user_id`, which must be the identity bound to `token`.
    async fn update_avatar(
        &self,
        user_id: &str,
        avatar: Avatar,
        token: &str,
    ) -> Result<Avatar, GatewayError>;
}
