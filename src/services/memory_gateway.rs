//! In-process gateway with the same semantics as the REST server.
//!
//! Users are keyed by email, tokens are HS256-signed with a per-instance
//! secret and expire seven days after issuance, and bookmarks are unique per
//! (owner, URL). An `online` switch turns every call into a transport
//! failure, and every call that reaches the "server" is recorded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, hmac};
use tracing::debug;
use uuid::Uuid;

use crate::managers::token_store::decode_claims;
use crate::services::gateway::{AuthGateway, BookmarkGateway};
use crate::types::article::Article;
use crate::types::bookmark::Bookmark;
use crate::types::errors::GatewayError;
use crate::types::user::{AuthResponse, Avatar, LoginRequest, SignupRequest, TokenClaims};

/// Lifetime of an issued token.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

struct StoredUser {
    id: String,
    name: String,
    email: String,
    password_hash: Vec<u8>,
    avatar: Option<Avatar>,
}

#[derive(Default)]
struct ServerState {
    users: Vec<StoredUser>,
    bookmarks: Vec<Bookmark>,
    requests: Vec<String>,
}

/// Gateway that keeps users and bookmarks in memory.
pub struct MemoryGateway {
    key: hmac::Key,
    rng: SystemRandom,
    online: AtomicBool,
    state: Mutex<ServerState>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// Creates a gateway with a random signing secret.
    pub fn new() -> Self {
        let rng = SystemRandom::new();
        let mut secret = [0u8; 32];
        if rng.fill(&mut secret).is_err() {
            secret.copy_from_slice(Uuid::new_v4().as_bytes().repeat(2).as_slice());
        }
        Self::with_secret(&secret)
    }

    pub fn with_secret(secret: &[u8]) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            rng: SystemRandom::new(),
            online: AtomicBool::new(true),
            state: Mutex::new(ServerState::default()),
        }
    }

    /// Simulates losing (`false`) or regaining (`true`) connectivity.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Every request that reached the server, e.g. `POST /bookmarks https://x/a`.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Number of recorded requests starting with `prefix`.
    pub fn count_requests(&self, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Server-side bookmarks of one user, in creation order.
    pub fn stored_bookmarks(&self, user_id: &str) -> Vec<Bookmark> {
        self.lock()
            .bookmarks
            .iter()
            .filter(|b| b.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect()
    }

    /// Signs a token for `user_id` as if issued at `issued_at`.
    pub fn issue_token(&self, user_id: &str, email: &str, issued_at: DateTime<Utc>) -> String {
        let claims = TokenClaims {
            id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            iat: Some(issued_at.timestamp()),
            exp: issued_at.timestamp() + TOKEN_TTL_SECS,
        };
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(TOKEN_HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let tag = hmac::sign(&self.key, signing_input.as_bytes());
        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(tag.as_ref()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn ensure_online(&self) -> Result<(), GatewayError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(GatewayError::Network("gateway unreachable".to_string()))
        }
    }

    /// Verifies signature and expiry; returns the user id bound to the token.
    fn authorize(&self, token: &str) -> Result<String, GatewayError> {
        if token.is_empty() {
            return Err(GatewayError::Auth("missing token".to_string()));
        }
        let invalid = || GatewayError::Auth("Invalid or expired token".to_string());
        let (signing_input, signature) = token.rsplit_once('.').ok_or_else(invalid)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| invalid())?;
        hmac::verify(&self.key, signing_input.as_bytes(), &signature).map_err(|_| invalid())?;
        let claims = decode_claims(token).map_err(|_| invalid())?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(invalid());
        }
        claims.id.ok_or_else(invalid)
    }

    fn hash_password(email: &str, password: &str) -> Vec<u8> {
        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(email.as_bytes());
        ctx.update(b":");
        ctx.update(password.as_bytes());
        ctx.finish().as_ref().to_vec()
    }

    fn random_avatar(&self) -> Avatar {
        let mut byte = [0u8; 1];
        let index = match self.rng.fill(&mut byte) {
            Ok(()) => byte[0] as usize % Avatar::ALL.len(),
            Err(_) => 0,
        };
        Avatar::ALL[index]
    }

    fn record(state: &mut ServerState, request: String) {
        debug!(%request, "memory gateway request");
        state.requests.push(request);
    }
}

#[async_trait]
impl BookmarkGateway for MemoryGateway {
    async fn create(&self, article: &Article, token: &str) -> Result<Bookmark, GatewayError> {
        self.ensure_online()?;
        let mut state = self.lock();
        Self::record(&mut state, format!("POST /bookmarks {}", article.url));
        let user_id = self.authorize(token)?;

        if !article.has_url() {
            return Err(GatewayError::Validation("Missing article".to_string()));
        }
        if let Some(existing) = state
            .bookmarks
            .iter()
            .find(|b| b.user_id.as_deref() == Some(user_id.as_str()) && b.article.url == article.url)
        {
            return Err(GatewayError::Conflict {
                message: "Already bookmarked".to_string(),
                existing: Some(Box::new(existing.clone())),
            });
        }

        let saved = Bookmark {
            id: Uuid::new_v4().to_string(),
            user_id: Some(user_id),
            article: article.clone(),
            saved_at: Utc::now(),
        };
        state.bookmarks.push(saved.clone());
        Ok(saved)
    }

    async fn list(&self, token: &str) -> Result<Vec<Bookmark>, GatewayError> {
        self.ensure_online()?;
        let mut state = self.lock();
        Self::record(&mut state, "GET /bookmarks".to_string());
        let user_id = self.authorize(token)?;
        Ok(state
            .bookmarks
            .iter()
            .filter(|b| b.user_id.as_deref() == Some(user_id.as_str()))
            .cloned()
            .collect())
    }

    async fn delete(&self, bookmark_id: &str, token: &str) -> Result<(), GatewayError> {
        self.ensure_online()?;
        let mut state = self.lock();
        Self::record(&mut state, format!("DELETE /bookmarks/{}", bookmark_id));
        let user_id = self.authorize(token)?;

        let index = state
            .bookmarks
            .iter()
            .position(|b| b.id == bookmark_id)
            .ok_or_else(|| GatewayError::NotFound("Not found".to_string()))?;
        if state.bookmarks[index].user_id.as_deref() != Some(user_id.as_str()) {
            return Err(GatewayError::Forbidden("Forbidden".to_string()));
        }
        state.bookmarks.remove(index);
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for MemoryGateway {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, GatewayError> {
        self.ensure_online()?;
        let mut state = self.lock();
        Self::record(&mut state, "POST /signup".to_string());

        if request.name.is_empty() || request.email.is_empty() || request.password.is_empty() {
            return Err(GatewayError::Validation("All fields are required".to_string()));
        }
        if state.users.iter().any(|u| u.email == request.email) {
            return Err(GatewayError::Conflict {
                message: "User already registered".to_string(),
                existing: None,
            });
        }

        let user = StoredUser {
            id: Uuid::new_v4().to_string(),
            name: request.name.clone(),
            email: request.email.clone(),
            password_hash: Self::hash_password(&request.email, &request.password),
            avatar: Some(self.random_avatar()),
        };
        let token = self.issue_token(&user.id, &user.email, Utc::now());
        let response = AuthResponse {
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar,
            token,
        };
        state.users.push(user);
        Ok(response)
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, GatewayError> {
        self.ensure_online()?;
        let mut state = self.lock();
        Self::record(&mut state, "POST /login".to_string());

        if request.email.is_empty() || request.password.is_empty() {
            return Err(GatewayError::Validation("All fields are required".to_string()));
        }
        let hash = Self::hash_password(&request.email, &request.password);
        let avatar_if_missing = self.random_avatar();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.email == request.email && u.password_hash == hash)
            .ok_or_else(|| GatewayError::Auth("Invalid email or password".to_string()))?;

        let avatar = *user.avatar.get_or_insert(avatar_if_missing);
        Ok(AuthResponse {
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: Some(avatar),
            token: self.issue_token(&user.id, &user.email, Utc::now()),
        })
    }

    async fn update_avatar(
        &self,
        user_id: &str,
        avatar: Avatar,
        token: &str,
    ) -> Result<Avatar, GatewayError> {
        self.ensure_online()?;
        let mut state = self.lock();
        Self::record(&mut state, format!("PATCH /users/{}/avatar", user_id));
        let caller = self.authorize(token)?;

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| GatewayError::NotFound("User not found".to_string()))?;
        if user.id != caller {
            return Err(GatewayError::Forbidden("Forbidden".to_string()));
        }
        user.avatar = Some(avatar);
        Ok(avatar)
    }
}
