//! Authentication flows for Newsroom.
//!
//! Signup, login, logout and avatar changes. A successful signup or login
//! stores the token and the identity together; the identity id is read from
//! the token's `id` claim because the auth responses do not carry it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::managers::token_store::{decode_claims, TokenStore, TokenStoreTrait, TokenValidation};
use crate::services::gateway::AuthGateway;
use crate::types::errors::{AuthError, GatewayError, TokenError};
use crate::types::user::{AuthResponse, Avatar, Identity, LoginRequest, SignupRequest};

/// A signed-in identity and the credential it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub identity: Identity,
    pub token: String,
}

/// Identity flows against an [`AuthGateway`], persisting into the token store.
pub struct AuthService {
    gateway: Arc<dyn AuthGateway>,
    tokens: Arc<TokenStore>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn AuthGateway>, tokens: Arc<TokenStore>) -> Self {
        Self { gateway, tokens }
    }

    /// Registers a new account and signs it in.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when a field is empty (checked before any
    /// request), [`AuthError::EmailTaken`] when the email is registered. No
    /// token is stored on failure.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthSession, AuthError> {
        if [&request.name, &request.email, &request.password]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }

        let response = match self.gateway.signup(&request).await {
            Ok(response) => response,
            Err(GatewayError::Conflict { .. }) => {
                warn!(email = %request.email, "signup rejected, email already registered");
                return Err(AuthError::EmailTaken(request.email.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        self.establish(response)
    }

    /// Signs in with existing credentials.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, AuthError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }

        let response = match self.gateway.login(&request).await {
            Ok(response) => response,
            Err(GatewayError::Auth(_)) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };
        self.establish(response)
    }

    fn establish(&self, response: AuthResponse) -> Result<AuthSession, AuthError> {
        let claims = decode_claims(&response.token)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired(claims.exp).into());
        }
        let id = claims
            .id
            .ok_or_else(|| TokenError::Malformed("token carries no id claim".to_string()))?;

        let identity = Identity {
            id,
            name: response.name,
            email: response.email,
            avatar: response.avatar,
        };
        self.tokens.set(&response.token, &identity)?;
        info!(user = %identity.id, "signed in");
        Ok(AuthSession {
            identity,
            token: response.token,
        })
    }

    /// Forgets the stored credential and identity.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.tokens.clear()?;
        info!("signed out");
        Ok(())
    }

    /// Returns the persisted session if its token is still valid.
    pub fn restore_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(match self.tokens.validate()? {
            TokenValidation::Valid { token, identity } => Some(AuthSession { identity, token }),
            TokenValidation::Invalid(_) => None,
        })
    }

    /// Changes the signed-in user's avatar and caches the result.
    ///
    /// A rejected credential clears the session and yields
    /// [`AuthError::NotAuthenticated`].
    pub async fn update_avatar(&self, avatar: Avatar) -> Result<Identity, AuthError> {
        let TokenValidation::Valid { token, mut identity } = self.tokens.validate()? else {
            return Err(AuthError::NotAuthenticated);
        };

        let applied = match self.gateway.update_avatar(&identity.id, avatar, &token).await {
            Ok(applied) => applied,
            Err(GatewayError::Auth(msg)) => {
                warn!(user = %identity.id, %msg, "avatar update rejected, clearing session");
                self.tokens.clear()?;
                return Err(AuthError::NotAuthenticated);
            }
            Err(e) => return Err(e.into()),
        };

        identity.avatar = Some(applied);
        self.tokens.update_identity(&identity)?;
        info!(user = %identity.id, avatar = %applied, "avatar updated");
        Ok(identity)
    }
}

/// Parses an avatar file name from user input.
pub fn parse_avatar(name: &str) -> Result<Avatar, AuthError> {
    name.parse()
        .map_err(|e: crate::types::user::UnknownAvatar| AuthError::Validation(e.to_string()))
}
