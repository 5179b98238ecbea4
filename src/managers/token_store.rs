//! Token Store for Newsroom.
//!
//! Holds the session token and the identity it was issued for. Validation is
//! purely local: the payload's `exp` claim is compared with the clock. The
//! signature is never checked here; only the server holds the signing secret.

use std::sync::Arc;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, info, warn};

use crate::database::connection::Database;
use crate::types::errors::{StoreError, TokenError};
use crate::types::user::{Identity, TokenClaims};

/// Outcome of [`TokenStoreTrait::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidation {
    Valid { token: String, identity: Identity },
    Invalid(TokenError),
}

impl TokenValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenValidation::Valid { .. })
    }
}

/// Decodes the claims segment of a `header.payload.signature` token.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed("expected three segments".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("payload is not a claims object: {}", e)))
}

/// Trait defining token store operations.
pub trait TokenStoreTrait {
    fn validate(&self) -> Result<TokenValidation, StoreError>;
    fn set(&self, token: &str, identity: &Identity) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Token store backed by the single-row `auth_session` table.
pub struct TokenStore {
    db: Arc<Database>,
}

impl TokenStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Validates against an explicit clock reading.
    ///
    /// Anything other than a decodable, unexpired token whose `id` claim
    /// matches the cached identity is Invalid, and on Invalid both the token
    /// and the identity are purged.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<TokenValidation, StoreError> {
        let Some((token, user_json)) = self.read_row()? else {
            return Ok(TokenValidation::Invalid(TokenError::Missing));
        };

        let verdict = Self::check(&token, &user_json, now);
        match verdict {
            Ok(identity) => {
                debug!(user = %identity.id, "session token valid");
                Ok(TokenValidation::Valid { token, identity })
            }
            Err(reason) => {
                warn!(%reason, "session token invalid, clearing session");
                self.clear()?;
                Ok(TokenValidation::Invalid(reason))
            }
        }
    }

    fn check(token: &str, user_json: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let claims = decode_claims(token)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired(claims.exp));
        }
        let identity: Identity = serde_json::from_str(user_json)
            .map_err(|e| TokenError::Malformed(format!("cached identity unreadable: {}", e)))?;
        if let Some(id) = &claims.id {
            if *id != identity.id {
                return Err(TokenError::IdentityMismatch(identity.id));
            }
        }
        Ok(identity)
    }

    /// Returns the cached identity without validating the token.
    pub fn identity(&self) -> Result<Option<Identity>, StoreError> {
        match self.read_row()? {
            Some((_, user_json)) => Ok(Some(serde_json::from_str(&user_json)?)),
            None => Ok(None),
        }
    }

    /// Replaces the cached identity, keeping the token. Returns false when no session exists.
    pub fn update_identity(&self, identity: &Identity) -> Result<bool, StoreError> {
        let user_json = serde_json::to_string(identity)?;
        let affected = self.db.connection().execute(
            "UPDATE auth_session SET user_json = ?1, updated_at = ?2 WHERE id = 'default'",
            params![user_json, Utc::now().timestamp()],
        )?;
        Ok(affected > 0)
    }

    fn read_row(&self) -> Result<Option<(String, String)>, StoreError> {
        let conn = self.db.connection();
        let result = conn.query_row(
            "SELECT token, user_json FROM auth_session WHERE id = 'default'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );
        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl TokenStoreTrait for TokenStore {
    fn validate(&self) -> Result<TokenValidation, StoreError> {
        self.validate_at(Utc::now())
    }

    /// Persists token and identity in one row write.
    fn set(&self, token: &str, identity: &Identity) -> Result<(), StoreError> {
        let user_json = serde_json::to_string(identity)?;
        self.db.connection().execute(
            "INSERT OR REPLACE INTO auth_session (id, token, user_json, updated_at) VALUES ('default', ?1, ?2, ?3)",
            params![token, user_json, Utc::now().timestamp()],
        )?;
        info!(user = %identity.id, "session stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.db.connection().execute("DELETE FROM auth_session", [])?;
        Ok(())
    }
}
