use thiserror::Error;

use super::bookmark::Bookmark;

// === StoreError ===

/// Errors raised by the local persisted stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("Store database error: {0}")]
    Database(String),
    /// A stored value could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

// === TokenError ===

/// Reasons a session token is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No token is persisted.
    #[error("No session token")]
    Missing,
    /// The token is not a three-segment token with a JSON payload.
    #[error("Malformed session token: {0}")]
    Malformed(String),
    /// The expiry claim is at or before the current time.
    #[error("Session token expired at {0}")]
    Expired(i64),
    /// The token's identity claim does not match the cached identity.
    #[error("Session token does not belong to user {0}")]
    IdentityMismatch(String),
}

// === GatewayError ===

/// Failures reported by a remote gateway call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Missing, invalid or expired credential (HTTP 401).
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// Authenticated but not allowed to touch the resource (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// Transport failure; no response was received.
    #[error("Network error: {0}")]
    Network(String),
    /// Malformed request (HTTP 400).
    #[error("Validation error: {0}")]
    Validation(String),
    /// The resource already exists (HTTP 409).
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        existing: Option<Box<Bookmark>>,
    },
    /// The resource does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),
    /// The gateway answered with an unexpected failure (HTTP 5xx or undecodable body).
    #[error("Server error: {0}")]
    Server(String),
}

impl GatewayError {
    /// Errors worth retrying unchanged on the next connectivity event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Network(_) | GatewayError::Server(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }
}

// === SyncError ===

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No authenticated identity is attached to the engine.
    #[error("No active session")]
    NoSession,
    /// The credential was rejected; queued data is kept.
    #[error("Sync authentication failed: {0}")]
    Auth(String),
    /// The gateway could not be reached; retried on the next trigger.
    #[error("Sync network error: {0}")]
    Network(String),
    /// The request can never succeed unmodified.
    #[error("Sync validation error: {0}")]
    Validation(String),
    /// The gateway refused access to the bookmark.
    #[error("Sync forbidden: {0}")]
    Forbidden(String),
    /// Local persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GatewayError> for SyncError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Auth(msg) => SyncError::Auth(msg),
            GatewayError::Network(msg) | GatewayError::Server(msg) => SyncError::Network(msg),
            GatewayError::Validation(msg) => SyncError::Validation(msg),
            GatewayError::Forbidden(msg) => SyncError::Forbidden(msg),
            GatewayError::Conflict { message, .. } => SyncError::Validation(message),
            GatewayError::NotFound(msg) => SyncError::Validation(msg),
        }
    }
}

// === AuthError ===

/// Errors from signup, login and profile operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was empty or a value is outside the allowed set.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// Signup with an email that is already registered.
    #[error("Email already registered: {0}")]
    EmailTaken(String),
    /// Login with an unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// The operation needs a valid session and there is none.
    #[error("Not signed in")]
    NotAuthenticated,
    /// The gateway refused the operation for this identity.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// The gateway returned a token that cannot be used.
    #[error("Invalid session token: {0}")]
    Token(#[from] TokenError),
    /// Any other gateway failure.
    #[error(transparent)]
    Gateway(GatewayError),
    /// Local persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GatewayError> for AuthError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Validation(msg) => AuthError::Validation(msg),
            GatewayError::Forbidden(msg) => AuthError::Forbidden(msg),
            GatewayError::Auth(_) => AuthError::NotAuthenticated,
            other => AuthError::Gateway(other),
        }
    }
}

// === SettingsError ===

/// Errors related to client configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing the config file.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize the config.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided key does not name a setting.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided value has the wrong type for the key.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}
