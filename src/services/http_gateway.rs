//! Reqwest-backed gateway to the bookmark and identity server.
//!
//! This adapter owns transport details only: URL building, the bearer
//! header, timeouts, and mapping HTTP statuses onto [`GatewayError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::services::gateway::{AuthGateway, BookmarkGateway};
use crate::types::article::Article;
use crate::types::bookmark::Bookmark;
use crate::types::errors::GatewayError;
use crate::types::settings::ClientConfig;
use crate::types::user::{AuthResponse, Avatar, LoginRequest, SignupRequest};

const USER_AGENT: &str = concat!("newsroom/", env!("CARGO_PKG_VERSION"));

/// Error body shape shared by every endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    bookmark: Option<Bookmark>,
}

#[derive(Debug, Deserialize)]
struct AvatarBody {
    avatar: Avatar,
}

/// HTTP gateway for one server base URL.
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    /// Builds a gateway with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for an unparseable base URL and
    /// [`GatewayError::Network`] when the client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| GatewayError::Validation(format!("invalid base url {}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, GatewayError> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> Result<RequestBuilder, GatewayError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| GatewayError::Validation(format!("invalid path {}: {}", path, e)))?;
        debug!(%method, %url, "gateway request");
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(map_status_error(status, body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Server(format!("undecodable response body: {}", e)))
    }
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    GatewayError::Network(error.to_string())
}

fn map_status_error(status: StatusCode, body: ErrorBody) -> GatewayError {
    let message = body
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    match status {
        StatusCode::BAD_REQUEST => GatewayError::Validation(message),
        StatusCode::UNAUTHORIZED => GatewayError::Auth(message),
        StatusCode::FORBIDDEN if message == "missing token" => GatewayError::Auth(message),
        StatusCode::FORBIDDEN => GatewayError::Forbidden(message),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        StatusCode::CONFLICT => GatewayError::Conflict {
            message,
            existing: body.bookmark.map(Box::new),
        },
        _ => GatewayError::Server(format!("HTTP {}: {}", status.as_u16(), message)),
    }
}

#[async_trait]
impl BookmarkGateway for HttpGateway {
    async fn create(&self, article: &Article, token: &str) -> Result<Bookmark, GatewayError> {
        let builder = self
            .request(Method::POST, "bookmarks", Some(token))?
            .json(&json!({ "article": article }));
        Self::decode(Self::send(builder).await?).await
    }

    async fn list(&self, token: &str) -> Result<Vec<Bookmark>, GatewayError> {
        let builder = self.request(Method::GET, "bookmarks", Some(token))?;
        Self::decode(Self::send(builder).await?).await
    }

    async fn delete(&self, bookmark_id: &str, token: &str) -> Result<(), GatewayError> {
        let builder = self.request(Method::DELETE, &format!("bookmarks/{}", bookmark_id), Some(token))?;
        Self::send(builder).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, GatewayError> {
        let builder = self.request(Method::POST, "signup", None)?.json(request);
        Self::decode(Self::send(builder).await?).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, GatewayError> {
        let builder = self.request(Method::POST, "login", None)?.json(request);
        Self::decode(Self::send(builder).await?).await
    }

    async fn update_avatar(
        &self,
        user_id: &str,
        avatar: Avatar,
        token: &str,
    ) -> Result<Avatar, GatewayError> {
        let builder = self
            .request(Method::PATCH, &format!("users/{}/avatar", user_id), Some(token))?
            .json(&json!({ "avatar": avatar }));
        let body: AvatarBody = Self::decode(Self::send(builder).await?).await?;
        Ok(body.avatar)
    }
}
