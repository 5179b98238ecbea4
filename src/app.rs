//! App Core for Newsroom.
//!
//! Central struct owning every store and service. Nothing here is global:
//! binaries and tests construct one `App` and pass it by reference.

use std::sync::Arc;

use tracing::{info, warn};

use crate::database::connection::Database;
use crate::managers::guest_bookmarks::{GuestBookmarkStore, GuestBookmarkStoreTrait};
use crate::managers::pending_queue::PendingQueue;
use crate::managers::token_store::{TokenStore, TokenStoreTrait};
use crate::services::auth_service::AuthService;
use crate::services::gateway::{AuthGateway, BookmarkGateway};
use crate::services::reconciliation::ReconciliationEngine;
use crate::services::saved_view::{self, SavedQuery};
use crate::types::article::Article;
use crate::types::errors::{AuthError, StoreError, SyncError};
use crate::types::pending::FlushReport;
use crate::types::settings::ClientConfig;
use crate::types::sync::{SyncPhase, SyncReport, TrackedBookmark};
use crate::types::user::{Avatar, Identity, LoginRequest, SignupRequest};

/// Central application struct holding all stores and services.
pub struct App {
    pub config: ClientConfig,
    pub db: Arc<Database>,
    pub tokens: Arc<TokenStore>,
    pub guests: Arc<GuestBookmarkStore>,
    pub queue: Arc<PendingQueue>,
    pub auth: AuthService,
    pub engine: ReconciliationEngine,
}

impl App {
    /// Creates a new App on the database file named by `config`.
    pub fn new<G>(config: ClientConfig, gateway: Arc<G>) -> Result<Self, Box<dyn std::error::Error>>
    where
        G: BookmarkGateway + AuthGateway + 'static,
    {
        let path = config.resolved_database_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::open(&path)?);
        info!(path = %path.display(), "database opened");
        Ok(Self::with_database(config, db, gateway))
    }

    /// Creates an App on a private in-memory database.
    pub fn in_memory<G>(gateway: Arc<G>) -> Result<Self, StoreError>
    where
        G: BookmarkGateway + AuthGateway + 'static,
    {
        let db = Arc::new(Database::open_in_memory()?);
        Ok(Self::with_database(ClientConfig::default(), db, gateway))
    }

    pub fn with_database<G>(config: ClientConfig, db: Arc<Database>, gateway: Arc<G>) -> Self
    where
        G: BookmarkGateway + AuthGateway + 'static,
    {
        let tokens = Arc::new(TokenStore::new(db.clone()));
        let guests = Arc::new(GuestBookmarkStore::new(db.clone()));
        let queue = Arc::new(PendingQueue::new(db.clone()));
        let auth = AuthService::new(gateway.clone() as Arc<dyn AuthGateway>, tokens.clone());
        let engine = ReconciliationEngine::new(
            guests.clone(),
            queue.clone(),
            gateway as Arc<dyn BookmarkGateway>,
        );

        Self {
            config,
            db,
            tokens,
            guests,
            queue,
            auth,
            engine,
        }
    }

    /// Startup sequence: restore guest bookmarks, validate the stored token,
    /// and reconcile for the restored identity if there is one.
    pub async fn startup(&self) -> Result<Option<Identity>, AuthError> {
        self.guests.load()?;
        let Some(session) = self.auth.restore_session()? else {
            info!("starting in guest mode");
            return Ok(None);
        };
        info!(user = %session.identity.id, "session restored");
        let identity = session.identity.clone();
        let result = self.engine.init_for_user(session.identity, session.token).await;
        self.settle_sync(result);
        Ok(self.engine.identity().map(|_| identity))
    }

    // === Identity ===

    pub async fn signup(&self, request: SignupRequest) -> Result<Identity, AuthError> {
        let session = self.auth.signup(request).await?;
        let identity = session.identity.clone();
        let result = self.engine.init_for_user(session.identity, session.token).await;
        self.settle_sync(result);
        Ok(identity)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Identity, AuthError> {
        let session = self.auth.login(request).await?;
        let identity = session.identity.clone();
        let result = self.engine.init_for_user(session.identity, session.token).await;
        self.settle_sync(result);
        Ok(identity)
    }

    /// Signs out. The user's queue and synced list are abandoned; guest mode resumes.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.auth.logout()?;
        self.engine.logout()?;
        Ok(())
    }

    pub async fn update_avatar(&self, avatar: Avatar) -> Result<Identity, AuthError> {
        match self.auth.update_avatar(avatar).await {
            Err(AuthError::NotAuthenticated) => {
                self.engine.expire_session();
                Err(AuthError::NotAuthenticated)
            }
            other => other,
        }
    }

    /// The signed-in identity, if any.
    pub fn current_identity(&self) -> Result<Option<Identity>, StoreError> {
        if self.engine.identity().is_none() {
            return Ok(None);
        }
        self.tokens.identity()
    }

    // === Bookmarks ===

    pub async fn add_bookmark(&self, article: Article) -> Result<TrackedBookmark, SyncError> {
        let result = self.engine.add_bookmark(article).await;
        self.check_auth(result)
    }

    pub async fn remove_bookmark(&self, url: &str) -> Result<bool, SyncError> {
        let result = self.engine.remove_bookmark(url).await;
        self.check_auth(result)
    }

    /// Handles the connectivity-restored signal. Does nothing in guest mode.
    pub async fn connectivity_restored(&self) -> Result<Option<SyncReport>, SyncError> {
        match self.engine.connectivity_restored().await {
            Err(SyncError::NoSession) => Ok(None),
            result => self.check_sync(result).map(Some),
        }
    }

    pub async fn flush(&self) -> Result<FlushReport, SyncError> {
        let report = self.check_auth(self.engine.flush().await)?;
        if report.aborted_on_auth() {
            self.drop_session();
        }
        Ok(report)
    }

    /// The saved list after applying `query`.
    pub fn saved(&self, query: &SavedQuery) -> Result<Vec<TrackedBookmark>, SyncError> {
        Ok(query.apply(self.engine.view()?))
    }

    pub fn sources(&self) -> Result<Vec<String>, SyncError> {
        Ok(saved_view::sources(&self.engine.view()?))
    }

    pub fn is_saved(&self, url: &str) -> Result<bool, SyncError> {
        self.engine.is_saved(url)
    }

    pub fn phase(&self) -> SyncPhase {
        self.engine.phase()
    }

    // === Auth failure handling ===

    /// A credential rejected outside reconciliation drops to guest rendering.
    fn drop_session(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "failed to clear session token");
        }
        self.engine.expire_session();
    }

    fn check_auth<T>(&self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        if let Err(SyncError::Auth(msg)) = &result {
            warn!(%msg, "credential rejected, signing out locally");
            self.drop_session();
        }
        result
    }

    fn check_sync(&self, result: Result<SyncReport, SyncError>) -> Result<SyncReport, SyncError> {
        let result = self.check_auth(result)?;
        if let SyncReport::Completed { flush, .. } = &result {
            if flush.aborted_on_auth() {
                self.drop_session();
            }
        }
        Ok(result)
    }

    /// Logs the outcome of a reconciliation run started by a sign-in.
    ///
    /// A transport failure is not an error for the caller: the engine stays
    /// in `MigrationPending` and retries on the next connectivity event.
    fn settle_sync(&self, result: Result<SyncReport, SyncError>) {
        match self.check_sync(result) {
            Ok(report) => info!(?report, "reconciliation finished"),
            Err(e) => warn!(error = %e, phase = self.phase().as_str(), "reconciliation deferred"),
        }
    }
}
