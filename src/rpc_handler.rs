//! RPC method handler for the Newsroom JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! stores and services owned by the `App` struct.

use serde_json::{json, Value};

use crate::app::App;
use crate::services::auth_service::parse_avatar;
use crate::services::saved_view::{SavedQuery, SortOrder};
use crate::types::article::Article;
use crate::types::pending::{FlushAbort, FlushOutcome, FlushReport};
use crate::types::sync::SyncReport;
use crate::types::user::{Avatar, Identity, LoginRequest, SignupRequest};

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn opt_str_param(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn identity_json(identity: &Identity) -> Value {
    json!({
        "id": identity.id,
        "name": identity.name,
        "email": identity.email,
        "avatar": identity.avatar,
    })
}

/// Summarizes a flush for the UI shell.
pub fn flush_json(report: &FlushReport) -> Value {
    let (outcome, stopped_at, cause) = match &report.outcome {
        FlushOutcome::Drained => ("drained", None, None),
        FlushOutcome::Coalesced => ("coalesced", None, None),
        FlushOutcome::Aborted { url, cause } => {
            let cause = match cause {
                FlushAbort::Auth(msg) => format!("auth: {}", msg),
                FlushAbort::Network(msg) => format!("network: {}", msg),
            };
            ("aborted", Some(url.clone()), Some(cause))
        }
    };
    json!({
        "outcome": outcome,
        "completed": report.completed.len(),
        "remaining": report.remaining,
        "stopped_at": stopped_at,
        "cause": cause,
    })
}

fn sync_json(report: &SyncReport) -> Value {
    match report {
        SyncReport::Completed {
            migrated,
            already_remote,
            flush,
        } => json!({
            "outcome": "completed",
            "migrated": migrated,
            "already_remote": already_remote,
            "flush": flush_json(flush),
        }),
        SyncReport::Coalesced => json!({"outcome": "coalesced"}),
        SyncReport::Stale => json!({"outcome": "stale"}),
    }
}

fn saved_query(params: &Value) -> Result<SavedQuery, String> {
    let sort = match opt_str_param(params, "sort") {
        Some(s) => s.parse::<SortOrder>()?,
        None => SortOrder::default(),
    };
    Ok(SavedQuery {
        search: opt_str_param(params, "search"),
        source: opt_str_param(params, "source"),
        sort,
    })
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        // ─── Identity ───
        "auth.signup" => {
            let request = SignupRequest {
                name: str_param(params, "name")?.to_string(),
                email: str_param(params, "email")?.to_string(),
                password: str_param(params, "password")?.to_string(),
            };
            let identity = app.signup(request).await.map_err(|e| e.to_string())?;
            Ok(json!({"user": identity_json(&identity), "phase": app.phase().as_str()}))
        }
        "auth.login" => {
            let request = LoginRequest {
                email: str_param(params, "email")?.to_string(),
                password: str_param(params, "password")?.to_string(),
            };
            let identity = app.login(request).await.map_err(|e| e.to_string())?;
            Ok(json!({"user": identity_json(&identity), "phase": app.phase().as_str()}))
        }
        "auth.logout" => {
            app.logout().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "auth.session" => {
            let identity = app.current_identity().map_err(|e| e.to_string())?;
            Ok(json!({
                "user": identity.as_ref().map(identity_json),
                "phase": app.phase().as_str(),
            }))
        }

        // ─── Profile ───
        "profile.avatars" => {
            let names: Vec<&str> = Avatar::ALL.iter().map(|a| a.file_name()).collect();
            Ok(json!(names))
        }
        "profile.avatar" => {
            let avatar = parse_avatar(str_param(params, "avatar")?).map_err(|e| e.to_string())?;
            let identity = app.update_avatar(avatar).await.map_err(|e| e.to_string())?;
            Ok(identity_json(&identity))
        }

        // ─── Bookmarks ───
        "bookmark.add" => {
            let raw = params.get("article").cloned().unwrap_or_else(|| params.clone());
            let article: Article =
                serde_json::from_value(raw).map_err(|e| format!("invalid article: {}", e))?;
            let tracked = app.add_bookmark(article).await.map_err(|e| e.to_string())?;
            to_json(&tracked)
        }
        "bookmark.remove" => {
            let url = str_param(params, "url")?;
            let removed = app.remove_bookmark(url).await.map_err(|e| e.to_string())?;
            Ok(json!({"removed": removed}))
        }
        "bookmark.list" => {
            let query = saved_query(params)?;
            let items = app.saved(&query).map_err(|e| e.to_string())?;
            to_json(&items)
        }
        "bookmark.sources" => {
            let sources = app.sources().map_err(|e| e.to_string())?;
            Ok(json!(sources))
        }
        "bookmark.is_saved" => {
            let url = str_param(params, "url")?;
            let saved = app.is_saved(url).map_err(|e| e.to_string())?;
            Ok(json!({"saved": saved}))
        }

        // ─── Sync ───
        "sync.reconnect" => {
            let report = app.connectivity_restored().await.map_err(|e| e.to_string())?;
            Ok(json!({
                "report": report.as_ref().map(sync_json),
                "phase": app.phase().as_str(),
            }))
        }
        "sync.flush" => {
            let report = app.flush().await.map_err(|e| e.to_string())?;
            Ok(flush_json(&report))
        }
        "sync.status" => {
            let (pending, flushing) = match app.engine.identity() {
                Some(identity) => (
                    app.queue.len(&identity.id).map_err(|e| e.to_string())?,
                    app.queue.is_flushing(&identity.id),
                ),
                None => (0, false),
            };
            Ok(json!({
                "phase": app.phase().as_str(),
                "pending": pending,
                "flushing": flushing,
            }))
        }

        // ─── Config ───
        "config.get" => to_json(&app.config),

        _ => Err(format!("unknown method: {}", method)),
    }
}
