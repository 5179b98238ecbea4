//! Newsroom console demo.
//!
//! Walks through guest bookmarking, signup with migration, offline edits and
//! reconnection against the in-process gateway. Set `RUST_LOG=debug` to see
//! the engine's structured logs on stderr.

use std::sync::Arc;

use newsroom::app::App;
use newsroom::services::memory_gateway::MemoryGateway;
use newsroom::services::saved_view::{SavedQuery, SortOrder};
use newsroom::types::article::Article;
use newsroom::types::sync::{SyncStatus, TrackedBookmark};
use newsroom::types::user::{Avatar, SignupRequest};
use tracing_subscriber::EnvFilter;

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_list(items: &[TrackedBookmark]) {
    if items.is_empty() {
        println!("  (empty)");
    }
    for item in items {
        let status = match &item.status {
            SyncStatus::Pending => "pending".to_string(),
            SyncStatus::Confirmed { id } => format!("confirmed {}", id),
            SyncStatus::Failed { reason } => format!("failed: {}", reason),
        };
        println!("  • {} [{}] {}", item.bookmark.article.title, item.bookmark.article.source.name, status);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Newsroom v{} — Demo Mode                ║", env!("CARGO_PKG_VERSION"));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let gateway = Arc::new(MemoryGateway::new());
    let app = App::in_memory(gateway.clone())?;
    app.startup().await?;

    section("Guest Bookmarks");
    app.add_bookmark(Article::new("https://news.example/rust", "Rust 2024 ships", "The Register")).await?;
    app.add_bookmark(Article::new("https://news.example/sqlite", "SQLite at 25", "Ars Technica")).await?;
    app.add_bookmark(Article::new("https://news.example/rust", "Rust 2024 ships", "The Register")).await?;
    print_list(&app.saved(&SavedQuery::default())?);
    println!("  phase: {}", app.phase().as_str());

    section("Signup and Migration");
    let identity = app
        .signup(SignupRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await?;
    println!("  signed in as {} ({})", identity.name, identity.email);
    println!("  phase: {}", app.phase().as_str());
    println!("  creates sent: {}", gateway.count_requests("POST /bookmarks"));
    print_list(&app.saved(&SavedQuery::default())?);

    section("Offline Edits");
    gateway.set_online(false);
    app.add_bookmark(Article::new("https://news.example/tokio", "Async runtimes compared", "LWN")).await?;
    app.remove_bookmark("https://news.example/sqlite").await?;
    print_list(&app.saved(&SavedQuery::default())?);

    section("Connectivity Restored");
    gateway.set_online(true);
    app.connectivity_restored().await?;
    println!("  phase: {}", app.phase().as_str());
    print_list(&app.saved(&SavedQuery {
        sort: SortOrder::TitleAsc,
        ..SavedQuery::default()
    })?);
    println!("  sources: {}", app.sources()?.join(", "));

    section("Profile");
    let updated = app.update_avatar(Avatar::Avatar7).await?;
    println!("  avatar: {}", updated.avatar.map(|a| a.to_string()).unwrap_or_default());
    println!("  choices: {}", Avatar::ALL.iter().map(|a| a.file_name()).collect::<Vec<_>>().join(", "));

    section("Logout");
    app.logout()?;
    println!("  phase: {}", app.phase().as_str());
    print_list(&app.saved(&SavedQuery::default())?);

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Walkthrough complete");
    println!("═══════════════════════════════════════════════════════════════");
    Ok(())
}
