// Newsroom state managers
// Managers own the locally persisted state: session token, guest bookmarks, pending operations.

pub mod guest_bookmarks;
pub mod pending_queue;
pub mod token_store;
