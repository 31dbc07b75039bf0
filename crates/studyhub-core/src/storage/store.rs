use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::{Session, SessionDraft};

/// Upper bound on the number of sessions a list call returns.
pub const DEFAULT_LIST_LIMIT: usize = 200;

/// Clamp a requested list size to `1..=DEFAULT_LIST_LIMIT`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, DEFAULT_LIST_LIMIT)
}

/// Persistence boundary for pomodoro sessions.
///
/// Sessions are append/delete only; there is no update.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Most recently created first, at most `clamp_limit(limit)` entries.
    async fn list(&self, limit: usize) -> Result<Vec<Session>, StoreError>;

    /// Validate and persist `draft`, assigning `id` and `created_at`.
    async fn create(&self, draft: SessionDraft) -> Result<Session, StoreError>;

    /// Remove one session. `StoreError::NotFound` if the id is unknown.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Remove every session. Idempotent.
    async fn delete_all(&self) -> Result<(), StoreError>;
}
