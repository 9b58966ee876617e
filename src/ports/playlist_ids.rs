use color_eyre::eyre::Result;

/// Persisted lookup from playlist name to remote playlist ID.
///
/// Implementations live in `services::playlist_ids` (SQLite) or test fakes.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlaylistIdStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>>;
    async fn set(&self, name: &str, remote_id: &str) -> Result<()>;
}
