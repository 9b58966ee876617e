use crate::ports::remote_playlist::RemoteError;
use crate::query::ValidationError;

/// Everything that can fail a single playlist sync.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Invalid playlist spec: {0}")]
    Validation(#[from] ValidationError),

    #[error("Remote playlist {0} not found")]
    RemoteNotFound(String),

    #[error("Remote call failed: {0}")]
    RemoteTransient(String),

    #[error("Remote rejected a stale snapshot: {0}")]
    RemoteConflict(String),

    #[error("Playlist ID store failed: {0}")]
    Store(String),

    #[error("Removing tracks from playlist {playlist_id} stopped making progress after {passes} passes")]
    Stalled { playlist_id: String, passes: usize },
}

impl SyncError {
    pub fn store(report: color_eyre::Report) -> Self {
        SyncError::Store(format!("{report:#}"))
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(id) => SyncError::RemoteNotFound(id),
            RemoteError::Conflict(reason) => SyncError::RemoteConflict(reason),
            RemoteError::Transient(reason) => SyncError::RemoteTransient(reason),
        }
    }
}
