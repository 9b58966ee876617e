/// Authoritative state of a remote playlist, fetched fresh for every spec.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlaylist {
    pub id: String,
    pub name: String,
    pub snapshot_id: String,
    /// Track IDs in playlist order; index == remote position.
    pub track_ids: Vec<String>,
    pub track_count: usize,
}

/// One page of playlist items, as returned by a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistItemsPage {
    /// Track IDs of this page, in playlist order.
    pub track_ids: Vec<String>,
    /// Items in the whole playlist.
    pub total: usize,
    /// Offset of the following page, if there is one.
    pub next_offset: Option<usize>,
}

/// Playlist metadata together with the first page of its items.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistHead {
    pub id: String,
    pub name: String,
    pub snapshot_id: String,
    pub first_page: PlaylistItemsPage,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatePlaylistOptions {
    pub description: Option<String>,
    pub public: bool,
}

/// Failures reported by a single remote call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("Playlist {0} not found")]
    NotFound(String),
    /// The snapshot ID sent with a mutation no longer matches the playlist.
    #[error("Snapshot rejected: {0}")]
    Conflict(String),
    #[error("{0}")]
    Transient(String),
}

/// Port trait wrapping the playlist endpoints of the remote catalogue API.
///
/// Every method is exactly one HTTP call; batching, pacing and pass limits
/// live in `sync::adapter`. Implementations live in `services::spotify`
/// (production) or test fakes and mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemotePlaylistApi: Send + Sync {
    async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistHead, RemoteError>;

    /// Items of the playlist starting at `offset`.
    async fn get_playlist_items(
        &self,
        playlist_id: &str,
        offset: usize,
    ) -> Result<PlaylistItemsPage, RemoteError>;

    /// Returns the new playlist's ID.
    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        options: &CreatePlaylistOptions,
    ) -> Result<String, RemoteError>;

    /// Appends tracks in the given order. Returns the new snapshot ID.
    async fn add_items(&self, playlist_id: &str, track_ids: &[String])
    -> Result<String, RemoteError>;

    /// Removes the items at `positions` of the playlist as of `snapshot_id`.
    /// Returns the new snapshot ID.
    async fn remove_positions(
        &self,
        playlist_id: &str,
        positions: &[usize],
        snapshot_id: &str,
    ) -> Result<String, RemoteError>;
}
