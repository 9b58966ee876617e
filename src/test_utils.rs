use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use color_eyre::eyre::Result;
use sea_orm::Database as SeaDatabase;

use crate::database::{Database, apply_schema};
use crate::ports::playlist_ids::PlaylistIdStore;
use crate::ports::remote_playlist::{
    CreatePlaylistOptions, PlaylistHead, PlaylistItemsPage, RemoteError, RemotePlaylistApi,
};

pub async fn test_db() -> Arc<Database> {
    let conn = SeaDatabase::connect("sqlite::memory:?mode=rwc")
        .await
        .unwrap();
    apply_schema(&conn).await.unwrap();
    Arc::new(Database { conn })
}

pub fn numbered_tracks(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

pub fn track_ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

// ============================================================================
// In-memory playlist ID store
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlaylistIdStore {
    ids: Mutex<HashMap<String, String>>,
}

impl InMemoryPlaylistIdStore {
    pub fn with_entry(self, name: &str, remote_id: &str) -> Self {
        self.ids
            .lock()
            .unwrap()
            .insert(name.to_string(), remote_id.to_string());
        self
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        self.ids.lock().unwrap().get(name).cloned()
    }
}

#[async_trait::async_trait]
impl PlaylistIdStore for InMemoryPlaylistIdStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lookup(name))
    }

    async fn set(&self, name: &str, remote_id: &str) -> Result<()> {
        self.ids
            .lock()
            .unwrap()
            .insert(name.to_string(), remote_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Stateful fake of the remote playlist API
// ============================================================================

/// Successful calls observed by [`FakeRemote`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Fetch {
        playlist_id: String,
    },
    FetchItems {
        playlist_id: String,
        offset: usize,
    },
    Create {
        name: String,
        playlist_id: String,
    },
    Add {
        playlist_id: String,
        track_ids: Vec<String>,
    },
    Remove {
        playlist_id: String,
        positions: Vec<usize>,
        snapshot_id: String,
        new_snapshot_id: String,
    },
}

struct FakePlaylist {
    name: String,
    tracks: Vec<String>,
    version: u64,
}

impl FakePlaylist {
    fn snapshot_id(&self) -> String {
        format!("s{}", self.version)
    }

    fn page(&self, offset: usize, page_size: usize) -> PlaylistItemsPage {
        let end = self.tracks.len().min(offset.saturating_add(page_size));
        let start = offset.min(end);
        PlaylistItemsPage {
            track_ids: self.tracks[start..end].to_vec(),
            total: self.tracks.len(),
            next_offset: (end < self.tracks.len()).then_some(end),
        }
    }
}

#[derive(Default)]
struct FakeState {
    playlists: HashMap<String, FakePlaylist>,
    calls: Vec<RemoteCall>,
    created: u64,
    remove_conflicts: usize,
    failing_adds: Vec<String>,
    page_size: Option<usize>,
    mutations_left: Option<usize>,
    failed_mutations: usize,
    ignore_removals: bool,
}

impl FakeState {
    /// Counts a mutation against the budget set by `fail_mutations_after`.
    fn take_mutation(&mut self) -> Result<(), RemoteError> {
        match self.mutations_left {
            Some(0) => {
                self.failed_mutations += 1;
                Err(RemoteError::Transient("502 Bad Gateway".into()))
            }
            Some(left) => {
                self.mutations_left = Some(left - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Remote playlists held in memory. Removals resolve positions against the
/// current list and are rejected unless they carry the current snapshot.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the playlist's snapshot ID.
    pub fn insert_playlist(&self, id: &str, name: &str, tracks: &[String]) -> String {
        let playlist = FakePlaylist {
            name: name.to_string(),
            tracks: tracks.to_vec(),
            version: 1,
        };
        let snapshot = playlist.snapshot_id();
        self.state
            .lock()
            .unwrap()
            .playlists
            .insert(id.to_string(), playlist);
        snapshot
    }

    pub fn delete_playlist(&self, id: &str) {
        self.state.lock().unwrap().playlists.remove(id);
    }

    /// The next `count` removals see a concurrent edit and are rejected.
    pub fn inject_remove_conflicts(&self, count: usize) {
        self.state.lock().unwrap().remove_conflicts = count;
    }

    /// Serve playlist items `page_size` at a time instead of all at once.
    pub fn set_page_size(&self, page_size: usize) {
        self.state.lock().unwrap().page_size = Some(page_size.max(1));
    }

    /// Let `count` more adds or removes through, then fail every one after.
    pub fn fail_mutations_after(&self, count: usize) {
        self.state.lock().unwrap().mutations_left = Some(count);
    }

    pub fn failed_mutation_count(&self) -> usize {
        self.state.lock().unwrap().failed_mutations
    }

    /// Removals succeed and hand out a new snapshot, but leave the tracks in place.
    pub fn ignore_removals(&self) {
        self.state.lock().unwrap().ignore_removals = true;
    }

    pub fn fail_adds_to(&self, playlist_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_adds
            .push(playlist_id.to_string());
    }

    pub fn track_ids(&self, id: &str) -> Vec<String> {
        self.state.lock().unwrap().playlists[id].tracks.clone()
    }

    pub fn snapshot_id(&self, id: &str) -> String {
        self.state.lock().unwrap().playlists[id].snapshot_id()
    }

    pub fn playlist_id_named(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|(_, p)| p.name == name)
            .map(|(id, _)| id.clone())
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                !matches!(call, RemoteCall::Fetch { .. } | RemoteCall::FetchItems { .. })
            })
            .count()
    }
}

#[async_trait::async_trait]
impl RemotePlaylistApi for FakeRemote {
    async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistHead, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let page_size = state.page_size.unwrap_or(usize::MAX);
        let playlist = state
            .playlists
            .get(playlist_id)
            .ok_or_else(|| RemoteError::NotFound(playlist_id.to_string()))?;
        let head = PlaylistHead {
            id: playlist_id.to_string(),
            name: playlist.name.clone(),
            snapshot_id: playlist.snapshot_id(),
            first_page: playlist.page(0, page_size),
        };
        state.calls.push(RemoteCall::Fetch {
            playlist_id: playlist_id.to_string(),
        });
        Ok(head)
    }

    async fn get_playlist_items(
        &self,
        playlist_id: &str,
        offset: usize,
    ) -> Result<PlaylistItemsPage, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let page_size = state.page_size.unwrap_or(usize::MAX);
        let page = state
            .playlists
            .get(playlist_id)
            .ok_or_else(|| RemoteError::NotFound(playlist_id.to_string()))?
            .page(offset, page_size);
        state.calls.push(RemoteCall::FetchItems {
            playlist_id: playlist_id.to_string(),
            offset,
        });
        Ok(page)
    }

    async fn create_playlist(
        &self,
        _owner_id: &str,
        name: &str,
        _options: &CreatePlaylistOptions,
    ) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let id = format!("created{}", state.created);
        state.playlists.insert(
            id.clone(),
            FakePlaylist {
                name: name.to_string(),
                tracks: Vec::new(),
                version: 1,
            },
        );
        state.calls.push(RemoteCall::Create {
            name: name.to_string(),
            playlist_id: id.clone(),
        });
        Ok(id)
    }

    async fn add_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_adds.iter().any(|id| id == playlist_id) {
            return Err(RemoteError::Transient("503 Service Unavailable".into()));
        }
        state.take_mutation()?;
        let playlist = state
            .playlists
            .get_mut(playlist_id)
            .ok_or_else(|| RemoteError::NotFound(playlist_id.to_string()))?;
        playlist.tracks.extend_from_slice(track_ids);
        playlist.version += 1;
        let snapshot = playlist.snapshot_id();
        state.calls.push(RemoteCall::Add {
            playlist_id: playlist_id.to_string(),
            track_ids: track_ids.to_vec(),
        });
        Ok(snapshot)
    }

    async fn remove_positions(
        &self,
        playlist_id: &str,
        positions: &[usize],
        snapshot_id: &str,
    ) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.take_mutation()?;
        let ignore_removals = state.ignore_removals;
        let conflict = state.remove_conflicts > 0;
        if conflict {
            state.remove_conflicts -= 1;
        }

        let playlist = state
            .playlists
            .get_mut(playlist_id)
            .ok_or_else(|| RemoteError::NotFound(playlist_id.to_string()))?;
        if conflict {
            // Someone else edited the playlist in the meantime
            playlist.version += 1;
        }
        if playlist.snapshot_id() != snapshot_id {
            return Err(RemoteError::Conflict(format!(
                "snapshot {} is not current ({})",
                snapshot_id,
                playlist.snapshot_id()
            )));
        }
        if positions.len() > 100 {
            return Err(RemoteError::Transient("too many positions".into()));
        }
        if positions.iter().any(|p| *p >= playlist.tracks.len()) {
            return Err(RemoteError::Transient("position out of range".into()));
        }

        if !ignore_removals {
            let mut sorted = positions.to_vec();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            sorted.dedup();
            for position in sorted {
                playlist.tracks.remove(position);
            }
        }
        playlist.version += 1;
        let new_snapshot_id = playlist.snapshot_id();

        state.calls.push(RemoteCall::Remove {
            playlist_id: playlist_id.to_string(),
            positions: positions.to_vec(),
            snapshot_id: snapshot_id.to_string(),
            new_snapshot_id: new_snapshot_id.clone(),
        });
        Ok(new_snapshot_id)
    }
}
