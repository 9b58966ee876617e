use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};

use crate::ports::remote_playlist::{CreatePlaylistOptions, RemotePlaylist, RemotePlaylistApi};

use super::{RateLimitedExecutor, SyncError};

/// Most track references the remote API accepts in one add or remove call.
pub const MAX_ITEMS_PER_CALL: usize = 100;

/// Most positions removed before the playlist has to be re-fetched. The remote
/// API misbehaves when a single snapshot chain removes much more than this.
pub const REMOVAL_PASS_CAP: usize = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub add_batch_size: usize,
    pub remove_batch_size: usize,
    pub removal_pass_cap: usize,
    /// Add batches allowed in flight at once for [`AddOrder::Unordered`].
    pub add_concurrency: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            add_batch_size: MAX_ITEMS_PER_CALL,
            remove_batch_size: MAX_ITEMS_PER_CALL,
            removal_pass_cap: REMOVAL_PASS_CAP,
            add_concurrency: 4,
        }
    }
}

/// Whether the final remote order of added tracks has to match the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOrder {
    /// Batches are sent one after another.
    Preserve,
    /// Batches may be sent concurrently; only the resulting set matters.
    Unordered,
}

/// Result of one removal pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalPass {
    /// Snapshot after the last call of the pass.
    pub snapshot_id: String,
    pub removed: usize,
    /// Positions were left over because of the pass cap. The caller must
    /// re-fetch the playlist and recompute positions before the next pass.
    pub more_remaining: bool,
}

/// The only I/O boundary of the sync: every call goes through the shared
/// [`RateLimitedExecutor`] and respects the remote batch constraints.
pub struct PlaylistAdapter<A> {
    api: A,
    executor: Arc<RateLimitedExecutor>,
    limits: BatchLimits,
}

impl<A: RemotePlaylistApi> PlaylistAdapter<A> {
    pub fn new(api: A, executor: Arc<RateLimitedExecutor>) -> Self {
        Self {
            api,
            executor,
            limits: BatchLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = BatchLimits {
            add_batch_size: limits.add_batch_size.max(1),
            remove_batch_size: limits.remove_batch_size.max(1),
            removal_pass_cap: limits.removal_pass_cap.max(1),
            add_concurrency: limits.add_concurrency.max(1),
        };
        self
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// `Ok(None)` when no playlist exists at `playlist_id`.
    ///
    /// Each page of items is its own executor call with its own timeout.
    pub async fn fetch_playlist(
        &self,
        playlist_id: &str,
    ) -> Result<Option<RemotePlaylist>, SyncError> {
        let head = match self
            .executor
            .run("fetch playlist", self.api.get_playlist(playlist_id))
            .await
        {
            Ok(head) => head,
            Err(SyncError::RemoteNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let track_count = head.first_page.total;
        let mut track_ids = Vec::with_capacity(track_count);
        let mut page = head.first_page;
        let mut pages = 1;
        loop {
            let next_offset = page.next_offset.filter(|_| !page.track_ids.is_empty());
            track_ids.extend(page.track_ids);
            let Some(offset) = next_offset else {
                break;
            };
            page = self
                .executor
                .run(
                    "fetch playlist items",
                    self.api.get_playlist_items(playlist_id, offset),
                )
                .await?;
            pages += 1;
        }

        log::debug!(
            "Fetched playlist '{}' {} ({} tracks in {} pages, snapshot {})",
            head.name,
            head.id,
            track_count,
            pages,
            head.snapshot_id
        );
        Ok(Some(RemotePlaylist {
            id: head.id,
            name: head.name,
            snapshot_id: head.snapshot_id,
            track_ids,
            track_count,
        }))
    }

    pub async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        options: &CreatePlaylistOptions,
    ) -> Result<String, SyncError> {
        let id = self
            .executor
            .run(
                "create playlist",
                self.api.create_playlist(owner_id, name, options),
            )
            .await?;
        log::info!("Created playlist '{}' ({})", name, id);
        Ok(id)
    }

    /// Appends `track_ids` in batches. A failed batch aborts the remaining
    /// ones; batches already applied stay applied.
    pub async fn add_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
        order: AddOrder,
    ) -> Result<usize, SyncError> {
        if track_ids.is_empty() {
            return Ok(0);
        }

        let batches = track_ids.chunks(self.limits.add_batch_size);
        log::debug!(
            "Adding {} tracks to {} in {} batches ({:?})",
            track_ids.len(),
            playlist_id,
            batches.len(),
            order
        );

        match order {
            AddOrder::Preserve => {
                for batch in batches {
                    self.executor
                        .run("add tracks", self.api.add_items(playlist_id, batch))
                        .await?;
                }
            }
            AddOrder::Unordered => {
                stream::iter(batches)
                    .map(|batch| {
                        self.executor
                            .run("add tracks", self.api.add_items(playlist_id, batch))
                    })
                    .buffer_unordered(self.limits.add_concurrency)
                    .try_collect::<Vec<_>>()
                    .await?;
            }
        }

        Ok(track_ids.len())
    }

    /// Runs one removal pass of at most `removal_pass_cap` positions.
    ///
    /// A capped pass takes the highest positions, not the first ones: calls
    /// are strictly sequential, each carrying the snapshot returned by the
    /// previous call, and working from the end down means no call shifts a
    /// position a later call still has to remove. The lower positions left
    /// over are picked up by the next pass after a re-fetch.
    pub async fn remove_tracks_by_position(
        &self,
        playlist_id: &str,
        positions: &[usize],
        snapshot_id: &str,
    ) -> Result<RemovalPass, SyncError> {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();

        let total = positions.len();
        let pass_len = total.min(self.limits.removal_pass_cap);
        let pass = &positions[total - pass_len..];

        let mut snapshot_id = snapshot_id.to_string();
        for batch in pass.rchunks(self.limits.remove_batch_size) {
            snapshot_id = self
                .executor
                .run(
                    "remove tracks",
                    self.api.remove_positions(playlist_id, batch, &snapshot_id),
                )
                .await?;
        }

        let more_remaining = pass_len < total;
        if more_remaining {
            log::info!(
                "Removed {} of {} tracks from {}; re-fetch needed before the next pass",
                pass_len,
                total,
                playlist_id
            );
        }

        Ok(RemovalPass {
            snapshot_id,
            removed: pass_len,
            more_remaining,
        })
    }
}
