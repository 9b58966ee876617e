use std::collections::HashSet;
use std::fmt;

use crate::ports::playlist_ids::PlaylistIdStore;
use crate::ports::remote_playlist::{RemotePlaylist, RemotePlaylistApi};
use crate::query::QueryPlanner;

use super::{AddOrder, PlaylistAdapter, SyncError, SyncPlaylistSpec};

/// What the reconciler does to a remote playlist once it knows both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Track counts match and lazy updates are on: no mutations.
    Skip,
    /// Empty the playlist, then add the whole target in order.
    Replace,
    /// Remove what isn't in the target, then add what's missing.
    Patch,
}

pub fn choose_action(
    spec: &SyncPlaylistSpec,
    remote_track_count: usize,
    target_len: usize,
) -> ReconcileAction {
    if spec.force_recreate {
        ReconcileAction::Replace
    } else if spec.lazy_update && remote_track_count == target_len {
        ReconcileAction::Skip
    } else {
        ReconcileAction::Patch
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub playlist_id: String,
    pub action: ReconcileAction,
    pub created: bool,
    pub added: usize,
    pub removed: usize,
    pub removal_passes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecStatus {
    Skipped,
    Replaced,
    Patched,
    Failed,
}

impl fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            SpecStatus::Skipped => "skipped",
            SpecStatus::Replaced => "replaced",
            SpecStatus::Patched => "patched",
            SpecStatus::Failed => "failed",
        };
        f.pad(status)
    }
}

/// Per-spec result; failures carry their reason instead of propagating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOutcome {
    pub name: String,
    pub status: SpecStatus,
    pub reason: Option<String>,
    pub report: Option<ReconcileReport>,
}

/// Drives one spec through resolve -> fetch -> skip / replace / patch.
pub struct Reconciler<'a, A, S: ?Sized> {
    planner: &'a QueryPlanner<'a>,
    adapter: &'a PlaylistAdapter<A>,
    playlist_ids: &'a S,
    owner_id: &'a str,
    max_conflict_retries: usize,
}

impl<'a, A, S> Reconciler<'a, A, S>
where
    A: RemotePlaylistApi,
    S: PlaylistIdStore + ?Sized,
{
    pub fn new(
        planner: &'a QueryPlanner<'a>,
        adapter: &'a PlaylistAdapter<A>,
        playlist_ids: &'a S,
        owner_id: &'a str,
    ) -> Self {
        Self {
            planner,
            adapter,
            playlist_ids,
            owner_id,
            max_conflict_retries: 3,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: usize) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Reconciles one spec and converts any failure into a `Failed` outcome.
    pub async fn run(&self, spec: &SyncPlaylistSpec) -> SpecOutcome {
        match self.reconcile(spec).await {
            Ok(report) => {
                let status = match report.action {
                    ReconcileAction::Skip => SpecStatus::Skipped,
                    ReconcileAction::Replace => SpecStatus::Replaced,
                    ReconcileAction::Patch => SpecStatus::Patched,
                };
                SpecOutcome {
                    name: spec.name.clone(),
                    status,
                    reason: None,
                    report: Some(report),
                }
            }
            Err(e) => {
                log::error!("Failed to sync playlist '{}': {}", spec.name, e);
                SpecOutcome {
                    name: spec.name.clone(),
                    status: SpecStatus::Failed,
                    reason: Some(e.to_string()),
                    report: None,
                }
            }
        }
    }

    pub async fn reconcile(&self, spec: &SyncPlaylistSpec) -> Result<ReconcileReport, SyncError> {
        log::info!("Syncing playlist '{}'", spec.name);

        let target = self.planner.resolve_target(spec)?;
        let (remote, created) = self.fetch_or_create(spec).await?;

        let action = choose_action(spec, remote.track_count, target.len());
        log::info!(
            "Playlist '{}': {} remote tracks, {} target tracks -> {:?}",
            spec.name,
            remote.track_count,
            target.len(),
            action
        );

        let mut report = ReconcileReport {
            playlist_id: remote.id.clone(),
            action,
            created,
            added: 0,
            removed: 0,
            removal_passes: 0,
        };

        match action {
            ReconcileAction::Skip => {}
            ReconcileAction::Replace => self.replace(remote, &target, &mut report).await?,
            ReconcileAction::Patch => self.patch(remote, &target, &mut report).await?,
        }

        log::info!(
            "Synced playlist '{}': {} added, {} removed in {} passes",
            spec.name,
            report.added,
            report.removed,
            report.removal_passes
        );
        Ok(report)
    }

    /// Returns the current remote playlist, creating an empty one when the
    /// name isn't mapped yet or the mapped playlist has disappeared.
    async fn fetch_or_create(
        &self,
        spec: &SyncPlaylistSpec,
    ) -> Result<(RemotePlaylist, bool), SyncError> {
        let cached = self
            .playlist_ids
            .get(&spec.name)
            .await
            .map_err(SyncError::store)?;

        if let Some(playlist_id) = cached {
            match self.adapter.fetch_playlist(&playlist_id).await? {
                Some(remote) => return Ok((remote, false)),
                None => log::warn!(
                    "Playlist {} for '{}' no longer exists, creating a new one",
                    playlist_id,
                    spec.name
                ),
            }
        }

        let playlist_id = self
            .adapter
            .create_playlist(self.owner_id, &spec.name, &spec.create_options())
            .await?;
        self.playlist_ids
            .set(&spec.name, &playlist_id)
            .await
            .map_err(SyncError::store)?;

        let remote = RemotePlaylist {
            id: playlist_id,
            name: spec.name.clone(),
            snapshot_id: String::new(),
            track_ids: Vec::new(),
            track_count: 0,
        };
        Ok((remote, true))
    }

    async fn replace(
        &self,
        remote: RemotePlaylist,
        target: &[String],
        report: &mut ReconcileReport,
    ) -> Result<(), SyncError> {
        let playlist_id = remote.id.clone();
        self.remove_until_done(remote, all_positions, report).await?;

        report.added = self
            .adapter
            .add_tracks(&playlist_id, target, AddOrder::Preserve)
            .await?;
        Ok(())
    }

    /// Brings the remote set in line with the target. Tracks already present
    /// keep their position; only missing tracks are appended.
    async fn patch(
        &self,
        remote: RemotePlaylist,
        target: &[String],
        report: &mut ReconcileReport,
    ) -> Result<(), SyncError> {
        let playlist_id = remote.id.clone();
        let to_add: Vec<String> = {
            let current: HashSet<&str> = remote.track_ids.iter().map(String::as_str).collect();
            target
                .iter()
                .filter(|id| !current.contains(id.as_str()))
                .cloned()
                .collect()
        };

        let wanted: HashSet<&str> = target.iter().map(String::as_str).collect();
        self.remove_until_done(remote, |playlist| surplus_positions(playlist, &wanted), report)
            .await?;

        report.added = self
            .adapter
            .add_tracks(&playlist_id, &to_add, AddOrder::Unordered)
            .await?;
        Ok(())
    }

    /// Removes the positions picked by `select` pass by pass, re-fetching the
    /// playlist whenever a pass hits the cap or the snapshot turns out stale.
    async fn remove_until_done<F>(
        &self,
        mut remote: RemotePlaylist,
        select: F,
        report: &mut ReconcileReport,
    ) -> Result<(), SyncError>
    where
        F: Fn(&RemotePlaylist) -> Vec<usize>,
    {
        let mut conflicts = 0;
        let mut remaining_before_pass: Option<usize> = None;

        loop {
            let positions = select(&remote);
            if positions.is_empty() {
                return Ok(());
            }

            if let Some(previous) = remaining_before_pass.take() {
                if positions.len() >= previous {
                    return Err(SyncError::Stalled {
                        playlist_id: remote.id,
                        passes: report.removal_passes,
                    });
                }
            }

            match self
                .adapter
                .remove_tracks_by_position(&remote.id, &positions, &remote.snapshot_id)
                .await
            {
                Ok(pass) => {
                    log::debug!(
                        "Removal pass {} on {} removed {} tracks (snapshot {})",
                        report.removal_passes + 1,
                        remote.id,
                        pass.removed,
                        pass.snapshot_id
                    );
                    report.removed += pass.removed;
                    report.removal_passes += 1;
                    if !pass.more_remaining {
                        return Ok(());
                    }
                    remaining_before_pass = Some(positions.len());
                }
                Err(SyncError::RemoteConflict(reason)) if conflicts < self.max_conflict_retries => {
                    conflicts += 1;
                    log::warn!(
                        "Snapshot of {} went stale ({}), re-fetching before retry {}/{}",
                        remote.id,
                        reason,
                        conflicts,
                        self.max_conflict_retries
                    );
                }
                Err(e) => return Err(e),
            }

            remote = self.refetch(&remote.id).await?;
        }
    }

    async fn refetch(&self, playlist_id: &str) -> Result<RemotePlaylist, SyncError> {
        self.adapter
            .fetch_playlist(playlist_id)
            .await?
            .ok_or_else(|| SyncError::RemoteNotFound(playlist_id.to_string()))
    }
}

fn all_positions(playlist: &RemotePlaylist) -> Vec<usize> {
    (0..playlist.track_ids.len()).collect()
}

/// Positions of tracks outside the target, plus repeats of target tracks
/// after their first occurrence.
fn surplus_positions(playlist: &RemotePlaylist, wanted: &HashSet<&str>) -> Vec<usize> {
    let mut seen = HashSet::new();
    playlist
        .track_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| !wanted.contains(id.as_str()) || !seen.insert(id.as_str()))
        .map(|(position, _)| position)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Entity, Library};
    use crate::ports::playlist_ids::MockPlaylistIdStore;
    use crate::ports::remote_playlist::{
        MockRemotePlaylistApi, PlaylistHead, PlaylistItemsPage, RemoteError,
    };
    use crate::query::{Filter, SortOrder, SortSpec, TextMatchMode};
    use crate::sync::RateLimitedExecutor;
    use crate::test_utils::{
        FakeRemote, InMemoryPlaylistIdStore, RemoteCall, numbered_tracks, track_ids,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn executor() -> Arc<RateLimitedExecutor> {
        Arc::new(RateLimitedExecutor::unlimited(Duration::from_secs(5)))
    }

    /// One track entity per ID, in the given order.
    fn track_library(ids: &[String]) -> Library {
        Library::from_entities(
            ids.iter()
                .map(|id| Entity::new(id.as_str()).with_text_list("tags", &["all"]))
                .collect(),
        )
        .unwrap()
    }

    fn remote_with(id: &str, tracks: &[String]) -> RemotePlaylist {
        RemotePlaylist {
            id: id.to_string(),
            name: "Mix".to_string(),
            snapshot_id: "s1".to_string(),
            track_ids: tracks.to_vec(),
            track_count: tracks.len(),
        }
    }

    #[test]
    fn test_choose_action() {
        let mut spec = SyncPlaylistSpec::named("Mix");
        assert_eq!(choose_action(&spec, 3, 3), ReconcileAction::Skip);
        assert_eq!(choose_action(&spec, 2, 3), ReconcileAction::Patch);

        spec.lazy_update = false;
        assert_eq!(choose_action(&spec, 3, 3), ReconcileAction::Patch);

        spec.force_recreate = true;
        spec.lazy_update = true;
        assert_eq!(choose_action(&spec, 3, 3), ReconcileAction::Replace);
    }

    #[test]
    fn test_surplus_positions_include_duplicates() {
        let remote = remote_with("pl", &track_ids(&["a", "x", "b", "a", "y"]));
        let wanted: HashSet<&str> = ["a", "b"].into_iter().collect();
        assert_eq!(surplus_positions(&remote, &wanted), vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_force_recreate_removes_then_adds_in_target_order() {
        let library = track_library(&track_ids(&["y", "z", "w"]));
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &track_ids(&["x", "y", "z"]));
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let mut spec = SyncPlaylistSpec::named("Mix");
        spec.force_recreate = true;
        let report = reconciler.reconcile(&spec).await.unwrap();

        assert_eq!(report.action, ReconcileAction::Replace);
        let mutations: Vec<RemoteCall> = adapter
            .api()
            .calls()
            .into_iter()
            .filter(|c| !matches!(c, RemoteCall::Fetch { .. }))
            .collect();
        assert_eq!(
            mutations,
            vec![
                RemoteCall::Remove {
                    playlist_id: "pl".into(),
                    positions: vec![0, 1, 2],
                    snapshot_id: "s1".into(),
                    new_snapshot_id: "s2".into(),
                },
                RemoteCall::Add {
                    playlist_id: "pl".into(),
                    track_ids: track_ids(&["y", "z", "w"]),
                },
            ]
        );
        assert_eq!(adapter.api().track_ids("pl"), track_ids(&["y", "z", "w"]));
    }

    #[tokio::test]
    async fn test_patch_converges_on_the_target_set() {
        let library = track_library(&track_ids(&["y", "z", "w"]));
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &track_ids(&["x", "y", "z", "y"]));
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let report = reconciler
            .reconcile(&SyncPlaylistSpec::named("Mix"))
            .await
            .unwrap();

        assert_eq!(report.action, ReconcileAction::Patch);
        assert_eq!(report.removed, 2);
        assert_eq!(report.added, 1);
        // Existing tracks keep their place; new ones are appended
        assert_eq!(adapter.api().track_ids("pl"), track_ids(&["y", "z", "w"]));
    }

    #[tokio::test]
    async fn test_patch_does_not_reorder_existing_tracks() {
        let library = track_library(&track_ids(&["a", "b", "c"]));
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &track_ids(&["c", "b"]));
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        reconciler
            .reconcile(&SyncPlaylistSpec::named("Mix"))
            .await
            .unwrap();

        assert_eq!(adapter.api().track_ids("pl"), track_ids(&["c", "b", "a"]));
    }

    #[tokio::test]
    async fn test_same_size_is_skipped_even_when_members_differ() {
        let library = track_library(&track_ids(&["a", "b"]));
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &track_ids(&["x", "y"]));
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let report = reconciler
            .reconcile(&SyncPlaylistSpec::named("Mix"))
            .await
            .unwrap();

        assert_eq!(report.action, ReconcileAction::Skip);
        assert_eq!(adapter.api().mutation_count(), 0);
        assert_eq!(adapter.api().track_ids("pl"), track_ids(&["x", "y"]));
    }

    #[tokio::test]
    async fn test_unmapped_name_creates_playlist_and_records_id() {
        let library = track_library(&track_ids(&["a", "b"]));
        let planner = QueryPlanner::new(&library);
        let adapter = PlaylistAdapter::new(FakeRemote::new(), executor());
        let ids = InMemoryPlaylistIdStore::default();
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let report = reconciler
            .reconcile(&SyncPlaylistSpec::named("Fresh"))
            .await
            .unwrap();

        assert!(report.created);
        assert_eq!(report.added, 2);
        assert_eq!(ids.lookup("Fresh"), Some(report.playlist_id.clone()));
        assert_eq!(
            adapter.api().track_ids(&report.playlist_id),
            track_ids(&["a", "b"])
        );
    }

    #[tokio::test]
    async fn test_vanished_playlist_is_recreated() {
        let library = track_library(&track_ids(&["a"]));
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("deleted", "Mix", &track_ids(&["a"]));
        remote.delete_playlist("deleted");
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "deleted");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let report = reconciler
            .reconcile(&SyncPlaylistSpec::named("Mix"))
            .await
            .unwrap();

        assert!(report.created);
        assert_ne!(report.playlist_id, "deleted");
        assert_eq!(ids.lookup("Mix"), Some(report.playlist_id));
    }

    #[tokio::test]
    async fn test_large_removal_runs_in_capped_passes_with_refetch() {
        let library = Library::default();
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &numbered_tracks("t", 1500));
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let report = reconciler
            .reconcile(&SyncPlaylistSpec::named("Mix"))
            .await
            .unwrap();

        assert_eq!(report.removal_passes, 2);
        assert_eq!(report.removed, 1500);
        assert!(adapter.api().track_ids("pl").is_empty());

        // fetch, 9 removes (900), re-fetch, 6 removes (600)
        let shape: Vec<&str> = adapter
            .api()
            .calls()
            .iter()
            .map(|call| match call {
                RemoteCall::Fetch { .. } => "fetch",
                RemoteCall::Remove { .. } => "remove",
                _ => "other",
            })
            .collect();
        let mut expected = vec!["fetch"];
        expected.extend(std::iter::repeat_n("remove", 9));
        expected.push("fetch");
        expected.extend(std::iter::repeat_n("remove", 6));
        assert_eq!(shape, expected);
    }

    #[tokio::test]
    async fn test_conflict_forces_refetch_before_retry() {
        let library = Library::default();
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &track_ids(&["a", "b"]));
        remote.inject_remove_conflicts(1);
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let report = reconciler
            .reconcile(&SyncPlaylistSpec::named("Mix"))
            .await
            .unwrap();

        assert_eq!(report.removed, 2);
        let calls = adapter.api().calls();
        assert!(matches!(calls[0], RemoteCall::Fetch { .. }));
        assert!(matches!(calls[1], RemoteCall::Fetch { .. }));
        match &calls[2] {
            RemoteCall::Remove { snapshot_id, .. } => assert_eq!(snapshot_id, "s2"),
            other => panic!("expected a removal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conflicts_beyond_retry_budget_fail() {
        let library = Library::default();
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &track_ids(&["a"]));
        remote.inject_remove_conflicts(5);
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler =
            Reconciler::new(&planner, &adapter, &ids, "me").with_max_conflict_retries(2);

        let result = reconciler.reconcile(&SyncPlaylistSpec::named("Mix")).await;
        assert!(matches!(result, Err(SyncError::RemoteConflict(_))));
    }

    #[tokio::test]
    async fn test_removals_that_change_nothing_stall() {
        let library = Library::default();
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.insert_playlist("pl", "Mix", &numbered_tracks("t", 1000));
        remote.ignore_removals();
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let result = reconciler.reconcile(&SyncPlaylistSpec::named("Mix")).await;
        assert!(matches!(
            result,
            Err(SyncError::Stalled { ref playlist_id, passes: 1 }) if playlist_id == "pl"
        ));

        // One capped pass, then the re-fetch shows nothing went away
        let calls = adapter.api().calls();
        let removes = calls
            .iter()
            .filter(|c| matches!(c, RemoteCall::Remove { .. }))
            .count();
        assert_eq!(removes, 9);
        assert!(matches!(calls.last(), Some(RemoteCall::Fetch { .. })));
        assert_eq!(adapter.api().track_ids("pl").len(), 1000);
    }

    #[tokio::test]
    async fn test_paged_fetch_sees_the_whole_playlist() {
        let library = track_library(&numbered_tracks("t", 250));
        let planner = QueryPlanner::new(&library);
        let remote = FakeRemote::new();
        remote.set_page_size(100);
        remote.insert_playlist("pl", "Mix", &numbered_tracks("t", 250));
        let adapter = PlaylistAdapter::new(remote, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let mut spec = SyncPlaylistSpec::named("Mix");
        spec.lazy_update = false;
        let report = reconciler.reconcile(&spec).await.unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(adapter.api().mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_error_makes_no_remote_calls() {
        let library = track_library(&track_ids(&["a"]));
        let planner = QueryPlanner::new(&library);
        let adapter = PlaylistAdapter::new(MockRemotePlaylistApi::new(), executor());
        let ids = MockPlaylistIdStore::new();
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let mut spec = SyncPlaylistSpec::named("Broken");
        spec.filters = vec![Filter::text("mood", "calm", TextMatchMode::Union)];
        spec.sort = Some(SortSpec::new("tags", SortOrder::Asc));

        let outcome = reconciler.run(&spec).await;
        assert_eq!(outcome.status, SpecStatus::Failed);
        assert!(outcome.reason.unwrap().contains("mood"));
    }

    #[tokio::test]
    async fn test_transient_add_failure_is_reported() {
        let library = track_library(&track_ids(&["a"]));
        let planner = QueryPlanner::new(&library);

        let mut api = MockRemotePlaylistApi::new();
        api.expect_get_playlist().returning(|_| {
            Ok(PlaylistHead {
                id: "pl".to_string(),
                name: "Mix".to_string(),
                snapshot_id: "s1".to_string(),
                first_page: PlaylistItemsPage::default(),
            })
        });
        api.expect_add_items()
            .returning(|_, _| Err(RemoteError::Transient("429 Too Many Requests".into())));
        api.expect_remove_positions().never();
        let adapter = PlaylistAdapter::new(api, executor());
        let ids = InMemoryPlaylistIdStore::default().with_entry("Mix", "pl");
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let outcome = reconciler.run(&SyncPlaylistSpec::named("Mix")).await;
        assert_eq!(outcome.status, SpecStatus::Failed);
        assert!(outcome.reason.unwrap().contains("429"));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let library = track_library(&track_ids(&["a"]));
        let planner = QueryPlanner::new(&library);
        let adapter = PlaylistAdapter::new(MockRemotePlaylistApi::new(), executor());
        let mut ids = MockPlaylistIdStore::new();
        ids.expect_get()
            .returning(|_| Err(color_eyre::eyre::eyre!("database is locked")));
        let reconciler = Reconciler::new(&planner, &adapter, &ids, "me");

        let result = reconciler.reconcile(&SyncPlaylistSpec::named("Mix")).await;
        assert!(matches!(result, Err(SyncError::Store(reason)) if reason.contains("locked")));
    }
}
