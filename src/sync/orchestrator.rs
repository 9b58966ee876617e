use std::fmt;

use color_eyre::eyre::{Result, eyre};
use futures::{StreamExt, stream};

use crate::ports::playlist_ids::PlaylistIdStore;
use crate::ports::remote_playlist::RemotePlaylistApi;

use super::{Reconciler, SpecOutcome, SpecStatus, SyncPlaylistSpec};

/// Outcomes of one run, in spec order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub outcomes: Vec<SpecOutcome>,
}

impl SyncSummary {
    pub fn count(&self, status: SpecStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(SpecStatus::Failed) > 0
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            write!(f, "{:<10} {}", outcome.status, outcome.name)?;
            if let Some(report) = &outcome.report {
                write!(
                    f,
                    " (+{} -{}{})",
                    report.added,
                    report.removed,
                    if report.created { ", created" } else { "" }
                )?;
            }
            if let Some(reason) = &outcome.reason {
                write!(f, ": {}", reason)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "{} playlists: {} patched, {} replaced, {} skipped, {} failed",
            self.outcomes.len(),
            self.count(SpecStatus::Patched),
            self.count(SpecStatus::Replaced),
            self.count(SpecStatus::Skipped),
            self.count(SpecStatus::Failed)
        )
    }
}

/// Runs every spec through the reconciler. A failing spec never stops the
/// others; all remote calls still share the adapter's executor.
pub struct SyncRunner<'a, A, S: ?Sized> {
    reconciler: Reconciler<'a, A, S>,
    concurrency: usize,
}

impl<'a, A, S> SyncRunner<'a, A, S>
where
    A: RemotePlaylistApi,
    S: PlaylistIdStore + ?Sized,
{
    pub fn new(reconciler: Reconciler<'a, A, S>, concurrency: usize) -> Self {
        Self {
            reconciler,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(&self, specs: &[SyncPlaylistSpec]) -> SyncSummary {
        log::info!(
            "Syncing {} playlists ({} at a time)",
            specs.len(),
            self.concurrency
        );

        let outcomes = stream::iter(specs)
            .map(|spec| self.reconciler.run(spec))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let summary = SyncSummary { outcomes };
        log::info!(
            "Sync finished: {} succeeded, {} failed",
            summary.outcomes.len() - summary.count(SpecStatus::Failed),
            summary.count(SpecStatus::Failed)
        );
        summary
    }
}

/// Picks the specs named in `only`, keeping configuration order. An empty
/// selection means all of them.
pub fn select_specs(
    specs: &[SyncPlaylistSpec],
    only: &[String],
) -> Result<Vec<SyncPlaylistSpec>> {
    if only.is_empty() {
        return Ok(specs.to_vec());
    }

    if let Some(missing) = only
        .iter()
        .find(|name| !specs.iter().any(|spec| &spec.name == *name))
    {
        return Err(eyre!("No playlist named '{}' in the configuration", missing));
    }

    Ok(specs
        .iter()
        .filter(|spec| only.contains(&spec.name))
        .cloned()
        .collect())
}
