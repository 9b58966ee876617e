//! Remote playlist synchronisation: the rate-limited adapter around the remote
//! API, the per-spec reconciler and the orchestrator that runs every
//! configured spec.

use serde::{Deserialize, Serialize};

use crate::ports::remote_playlist::CreatePlaylistOptions;
use crate::query::{Filter, SortSpec};

pub mod adapter;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod reconcile;

pub use adapter::{AddOrder, BatchLimits, PlaylistAdapter};
pub use error::SyncError;
pub use executor::RateLimitedExecutor;
pub use orchestrator::{SyncRunner, SyncSummary};
pub use reconcile::{Reconciler, SpecOutcome, SpecStatus};

/// Declarative definition of one synced playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPlaylistSpec {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Empty the playlist and re-add the target in order.
    #[serde(default)]
    pub force_recreate: bool,
    /// Treat equal track counts as already in sync.
    #[serde(default = "default_true")]
    pub lazy_update: bool,
    #[serde(default = "default_true")]
    pub include_undefined_sort_values: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub public: bool,
}

fn default_true() -> bool {
    true
}

impl SyncPlaylistSpec {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filters: Vec::new(),
            sort: None,
            limit: None,
            force_recreate: false,
            lazy_update: true,
            include_undefined_sort_values: true,
            description: None,
            public: false,
        }
    }

    pub fn create_options(&self) -> CreatePlaylistOptions {
        CreatePlaylistOptions {
            description: self.description.clone(),
            public: self.public,
        }
    }
}
