use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::database::Database;
use crate::entities::playlist_link;
use crate::ports::playlist_ids::PlaylistIdStore;

/// Playlist name -> remote ID mapping kept in the `playlist_links` table.
pub struct SqlitePlaylistIdStore {
    db: Arc<Database>,
}

impl SqlitePlaylistIdStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl PlaylistIdStore for SqlitePlaylistIdStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let link = playlist_link::Entity::find()
            .filter(playlist_link::Column::Name.eq(name))
            .one(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to look up playlist link for '{}'", name))?;

        Ok(link.map(|link| link.remote_id))
    }

    async fn set(&self, name: &str, remote_id: &str) -> Result<()> {
        log::debug!("Linking playlist '{}' to {}", name, remote_id);

        let now = chrono::Utc::now().timestamp();
        let link = playlist_link::ActiveModel {
            name: Set(name.to_string()),
            remote_id: Set(remote_id.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        playlist_link::Entity::insert(link)
            .on_conflict(
                OnConflict::column(playlist_link::Column::Name)
                    .update_columns([
                        playlist_link::Column::RemoteId,
                        playlist_link::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db.conn)
            .await
            .wrap_err_with(|| format!("Failed to save playlist link for '{}'", name))?;

        Ok(())
    }
}
