use reqwest::Client;
use url::Url;

use crate::ports::access_token::AccessTokenSource;
use crate::ports::remote_playlist::{
    CreatePlaylistOptions, PlaylistHead, PlaylistItemsPage, RemoteError, RemotePlaylistApi,
};

use super::api;

/// Spotify Web API implementation of [`RemotePlaylistApi`].
pub struct SpotifyHttpAdapter<T> {
    client: Client,
    api_base: Url,
    tokens: T,
}

impl<T: AccessTokenSource> SpotifyHttpAdapter<T> {
    pub fn new(api_base: Url, tokens: T) -> Self {
        Self {
            client: Client::new(),
            api_base,
            tokens,
        }
    }

    async fn token(&self) -> Result<String, RemoteError> {
        self.tokens
            .access_token()
            .await
            .map_err(|e| RemoteError::Transient(format!("No access token: {:#}", e)))
    }
}

#[async_trait::async_trait]
impl<T: AccessTokenSource> RemotePlaylistApi for SpotifyHttpAdapter<T> {
    async fn get_playlist(&self, playlist_id: &str) -> Result<PlaylistHead, RemoteError> {
        let token = self.token().await?;
        api::get_playlist(&self.client, &self.api_base, &token, playlist_id).await
    }

    async fn get_playlist_items(
        &self,
        playlist_id: &str,
        offset: usize,
    ) -> Result<PlaylistItemsPage, RemoteError> {
        let token = self.token().await?;
        api::get_playlist_items(&self.client, &self.api_base, &token, playlist_id, offset).await
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        options: &CreatePlaylistOptions,
    ) -> Result<String, RemoteError> {
        let token = self.token().await?;
        api::create_playlist(&self.client, &self.api_base, &token, owner_id, name, options).await
    }

    async fn add_items(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<String, RemoteError> {
        let token = self.token().await?;
        api::add_items(&self.client, &self.api_base, &token, playlist_id, track_ids).await
    }

    async fn remove_positions(
        &self,
        playlist_id: &str,
        positions: &[usize],
        snapshot_id: &str,
    ) -> Result<String, RemoteError> {
        let token = self.token().await?;
        api::remove_positions(
            &self.client,
            &self.api_base,
            &token,
            playlist_id,
            positions,
            snapshot_id,
        )
        .await
    }
}
