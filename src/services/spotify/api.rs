use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ports::remote_playlist::{
    CreatePlaylistOptions, PlaylistHead, PlaylistItemsPage, RemoteError,
};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1/";

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

/// ID used for playlist items that have no catalogue ID (local files,
/// unavailable tracks). Keeps positions aligned with the remote list.
pub fn placeholder_id(position: usize) -> String {
    format!("local:{}", position)
}

/* ---------- Playlist ---------- */

#[derive(Debug, Clone, Deserialize)]
struct PlaylistResponse {
    id: String,
    name: String,
    snapshot_id: String,
    tracks: ItemsPage,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next: Option<String>,
    total: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    track: Option<ItemTrack>,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemTrack {
    #[serde(default)]
    id: Option<String>,
}

/// Most items the API returns per page.
const ITEMS_PAGE_SIZE: usize = 100;

const ITEMS_FIELDS: &str = "total,next,items(track(id))";

fn item_ids(items: Vec<PlaylistItem>, first_position: usize) -> impl Iterator<Item = String> {
    items.into_iter().enumerate().map(move |(i, item)| {
        item.track
            .and_then(|track| track.id)
            .unwrap_or_else(|| placeholder_id(first_position + i))
    })
}

fn into_items_page(page: ItemsPage, offset: usize) -> PlaylistItemsPage {
    let track_ids: Vec<String> = item_ids(page.items, offset).collect();
    let next_offset = match page.next {
        Some(_) if !track_ids.is_empty() => Some(offset + track_ids.len()),
        _ => None,
    };
    PlaylistItemsPage {
        track_ids,
        total: page.total,
        next_offset,
    }
}

/// Fetches the playlist's metadata and its first page of items.
pub async fn get_playlist(
    client: &Client,
    base_url: &Url,
    token: &str,
    playlist_id: &str,
) -> Result<PlaylistHead, RemoteError> {
    let mut url = join(base_url, &format!("playlists/{}", playlist_id))?;
    url.query_pairs_mut().append_pair(
        "fields",
        &format!("id,name,snapshot_id,tracks({})", ITEMS_FIELDS),
    );

    let playlist: PlaylistResponse =
        send_json(client.get(url).bearer_auth(token), playlist_id).await?;

    Ok(PlaylistHead {
        id: playlist.id,
        name: playlist.name,
        snapshot_id: playlist.snapshot_id,
        first_page: into_items_page(playlist.tracks, 0),
    })
}

pub async fn get_playlist_items(
    client: &Client,
    base_url: &Url,
    token: &str,
    playlist_id: &str,
    offset: usize,
) -> Result<PlaylistItemsPage, RemoteError> {
    let mut url = join(base_url, &format!("playlists/{}/tracks", playlist_id))?;
    url.query_pairs_mut()
        .append_pair("offset", &offset.to_string())
        .append_pair("limit", &ITEMS_PAGE_SIZE.to_string())
        .append_pair("fields", ITEMS_FIELDS);

    let page: ItemsPage = send_json(client.get(url).bearer_auth(token), playlist_id).await?;
    log::trace!(
        "Fetched {} items of playlist {} at offset {}",
        page.items.len(),
        playlist_id,
        offset
    );
    Ok(into_items_page(page, offset))
}

/* ---------- Create playlist ---------- */

#[derive(Debug, Serialize)]
struct CreatePlaylistRequest<'a> {
    name: &'a str,
    public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
}

pub async fn create_playlist(
    client: &Client,
    base_url: &Url,
    token: &str,
    owner_id: &str,
    name: &str,
    options: &CreatePlaylistOptions,
) -> Result<String, RemoteError> {
    let url = join(base_url, &format!("users/{}/playlists", owner_id))?;
    let body = CreatePlaylistRequest {
        name,
        public: options.public,
        description: options.description.as_deref(),
    };

    let created: CreatedPlaylist =
        send_json(client.post(url).bearer_auth(token).json(&body), owner_id).await?;
    Ok(created.id)
}

/* ---------- Items ---------- */

#[derive(Debug, Serialize)]
struct AddItemsRequest {
    uris: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RemovePositionsRequest<'a> {
    positions: &'a [usize],
    snapshot_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    snapshot_id: String,
}

pub async fn add_items(
    client: &Client,
    base_url: &Url,
    token: &str,
    playlist_id: &str,
    track_ids: &[String],
) -> Result<String, RemoteError> {
    let url = join(base_url, &format!("playlists/{}/tracks", playlist_id))?;
    let body = AddItemsRequest {
        uris: track_ids.iter().map(|id| track_uri(id)).collect(),
    };

    let response: SnapshotResponse =
        send_json(client.post(url).bearer_auth(token).json(&body), playlist_id).await?;
    Ok(response.snapshot_id)
}

pub async fn remove_positions(
    client: &Client,
    base_url: &Url,
    token: &str,
    playlist_id: &str,
    positions: &[usize],
    snapshot_id: &str,
) -> Result<String, RemoteError> {
    let url = join(base_url, &format!("playlists/{}/tracks", playlist_id))?;
    let body = RemovePositionsRequest {
        positions,
        snapshot_id,
    };

    let response: SnapshotResponse =
        send_json(client.delete(url).bearer_auth(token).json(&body), playlist_id).await?;
    Ok(response.snapshot_id)
}

/* ---------- Transport ---------- */

fn join(base_url: &Url, path: &str) -> Result<Url, RemoteError> {
    base_url
        .join(path)
        .map_err(|e| RemoteError::Transient(format!("Invalid URL for {}: {}", path, e)))
}

async fn send_json<T: for<'de> Deserialize<'de>>(
    request: RequestBuilder,
    subject: &str,
) -> Result<T, RemoteError> {
    let response = request
        .send()
        .await
        .map_err(|e| RemoteError::Transient(e.to_string()))?;
    let response = check_status(response, subject).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Transient(format!("Failed to deserialize response: {}", e)))
}

async fn check_status(response: Response, subject: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body, subject))
}

/// Maps a failed HTTP response onto the port's error kinds.
pub fn classify_failure(status: StatusCode, body: &str, subject: &str) -> RemoteError {
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(subject.to_string()),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            RemoteError::Conflict(format!("{}: {}", status, body))
        }
        StatusCode::BAD_REQUEST if body.to_lowercase().contains("snapshot") => {
            RemoteError::Conflict(format!("{}: {}", status, body))
        }
        _ => RemoteError::Transient(format!("{}: {}", status, body)),
    }
}
