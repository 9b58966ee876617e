pub mod access_token;
pub mod playlist_ids;
pub mod remote_playlist;
