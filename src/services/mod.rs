pub mod playlist_ids;
pub mod spotify;
