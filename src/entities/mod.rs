pub mod playlist_link;
