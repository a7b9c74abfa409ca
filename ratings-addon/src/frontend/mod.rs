pub mod stremio;
