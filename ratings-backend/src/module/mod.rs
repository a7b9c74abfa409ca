pub mod imdb;
pub mod scheduled;
