pub mod backend;
pub mod config;
pub mod frontend;
pub mod stream;
