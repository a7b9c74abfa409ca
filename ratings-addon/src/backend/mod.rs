pub mod client;

pub use client::{ClientError, RatingsApi, RatingsClient};
