//! IMDb ratings ingestion and lookup
//!
//! fetcher → parser → cache (snapshot swap) → lookup, driven by the updater.

pub mod cache;
pub mod fetcher;
pub mod lookup;
pub mod parser;
pub mod types;
pub mod updater;

pub use cache::CacheStore;
pub use fetcher::{DatasetDescriptor, DatasetSource, FetchError, HttpDatasetFetcher, LineStream};
pub use lookup::{EpisodeMatch, LookupEngine, LookupError};
pub use types::{CacheSnapshot, CacheStatus, EpisodeKey, RatingRecord};
pub use updater::{
    DatasetKind, RatingsUpdater, RefreshError, RefreshOutcome, RefreshReport, RefreshState,
    RefreshStatus,
};
