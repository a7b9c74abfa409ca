//! Types shared between the ratings backend and its consumers.
//!
//! - [`types`]: JSON bodies of the query interface
//! - [`logging`]: console + rolling file logging used by every binary

pub mod logging;
pub mod types;

pub use types::{
    is_title_id, EpisodeRating, ErrorBody, NotFoundReason, RatingKind, TitleRating,
    TITLE_ID_PREFIX,
};
