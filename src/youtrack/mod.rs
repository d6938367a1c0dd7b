//! YouTrack REST client used as the search engine's issue fetcher

mod client;

pub use client::{mask_token, YouTrackClient, USER_AGENT};
