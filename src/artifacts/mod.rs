//! Circuit artifacts: remote fetching and the local store.

pub mod fetch;
pub mod store;

pub use fetch::{Fetcher, HttpFetcher};
pub use store::{ArtifactStatus, ArtifactStore, DownloadSummary, Resolution};
