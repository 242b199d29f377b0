//! Fetcher implementations.

pub mod http;

pub use http::{HttpImageSource, HttpPageFetcher};
