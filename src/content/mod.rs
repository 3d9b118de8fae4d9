//! Content Module
//! Mission: Page comments (author taken from the token) and per-article share tallies

pub mod api;
pub mod store;

pub use store::ContentStore;
