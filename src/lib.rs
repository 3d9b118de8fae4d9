//! Streetdelic Backend Library
//!
//! Exposes the API pieces for the binary and integration tests, plus the
//! client-side session lifecycle used by the pages that call the API.

pub mod app;
pub mod auth;
pub mod config;
pub mod content;
pub mod middleware;
pub mod session;
