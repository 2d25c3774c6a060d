//! Caching reverse proxy for web fonts.
//!
//! Stylesheets and font files are fetched from the upstream service on first
//! use, persisted on disk, and served from the cache until they expire.
//! Stylesheets are rewritten so every font URL points back at this proxy.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
