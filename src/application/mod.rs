//! Application services layer.

pub mod cache;
pub mod error;
pub mod fonts;
pub mod origin;
