//! Domain layer types and invariants.

pub mod freshness;
pub mod keys;
pub mod resource;
pub mod rewrite;
