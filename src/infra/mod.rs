pub mod cache_store;
pub mod error;
pub mod http;
pub mod origin;
pub mod telemetry;
pub mod tls;
