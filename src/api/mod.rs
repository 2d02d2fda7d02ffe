//! HTTP API
//!
//! Threshold management, alert/audit browsing, and an HTTP ingest endpoint
//! that feeds the same pipeline as the broker consumer.

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{build_router, run_server, ServerConfig};
