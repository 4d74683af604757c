//! storefront service library.
//!
//! The crate ships the `storefront` binary; the library surface exists so the
//! end-to-end suite can build the router against its own database.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod server;
pub mod state;
pub mod telemetry;
