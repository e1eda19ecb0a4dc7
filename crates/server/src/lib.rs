//! Testwire bridge endpoint set
//!
//! A small axum router, mounted under a test-only path prefix, that lets an
//! end-to-end test run remote-control the host web application: session
//! login/logout, factory seeding, administrative commands, route-table
//! snapshots, signed verification URLs, and (behind a double opt-in)
//! expression evaluation.
//!
//! The host application's own services sit behind the [`host::HostApp`]
//! trait; the bridge owns none of them. [`host::MemoryHost`] is the in-tree
//! reference host driven by a TOML fixture.

pub mod config;
pub mod endpoints;
pub mod host;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use server::{router, serve, BridgeState};
