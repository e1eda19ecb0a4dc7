//! Testwire E2E test harness
//!
//! Spawns the `testwired` binary as a subprocess, waits for it to become
//! healthy, and hands tests a base URL to drive the bridge command set
//! against. The suites under `tests/` cover the bridge contract end to end:
//! route listing, login idempotence, factory counts, token relay, navigation
//! by named route, and the signed verification URL flow.

pub mod error;
pub mod server;

pub use error::{E2eError, E2eResult};
pub use server::{ServerConfig, ServerHandle};
