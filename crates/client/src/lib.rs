//! Testwire bridge command set
//!
//! Client-side half of the bridge: a library of async test-runner commands,
//! each issuing one HTTP request to the matching bridge endpoint and
//! normalizing the response for test assertions.
//!
//! ```no_run
//! use testwire_client::{Bridge, Target};
//!
//! # async fn demo() -> Result<(), testwire_client::ClientError> {
//! let bridge = Bridge::new("http://127.0.0.1:8977")?;
//!
//! let user = bridge.login(serde_json::Map::new()).await?;
//! bridge.refresh_routes().await?;
//! bridge.visit(Target::route("dashboard")).await?;
//! bridge.assert_location(Target::path("/dashboard")).await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;

pub use bridge::{Bridge, Target, Visited};
pub use error::{ClientError, ClientResult};
