//! Host application seam
//!
//! Every bridge operation is a single pass-through to a service the host
//! application already has: its route table, its user store, its model
//! factories, its command runner. `HostApp` is that seam. The bridge never
//! reaches around it.

mod fixture;
mod memory;

pub use fixture::{FactoryBlueprint, FixtureConfig, RouteFixture};
pub use memory::{CommandInvocation, MemoryHost};

use async_trait::async_trait;
use serde_json::Value;
use testwire_common::{AttributeMap, Record, RouteDescriptor};

/// The host application's services, as consumed by the bridge endpoints.
#[async_trait]
pub trait HostApp: Send + Sync {
    /// Snapshot of the host's named routes.
    fn routes(&self) -> Vec<RouteDescriptor>;

    /// First user record matching the attribute filter.
    async fn find_user(&self, filter: &AttributeMap) -> anyhow::Result<Option<Record>>;

    /// Create a user through the user-model factory with the given overrides.
    async fn create_user(&self, overrides: &AttributeMap) -> anyhow::Result<Record>;

    /// Build `times` instances of `model`, persisting them unless told not to.
    async fn factory(
        &self,
        model: &str,
        times: u32,
        overrides: &AttributeMap,
        persist: bool,
    ) -> anyhow::Result<Vec<Record>>;

    /// Dispatch an administrative command; output is not captured.
    async fn run_command(&self, command: &str, parameters: &[String]) -> anyhow::Result<()>;

    /// Evaluate a normalized expression fragment in the host runtime.
    ///
    /// This is the unsafe-execution boundary: a host grants the capability by
    /// overriding this method. The default refuses, so the `/eval` endpoint
    /// stays inert even when enabled in the server config.
    async fn eval(&self, _fragment: &str) -> anyhow::Result<Value> {
        anyhow::bail!("expression evaluation is not supported by this host")
    }

    /// The value hashed into a user's email verification URL.
    fn verification_key(&self, user: &Record) -> String {
        user.get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}
