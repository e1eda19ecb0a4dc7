//! In-memory reference host
//!
//! A toy host application backing the `testwired` binary and the test
//! suites: fixture-defined routes and factories over plain in-memory stores.
//! Useful on its own for bridge development, and as the template for wiring
//! a real application behind [`HostApp`].

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use testwire_common::{AttributeMap, Record, RouteDescriptor};

use super::fixture::{FactoryBlueprint, FixtureConfig};
use super::HostApp;

/// One dispatched administrative command, as recorded by the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: String,
    pub parameters: Vec<String>,
}

#[derive(Default)]
struct StoreState {
    /// Persisted records per model.
    rows: HashMap<String, Vec<Record>>,
    /// Factory sequence counters per model. Monotonic for the process
    /// lifetime; a store flush does not rewind them.
    sequences: HashMap<String, u64>,
    /// Next identity key per model. Monotonic like the sequences.
    next_ids: HashMap<String, u64>,
    /// Journal of dispatched commands, in order.
    commands: Vec<CommandInvocation>,
}

pub struct MemoryHost {
    fixture: FixtureConfig,
    allow_eval: bool,
    state: RwLock<StoreState>,
}

impl MemoryHost {
    pub fn new(fixture: FixtureConfig) -> Self {
        Self {
            fixture,
            allow_eval: false,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Opt in to expression evaluation (JSON literals only).
    pub fn with_eval(mut self, allow: bool) -> Self {
        self.allow_eval = allow;
        self
    }

    pub fn user_model(&self) -> &str {
        &self.fixture.auth.user_model
    }

    /// Commands dispatched so far, oldest first.
    pub fn commands(&self) -> Vec<CommandInvocation> {
        self.state.read().commands.clone()
    }

    /// Number of persisted records for a model.
    pub fn count(&self, model: &str) -> usize {
        self.state
            .read()
            .rows
            .get(model)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Persisted records for a model.
    pub fn records(&self, model: &str) -> Vec<Record> {
        self.state.read().rows.get(model).cloned().unwrap_or_default()
    }

    fn blueprint(&self, model: &str) -> anyhow::Result<&FactoryBlueprint> {
        self.fixture
            .factories
            .get(model)
            .ok_or_else(|| anyhow::anyhow!("no factory defined for model `{}`", model))
    }

    fn build_record(
        &self,
        state: &mut StoreState,
        model: &str,
        blueprint: &FactoryBlueprint,
        overrides: &AttributeMap,
    ) -> Record {
        let sequence = state.sequences.entry(model.to_string()).or_insert(0);
        *sequence += 1;
        let n = sequence.to_string();

        let mut attributes = AttributeMap::new();
        for (key, value) in &blueprint.defaults {
            let value = match value {
                Value::String(s) => Value::String(s.replace("{n}", &n)),
                other => other.clone(),
            };
            attributes.insert(key.clone(), value);
        }
        for (key, value) in overrides {
            attributes.insert(key.clone(), value.clone());
        }

        Record::new(attributes).with_hidden(blueprint.hidden.clone())
    }

    fn persist(&self, state: &mut StoreState, model: &str, mut record: Record) -> Record {
        let next_id = state.next_ids.entry(model.to_string()).or_insert(0);
        *next_id += 1;
        record.set("id", Value::from(*next_id));
        state
            .rows
            .entry(model.to_string())
            .or_default()
            .push(record.clone());
        record
    }
}

#[async_trait]
impl HostApp for MemoryHost {
    fn routes(&self) -> Vec<RouteDescriptor> {
        self.fixture.route_descriptors()
    }

    async fn find_user(&self, filter: &AttributeMap) -> anyhow::Result<Option<Record>> {
        let state = self.state.read();
        Ok(state
            .rows
            .get(self.user_model())
            .and_then(|rows| rows.iter().find(|r| r.matches(filter)))
            .cloned())
    }

    async fn create_user(&self, overrides: &AttributeMap) -> anyhow::Result<Record> {
        let mut records = self.factory(self.user_model(), 1, overrides, true).await?;
        Ok(records.remove(0))
    }

    async fn factory(
        &self,
        model: &str,
        times: u32,
        overrides: &AttributeMap,
        persist: bool,
    ) -> anyhow::Result<Vec<Record>> {
        let blueprint = self.blueprint(model)?;
        let mut state = self.state.write();

        let mut records = Vec::with_capacity(times as usize);
        for _ in 0..times {
            let record = self.build_record(&mut state, model, blueprint, overrides);
            records.push(if persist {
                self.persist(&mut state, model, record)
            } else {
                record
            });
        }

        debug!(model, times, persist, "factory");
        Ok(records)
    }

    async fn run_command(&self, command: &str, parameters: &[String]) -> anyhow::Result<()> {
        let mut state = self.state.write();
        state.commands.push(CommandInvocation {
            command: command.to_string(),
            parameters: parameters.to_vec(),
        });

        if command == "migrate:fresh" {
            state.rows.clear();
            info!("flushed in-memory store");
        } else {
            info!(command, ?parameters, "recorded command");
        }
        Ok(())
    }

    async fn eval(&self, fragment: &str) -> anyhow::Result<Value> {
        if !self.allow_eval {
            anyhow::bail!("expression evaluation is not supported by this host");
        }

        // The reference host only evaluates JSON literals: everything after
        // the `return` keyword, up to the statement terminator.
        let expr = fragment
            .split_once("return")
            .map(|(_, rest)| rest)
            .unwrap_or(fragment)
            .trim()
            .trim_end_matches(';')
            .trim();

        serde_json::from_str(expr)
            .map_err(|_| anyhow::anyhow!("only literal expressions are supported: `{}`", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    fn host() -> MemoryHost {
        MemoryHost::new(FixtureConfig::default())
    }

    #[tokio::test]
    async fn factory_merges_defaults_and_overrides() {
        let host = host();
        let records = host
            .factory("user", 1, &attrs(json!({"name": "Jo"})), true)
            .await
            .unwrap();

        let record = &records[0];
        assert_eq!(record.get("name"), Some(&json!("Jo")));
        assert_eq!(record.get("email"), Some(&json!("user1@example.com")));
        assert_eq!(record.get("id"), Some(&json!(1)));
        assert!(record.hidden().contains(&"password".to_string()));
    }

    #[tokio::test]
    async fn factory_sequences_increment_per_model() {
        let host = host();
        let users = host
            .factory("user", 2, &AttributeMap::new(), true)
            .await
            .unwrap();
        assert_eq!(users[0].get("email"), Some(&json!("user1@example.com")));
        assert_eq!(users[1].get("email"), Some(&json!("user2@example.com")));

        let posts = host
            .factory("post", 1, &AttributeMap::new(), true)
            .await
            .unwrap();
        assert_eq!(posts[0].get("title"), Some(&json!("Post 1")));
    }

    #[tokio::test]
    async fn make_only_records_are_not_persisted() {
        let host = host();
        let records = host
            .factory("user", 2, &AttributeMap::new(), false)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.id().is_none()));
        assert_eq!(host.count("user"), 0);
    }

    #[tokio::test]
    async fn unknown_model_errors() {
        let host = host();
        assert!(host
            .factory("widget", 1, &AttributeMap::new(), true)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn find_user_matches_filter() {
        let host = host();
        host.factory("user", 1, &attrs(json!({"name": "Jo"})), true)
            .await
            .unwrap();
        host.factory("user", 1, &attrs(json!({"name": "Sam"})), true)
            .await
            .unwrap();

        let found = host
            .find_user(&attrs(json!({"name": "Sam"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("id"), Some(&json!(2)));

        assert!(host
            .find_user(&attrs(json!({"name": "Nobody"})))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn migrate_fresh_flushes_rows_but_not_counters() {
        let host = host();
        host.factory("user", 1, &AttributeMap::new(), true)
            .await
            .unwrap();
        host.run_command("migrate:fresh", &[]).await.unwrap();

        assert_eq!(host.count("user"), 0);
        let recreated = host
            .factory("user", 1, &AttributeMap::new(), true)
            .await
            .unwrap();
        // Identity keys keep climbing after a flush.
        assert_eq!(recreated[0].get("id"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn command_journal_records_in_order() {
        let host = host();
        host.run_command("db:seed", &["--class=PlanSeeder".to_string()])
            .await
            .unwrap();
        host.run_command("cache:clear", &[]).await.unwrap();

        let journal = host.commands();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].command, "db:seed");
        assert_eq!(journal[0].parameters, vec!["--class=PlanSeeder"]);
        assert_eq!(journal[1].command, "cache:clear");
    }

    #[tokio::test]
    async fn eval_requires_opt_in_and_literals() {
        let host = host();
        assert!(host.eval("return 1;").await.is_err());

        let host = MemoryHost::new(FixtureConfig::default()).with_eval(true);
        assert_eq!(
            host.eval("return [1, 2, 3];").await.unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(
            host.eval("return {\"ok\": true};").await.unwrap(),
            json!({"ok": true})
        );
        assert!(host.eval("return 2 + 2;").await.is_err());
    }
}
