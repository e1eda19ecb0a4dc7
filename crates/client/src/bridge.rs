//! The bridge commands
//!
//! Every mutating command fetches a fresh anti-forgery token, issues one POST
//! with the token embedded in the body, and unwraps the response body as its
//! return value. Commands never run concurrently within a test: the caller's
//! `.await` sequencing is the ordering guarantee.

use std::path::PathBuf;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use testwire_common::routes::normalize_path;
use testwire_common::{
    default_routes_cache_path, AttributeMap, CommandRequest, EvalRequest, EvalResponse,
    FactoryOutcome, FactoryRequest, LoginRequest, Record, RouteTable, TokenRequest,
    VerificationUrlRequest, DEFAULT_PREFIX,
};

use crate::error::{ClientError, ClientResult};

/// A navigation target: a literal path, or a named route reference resolved
/// against the cached route table.
#[derive(Debug, Clone)]
pub enum Target {
    Path(String),
    Route {
        name: String,
        parameters: AttributeMap,
    },
}

impl Target {
    pub fn path(path: impl Into<String>) -> Self {
        Target::Path(path.into())
    }

    pub fn route(name: impl Into<String>) -> Self {
        Target::Route {
            name: name.into(),
            parameters: AttributeMap::new(),
        }
    }

    pub fn route_with(name: impl Into<String>, parameters: AttributeMap) -> Self {
        Target::Route {
            name: name.into(),
            parameters,
        }
    }
}

/// Outcome of a navigation command.
#[derive(Debug, Clone)]
pub struct Visited {
    /// Full URL that was requested.
    pub url: String,
    /// Path component, as compared by `assert_location`.
    pub path: String,
    /// Response status code.
    pub status: u16,
}

/// Client-side half of the bridge.
pub struct Bridge {
    http: reqwest::Client,
    base_url: String,
    prefix: String,
    cache_path: PathBuf,
    routes: RwLock<Option<RouteTable>>,
    location: RwLock<Option<String>>,
}

impl Bridge {
    /// Create a bridge client against a server base URL.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Url::parse(base_url)?;
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            cache_path: default_routes_cache_path(),
            routes: RwLock::new(None),
            location: RwLock::new(None),
        })
    }

    /// Override the bridge path prefix.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = format!("/{}", prefix.trim_matches('/'));
        self
    }

    /// Override where the route table cache is persisted.
    pub fn with_routes_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Fetch a fresh anti-forgery token.
    pub async fn csrf_token(&self) -> ClientResult<String> {
        let response = self.http.get(self.endpoint("csrf_token")).send().await?;
        let token: String = ensure_success(response).await?.json().await?;
        debug!(command = "csrf_token", "fetched token");
        Ok(token)
    }

    /// Log in as the first user matching the attributes, creating one when
    /// none exists.
    pub async fn login(&self, attributes: AttributeMap) -> ClientResult<Record> {
        let token = self.csrf_token().await?;
        let user: Record = self
            .post("login", &LoginRequest { attributes: attributes.clone(), token })
            .await?;
        info!(command = "login", ?attributes, user = ?user.id(), "logged in");
        Ok(user)
    }

    /// Log out the current user.
    pub async fn logout(&self) -> ClientResult<()> {
        let token = self.csrf_token().await?;
        self.post_empty("logout", &TokenRequest { token }).await?;
        info!(command = "logout", "logged out");
        Ok(())
    }

    /// Fetch the live route table and persist it to the cache file for reuse
    /// by `visit` and `assert_location`.
    pub async fn refresh_routes(&self) -> ClientResult<RouteTable> {
        let token = self.csrf_token().await?;
        let table: RouteTable = self.post("routes", &TokenRequest { token }).await?;

        table.save(&self.cache_path)?;
        *self.routes.write().await = Some(table.clone());
        info!(
            command = "refresh_routes",
            routes = table.len(),
            cache = %self.cache_path.display(),
            "refreshed route table"
        );
        Ok(table)
    }

    /// Create `times` persisted records of `model`.
    pub async fn create(
        &self,
        model: &str,
        times: u32,
        attributes: AttributeMap,
    ) -> ClientResult<FactoryOutcome> {
        self.factory(model, times, attributes, false).await
    }

    /// Build `times` records of `model` without persisting them.
    pub async fn make(
        &self,
        model: &str,
        times: u32,
        attributes: AttributeMap,
    ) -> ClientResult<FactoryOutcome> {
        self.factory(model, times, attributes, true).await
    }

    async fn factory(
        &self,
        model: &str,
        times: u32,
        attributes: AttributeMap,
        make_only: bool,
    ) -> ClientResult<FactoryOutcome> {
        let token = self.csrf_token().await?;
        let outcome: FactoryOutcome = self
            .post(
                "factory",
                &FactoryRequest {
                    model: model.to_string(),
                    times,
                    attributes,
                    make_only,
                    token,
                },
            )
            .await?;
        info!(
            command = if make_only { "make" } else { "create" },
            model,
            times,
            "factory"
        );
        Ok(outcome)
    }

    /// Dispatch an administrative command on the host.
    pub async fn command(&self, command: &str, parameters: Vec<String>) -> ClientResult<()> {
        let token = self.csrf_token().await?;
        self.post_empty(
            "command",
            &CommandRequest {
                command: command.to_string(),
                parameters: parameters.clone(),
                token,
            },
        )
        .await?;
        info!(command = "command", name = command, ?parameters, "dispatched");
        Ok(())
    }

    /// Refresh the database state.
    pub async fn refresh_database(&self, options: Vec<String>) -> ClientResult<()> {
        self.command("migrate:fresh", options).await
    }

    /// Seed the database, optionally with a specific seeder.
    pub async fn seed(&self, seeder: Option<&str>) -> ClientResult<()> {
        let parameters = seeder
            .map(|class| vec![format!("--class={}", class)])
            .unwrap_or_default();
        self.command("db:seed", parameters).await
    }

    /// Evaluate an expression fragment on the host and return its result.
    pub async fn eval(&self, fragment: &str) -> ClientResult<Value> {
        let token = self.csrf_token().await?;
        let response: EvalResponse = self
            .post(
                "eval",
                &EvalRequest {
                    command: fragment.to_string(),
                    token,
                },
            )
            .await?;
        info!(command = "eval", fragment, "evaluated");
        Ok(response.result)
    }

    /// Retrieve a signed email verification URL for the matching user.
    pub async fn email_verification_url(&self, attributes: AttributeMap) -> ClientResult<String> {
        let token = self.csrf_token().await?;
        let url: String = self
            .post(
                "email_verification_url",
                &VerificationUrlRequest { attributes, token },
            )
            .await?;
        info!(command = "email_verification_url", url, "generated");
        Ok(url)
    }

    /// Navigate to a literal path or a named route.
    ///
    /// Route targets resolve the URL and infer the HTTP method from the
    /// cached route table; no token fetch is involved.
    pub async fn visit(&self, target: Target) -> ClientResult<Visited> {
        let (path, method) = match &target {
            Target::Path(path) => (normalize_path(path), Method::GET),
            Target::Route { name, parameters } => {
                let table = self.route_table().await?;
                let path = table.resolve(name, parameters)?;
                let method = table.method_of(name)?;
                let method = Method::from_bytes(method.as_bytes())
                    .map_err(|_| ClientError::InvalidMethod(method))?;
                (path, method)
            }
        };

        let url = format!("{}{}", self.base_url, path);
        let response = self.http.request(method.clone(), url.as_str()).send().await?;
        let status = ensure_success(response).await?.status().as_u16();

        *self.location.write().await = Some(path.clone());
        info!(command = "visit", %method, url, status, "visited");
        Ok(Visited { url, path, status })
    }

    /// Assert that the last visited path matches the target.
    pub async fn assert_location(&self, target: Target) -> ClientResult<()> {
        let expected = match &target {
            Target::Path(path) => normalize_path(path),
            Target::Route { name, parameters } => {
                self.route_table().await?.resolve(name, parameters)?
            }
        };

        let actual = self
            .location
            .read()
            .await
            .clone()
            .ok_or_else(|| ClientError::Assertion("no navigation has happened".to_string()))?;

        if actual != expected {
            return Err(ClientError::Assertion(format!(
                "expected location {}, got {}",
                expected, actual
            )));
        }
        Ok(())
    }

    /// Resolve a named route against the cached table without navigating.
    pub async fn resolve_route(
        &self,
        name: &str,
        parameters: &AttributeMap,
    ) -> ClientResult<String> {
        Ok(self.route_table().await?.resolve(name, parameters)?)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// The in-memory route table, falling back to the cache file.
    async fn route_table(&self) -> ClientResult<RouteTable> {
        if let Some(table) = self.routes.read().await.clone() {
            return Ok(table);
        }
        if self.cache_path.exists() {
            let table = RouteTable::load(&self.cache_path)?;
            *self.routes.write().await = Some(table.clone());
            return Ok(table);
        }
        Err(ClientError::RoutesCacheMissing)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, self.prefix, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn post_empty<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<()> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Treat any non-success status as a failed test step, carrying the server's
/// error text.
async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testwire_common::RouteDescriptor;

    fn params(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn target_constructors() {
        assert!(matches!(Target::path("/dash"), Target::Path(p) if p == "/dash"));
        match Target::route_with("team.show", params(json!({"team": 3}))) {
            Target::Route { name, parameters } => {
                assert_eq!(name, "team.show");
                assert_eq!(parameters.get("team"), Some(&json!(3)));
            }
            Target::Path(_) => panic!("expected route target"),
        }
    }

    #[tokio::test]
    async fn route_resolution_requires_a_cache() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Bridge::new("http://127.0.0.1:1")
            .unwrap()
            .with_routes_cache(dir.path().join("routes.json"));

        let err = bridge
            .resolve_route("home", &AttributeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RoutesCacheMissing));
    }

    #[tokio::test]
    async fn route_resolution_reads_the_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("routes.json");

        let table = RouteTable::from_routes([RouteDescriptor {
            name: "team.show".to_string(),
            domain: None,
            action: String::new(),
            uri: "teams/{team}".to_string(),
            methods: vec!["GET".to_string(), "HEAD".to_string()],
        }]);
        table.save(&cache).unwrap();

        let bridge = Bridge::new("http://127.0.0.1:1")
            .unwrap()
            .with_routes_cache(&cache);
        let path = bridge
            .resolve_route("team.show", &params(json!({"team": 9})))
            .await
            .unwrap();
        assert_eq!(path, "/teams/9");
    }

    #[tokio::test]
    async fn assert_location_before_navigation_fails() {
        let bridge = Bridge::new("http://127.0.0.1:1").unwrap();
        let err = bridge
            .assert_location(Target::path("/dashboard"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Assertion(_)));
    }
}
