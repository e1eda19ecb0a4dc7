//! Reference-host fixture
//!
//! The in-memory host is driven by a TOML fixture describing the host
//! application's named routes and its factory blueprints. A built-in fixture
//! covers the common case of a user model plus a handful of pages.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use testwire_common::{AttributeMap, RouteDescriptor};

/// Built-in fixture used when no fixture file is configured.
const DEFAULT_FIXTURE: &str = r#"
[auth]
user_model = "user"

[[route]]
name = "home"
uri = "/"
action = "HomeController@index"

[[route]]
name = "dashboard"
uri = "dashboard"
action = "DashboardController@show"

[[route]]
name = "team.show"
uri = "teams/{team}"
action = "TeamController@show"

[[route]]
name = "posts.store"
uri = "posts"
methods = ["POST"]
action = "PostController@store"

[[route]]
name = "verification.verify"
uri = "email/verify/{id}/{hash}"
action = "VerificationController@verify"

[factory.user]
hidden = ["password", "remember_token"]

[factory.user.defaults]
name = "User {n}"
email = "user{n}@example.com"
password = "secret"
remember_token = "token-{n}"

[factory.post]

[factory.post.defaults]
title = "Post {n}"
body = "Lorem ipsum"
published = true
"#;

/// Fixture for the reference host: route table plus factory blueprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    #[serde(default)]
    pub auth: AuthFixture,

    #[serde(default, rename = "route")]
    pub routes: Vec<RouteFixture>,

    #[serde(default, rename = "factory")]
    pub factories: BTreeMap<String, FactoryBlueprint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthFixture {
    /// Model name the login endpoint looks up and seeds.
    pub user_model: String,
}

impl Default for AuthFixture {
    fn default() -> Self {
        Self {
            user_model: "user".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteFixture {
    pub name: String,
    pub uri: String,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub domain: Option<String>,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string(), "HEAD".to_string()]
}

impl From<RouteFixture> for RouteDescriptor {
    fn from(fixture: RouteFixture) -> Self {
        RouteDescriptor {
            name: fixture.name,
            domain: fixture.domain,
            action: fixture.action,
            uri: fixture.uri,
            methods: fixture.methods,
        }
    }
}

/// Blueprint for one model factory: default attributes (with `{n}` sequence
/// substitution in strings) and the attribute names hidden from responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactoryBlueprint {
    #[serde(default)]
    pub defaults: AttributeMap,
    #[serde(default)]
    pub hidden: Vec<String>,
}

impl FixtureConfig {
    /// Load a fixture from file, falling back to the built-in fixture when
    /// the path does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn route_descriptors(&self) -> Vec<RouteDescriptor> {
        self.routes.iter().cloned().map(Into::into).collect()
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_FIXTURE).expect("built-in fixture parses")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_fixture_parses() {
        let fixture = FixtureConfig::default();
        assert_eq!(fixture.auth.user_model, "user");
        assert!(fixture.routes.iter().any(|r| r.name == "verification.verify"));

        let user = fixture.factories.get("user").unwrap();
        assert_eq!(user.defaults.get("password"), Some(&json!("secret")));
        assert!(user.hidden.contains(&"password".to_string()));
    }

    #[test]
    fn methods_default_to_get_head() {
        let fixture: FixtureConfig = toml::from_str(
            r#"
            [[route]]
            name = "home"
            uri = "/"
            "#,
        )
        .unwrap();
        assert_eq!(fixture.routes[0].methods, vec!["GET", "HEAD"]);
    }

    #[test]
    fn load_missing_file_falls_back_to_builtin() {
        let fixture = FixtureConfig::load(Path::new("/nonexistent/fixture.toml")).unwrap();
        assert!(!fixture.routes.is_empty());
    }

    #[test]
    fn load_reads_custom_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.toml");
        std::fs::write(
            &path,
            r#"
            [auth]
            user_model = "member"

            [[route]]
            name = "landing"
            uri = "/"

            [factory.member]
            hidden = ["secret"]

            [factory.member.defaults]
            handle = "member-{n}"
            secret = "hunter2"
            "#,
        )
        .unwrap();

        let fixture = FixtureConfig::load(&path).unwrap();
        assert_eq!(fixture.auth.user_model, "member");
        assert_eq!(fixture.routes.len(), 1);
        assert!(fixture.factories.contains_key("member"));
    }
}
