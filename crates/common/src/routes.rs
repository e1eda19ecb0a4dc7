//! Named-route table: snapshot, resolution, and the on-disk cache
//!
//! The table is a point-in-time snapshot of the host application's named
//! routes, keyed by name. The client persists it wholesale to a JSON file and
//! reuses it across test runs to resolve route references into URLs without a
//! round trip.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{AttributeMap, RouteDescriptor};

/// Mapping from route name to descriptor. One entry per distinct name;
/// when the host registers duplicates, the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: BTreeMap<String, RouteDescriptor>,
}

impl RouteTable {
    pub fn from_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = RouteDescriptor>,
    {
        let mut table = BTreeMap::new();
        for route in routes {
            table.insert(route.name.clone(), route);
        }
        Self { routes: table }
    }

    pub fn get(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.get(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RouteDescriptor)> {
        self.routes.iter()
    }

    /// Resolve a route name and parameters into a path.
    ///
    /// `{param}` segments substitute the matching parameter; `{param?}`
    /// segments are dropped when the parameter is absent. A missing required
    /// parameter is an error.
    pub fn resolve(&self, name: &str, parameters: &AttributeMap) -> Result<String> {
        let route = self.get(name).ok_or_else(|| Error::RouteNotFound {
            name: name.to_string(),
        })?;

        let mut segments = Vec::new();
        for segment in route.uri.split('/').filter(|s| !s.is_empty()) {
            if let Some(param) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                let (param, optional) = match param.strip_suffix('?') {
                    Some(p) => (p, true),
                    None => (param, false),
                };
                match parameters.get(param).filter(|v| !v.is_null()) {
                    Some(value) => segments.push(param_to_string(value)),
                    None if optional => continue,
                    None => {
                        return Err(Error::MissingRouteParameter {
                            route: name.to_string(),
                            parameter: param.to_string(),
                        })
                    }
                }
            } else {
                segments.push(segment.to_string());
            }
        }

        Ok(normalize_path(&segments.join("/")))
    }

    /// The canonical navigation method for a route: the first declared one.
    pub fn method_of(&self, name: &str) -> Result<String> {
        let route = self.get(name).ok_or_else(|| Error::RouteNotFound {
            name: name.to_string(),
        })?;
        Ok(route
            .methods
            .first()
            .cloned()
            .unwrap_or_else(|| "GET".to_string()))
    }

    /// Load the table from a cache file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overwrite the cache file with this table. Single writer, whole-file
    /// replacement; no locking discipline needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl FromIterator<RouteDescriptor> for RouteTable {
    fn from_iter<I: IntoIterator<Item = RouteDescriptor>>(iter: I) -> Self {
        Self::from_routes(iter)
    }
}

fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collapse a path to exactly one leading slash.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
