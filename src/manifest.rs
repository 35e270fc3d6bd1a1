//! Typed view of `.hosting/config.yaml`.
//!
//! Every optional field carries its default at deserialization time, so
//! the rest of the crate never has to merge defaults by hand.
//!
//! ```
//! use hostingde_deploy::Manifest;
//!
//! let manifest = Manifest::from_yaml(
//!     "applications:\n  web:\n    php:\n      version: '8.2'\n",
//! )
//! .unwrap();
//!
//! assert!(manifest.project.prune);
//! assert_eq!(manifest.app("web").unwrap().php.version.as_deref(), Some("8.2"));
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::desired::Privilege;
use crate::error::{HostingError, HostingResult};

/// Location of the manifest relative to the repository root.
pub const MANIFEST_PATH: &str = ".hosting/config.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub applications: IndexMap<String, AppConfig>,
    #[serde(default)]
    pub databases: DatabasesConfig,
    #[serde(default)]
    pub users: IndexMap<String, UserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// The environment (branch) other environments derive from.
    #[serde(default)]
    pub parent: Option<String>,
    /// Domain template used for every environment except `parent`.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_true")]
    pub prune: bool,
    #[serde(default)]
    pub pool: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            parent: None,
            domain: None,
            prune: true,
            pool: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabasesConfig {
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Endpoint name to `schema` or `schema:privilege`.
    #[serde(default)]
    pub endpoints: IndexMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub role: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub php: PhpConfig,
    #[serde(default)]
    pub env: IndexMap<String, Value>,
    /// Relationship name to `database`, `database:endpoint` or `redis`.
    #[serde(default)]
    pub relationships: IndexMap<String, String>,
    #[serde(default)]
    pub web: Vec<WebConfig>,
    #[serde(default)]
    pub cron: Vec<CronjobConfig>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub sync: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhpConfig {
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub ini: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebConfig {
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default = "default_true")]
    pub www: bool,
    #[serde(default)]
    pub locations: IndexMap<String, LocationConfig>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            domain_name: None,
            root: None,
            www: true,
            locations: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub passthru: Option<Passthru>,
    #[serde(default = "default_true")]
    pub allow: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            passthru: None,
            allow: true,
        }
    }
}

/// `passthru: /index.php` routes to a script, `passthru: false` turns
/// PHP off for the location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Passthru {
    Enabled(bool),
    Script(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CronjobConfig {
    #[serde(default)]
    pub php: Option<String>,
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub every: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub on: Option<String>,
}

/// A parsed relationship of the form `database[:endpoint]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRelationship {
    pub name: String,
    pub endpoint: String,
}

impl Manifest {
    pub fn load(path: &Path) -> HostingResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HostingError::Config(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> HostingResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn app(&self, key: &str) -> HostingResult<&AppConfig> {
        self.applications.get(key).ok_or_else(|| {
            HostingError::Config(format!(
                "cannot find \"applications.{key}\" in the \"{MANIFEST_PATH}\" file"
            ))
        })
    }

    /// Resolve an endpoint to its schema and privilege.
    pub fn database_endpoint(&self, endpoint: &str) -> HostingResult<(String, Privilege)> {
        let declared = self.databases.endpoints.get(endpoint).ok_or_else(|| {
            HostingError::Config(format!("could not find \"databases.endpoints.{endpoint}\""))
        })?;

        let (schema, privilege) = match declared.split_once(':') {
            Some((schema, privilege)) => (schema, Privilege::from_label(privilege)),
            None => (declared.as_str(), Privilege::Admin),
        };

        if !self.databases.schemas.iter().any(|s| s == schema) {
            return Err(HostingError::Config(format!(
                "could not find schema \"{schema}\" under \"databases.schemas\""
            )));
        }

        Ok((schema.to_string(), privilege))
    }
}

impl AppConfig {
    /// Relationships pointing at a database, with the endpoint defaulted
    /// to the application key.
    #[must_use]
    pub fn database_relationships(&self, app_key: &str) -> Vec<DatabaseRelationship> {
        self.relationships
            .iter()
            .filter_map(|(name, value)| {
                let mut parts = value.splitn(2, ':');
                if parts.next() != Some("database") {
                    return None;
                }
                let endpoint = parts
                    .next()
                    .filter(|e| !e.is_empty())
                    .unwrap_or(app_key);
                Some(DatabaseRelationship {
                    name: name.clone(),
                    endpoint: endpoint.to_string(),
                })
            })
            .collect()
    }

    /// Web entries, or a single default entry when none are declared.
    #[must_use]
    pub fn web_entries(&self) -> Vec<WebConfig> {
        if self.web.is_empty() {
            vec![WebConfig::default()]
        } else {
            self.web.clone()
        }
    }

    #[must_use]
    pub fn redis_relationship(&self) -> Option<&str> {
        self.relationships
            .iter()
            .find(|(_, value)| value.as_str() == "redis")
            .map(|(name, _)| name.as_str())
    }
}

const fn default_true() -> bool {
    true
}

/// Accept strings, numbers and booleans (`version: 8.2`, `on: 15`).
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }))
}
