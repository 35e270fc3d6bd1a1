//! Resource shapes exchanged with the hosting API.
//!
//! Found resources keep fields this crate does not model in `extra`, so
//! an update sends back everything the API returned.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::desired::AccessLevel;

pub const STATUS_ACTIVE: &str = "active";

/// One page of a `*Find` call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total_entries: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total_entries: 0,
        }
    }
}

/// Resources that boot asynchronously after creation.
pub trait Provisionable {
    fn id(&self) -> &str;
    fn status(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webspace {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub webspace_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub host_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cron_jobs: Vec<CronJob>,
    #[serde(default, deserialize_with = "nullable")]
    pub redis_enabled: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub accesses: Vec<WebspaceAccess>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Provisionable for Webspace {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

/// Payload of `webspaceCreate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWebspace {
    pub name: String,
    pub account_id: Option<String>,
    pub comments: String,
    pub product_code: String,
    pub cron_jobs: Vec<CronJob>,
    pub redis_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebspaceAccess {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webspace_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub ssh_access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftp_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_access: Option<bool>,
}

impl WebspaceAccess {
    #[must_use]
    pub fn ssh(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ssh_access: true,
            ..Self::default()
        }
    }
}

/// Cron job in the exact shape the API returns, every field defaulted
/// so found and desired jobs compare equal when they mean the same.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub comments: String,
    #[serde(default, deserialize_with = "nullable")]
    pub day_of_month: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub daypart: String,
    #[serde(default, deserialize_with = "nullable")]
    pub hour: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub interpreter_version: String,
    #[serde(default, deserialize_with = "nullable")]
    pub minute: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub parameters: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub schedule: String,
    #[serde(default, deserialize_with = "nullable")]
    pub script: String,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub weekday: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebspaceUser {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ssh_key: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vhost {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub domain_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub webspace_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub server_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub web_root: String,
    #[serde(default, deserialize_with = "nullable")]
    pub php_version: String,
    #[serde(default, deserialize_with = "nullable")]
    pub enable_alias: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub redirect_to_primary_name: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub redirect_http_to_https: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub locations: Vec<VhostLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_settings: Option<SslSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VhostLocation {
    pub match_string: String,
    pub match_type: MatchType,
    pub location_type: LocationType,
    #[serde(default, deserialize_with = "nullable")]
    pub map_script: String,
    #[serde(default, deserialize_with = "nullable")]
    pub php_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Regex,
    Directory,
    Default,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationType {
    Generic,
    BlockAccess,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslSettings {
    pub profile: String,
    #[serde(default, deserialize_with = "nullable")]
    pub managed_ssl_product_code: String,
}

impl Default for SslSettings {
    fn default() -> Self {
        Self {
            profile: "modern".to_string(),
            managed_ssl_product_code: "ssl-letsencrypt-dv-3m".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpIniValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub db_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub host_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub product_code: String,
    #[serde(default, deserialize_with = "nullable")]
    pub force_ssl: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub storage_quota: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub comments: String,
    #[serde(default, deserialize_with = "nullable")]
    pub accesses: Vec<DatabaseAccess>,
}

impl Provisionable for Database {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

impl Database {
    #[must_use]
    pub fn access_of(&self, user_id: &str) -> Option<&DatabaseAccess> {
        self.accesses.iter().find(|a| a.user_id == user_id)
    }
}

/// Payload of `databaseCreate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDatabase {
    pub name: String,
    pub comments: String,
    pub product_code: String,
    pub storage_quota: u64,
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseAccess {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub access_level: Vec<AccessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub db_user_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
}

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
