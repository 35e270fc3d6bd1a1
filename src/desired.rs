//! Translation of manifest entries into the representation the API
//! stores, so found resources can be compared field by field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha512};

use crate::api::types::{CronJob, LocationType, MatchType, PhpIniValue, VhostLocation};
use crate::error::{HostingError, HostingResult};
use crate::manifest::{CronjobConfig, LocationConfig, Passthru};

pub const MANAGED_COMMENT: &str = "Created by github action. Please do not change.";

/// Comment on webspaces and databases, whose names carry their identity.
pub const RESOURCE_COMMENT: &str = "Created by github action. Please do not change name.";

/// Extensions that need an explicit `extension=` line in php.ini.
const INI_EXTENSIONS: [&str; 5] = ["apcu", "imagick", "memcached", "oauth", "redis"];

/// Key algorithms accepted for webspace users.
pub const SUPPORTED_KEY_TYPES: [&str; 1] = ["ssh-rsa"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Write,
    Schema,
}

/// Privilege of a database user, written `ro`, `rw` or `admin` in the
/// manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    ReadOnly,
    ReadWrite,
    Admin,
}

impl Privilege {
    /// Unknown labels grant full access.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "ro" => Self::ReadOnly,
            "rw" => Self::ReadWrite,
            _ => Self::Admin,
        }
    }

    /// Inverse of [`Privilege::access_level`].
    pub fn from_access_level(levels: &[AccessLevel]) -> HostingResult<Self> {
        let has = |level| levels.contains(&level);
        if has(AccessLevel::Read) && has(AccessLevel::Write) && has(AccessLevel::Schema) {
            Ok(Self::Admin)
        } else if has(AccessLevel::Read) && has(AccessLevel::Write) {
            Ok(Self::ReadWrite)
        } else if has(AccessLevel::Read) {
            Ok(Self::ReadOnly)
        } else {
            Err(HostingError::Validation(format!(
                "access level {levels:?} unknown"
            )))
        }
    }

    #[must_use]
    pub fn access_level(self) -> Vec<AccessLevel> {
        match self {
            Self::ReadOnly => vec![AccessLevel::Read],
            Self::ReadWrite => vec![AccessLevel::Read, AccessLevel::Write],
            Self::Admin => vec![AccessLevel::Read, AccessLevel::Write, AccessLevel::Schema],
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
            Self::Admin => "admin",
        }
    }
}

/// Access level names for a privilege label (`ro`, `rw`, `admin`).
#[must_use]
pub fn accesses(label: &str) -> Vec<&'static str> {
    Privilege::from_label(label)
        .access_level()
        .into_iter()
        .map(|level| match level {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Schema => "schema",
        })
        .collect()
}

/// Build the cron job as the API stores it.
pub fn cron_job(config: &CronjobConfig, php_version: &str) -> HostingResult<CronJob> {
    let mut job = CronJob::default();

    let (kind, command) = match (&config.php, &config.cmd) {
        (Some(php), _) => ("php", php),
        (None, Some(cmd)) => ("bash", cmd),
        (None, None) => {
            return Err(HostingError::Config(
                "configure either \"php\" or \"cmd\" for the cron jobs".into(),
            ));
        }
    };

    let mut parts = command.split(' ');
    job.kind = kind.to_string();
    job.script = parts.next().unwrap_or_default().to_string();
    job.parameters = parts.map(ToString::to_string).collect();
    if kind == "php" {
        job.interpreter_version = php_version.to_string();
    }
    job.comments = MANAGED_COMMENT.to_string();

    job.schedule = match config.every.as_str() {
        "day" => "daily".to_string(),
        "week" => "weekly".to_string(),
        "month" => "monthly".to_string(),
        other => other.to_string(),
    };

    let on = config.on.as_deref();
    match job.schedule.as_str() {
        "weekly" => job.weekday = on.unwrap_or("Mon").to_lowercase(),
        "monthly" => {
            job.day_of_month = match on {
                Some(day) => day.trim().parse().map_err(|_| {
                    HostingError::Config(format!("invalid day of month \"{day}\" for cron job"))
                })?,
                None => 1,
            };
        }
        "daily" => job.daypart = on.unwrap_or("1-5").to_string(),
        _ => {}
    }

    Ok(job)
}

/// php.ini values for a vhost, including `extension=` lines for
/// extensions that need them.
#[must_use]
pub fn php_ini(ini: &IndexMap<String, Value>, extensions: &[String]) -> Vec<PhpIniValue> {
    let mut values: IndexMap<String, String> = ini
        .iter()
        .map(|(k, v)| (k.clone(), scalar_text(v)))
        .collect();

    for ext in extensions {
        if INI_EXTENSIONS.contains(&ext.as_str()) {
            values.insert(format!("extension={ext}.so"), "true".to_string());
        }
    }

    values
        .into_iter()
        .map(|(key, value)| PhpIniValue { key, value })
        .collect()
}

#[must_use]
pub fn location(match_string: &str, config: &LocationConfig) -> VhostLocation {
    let match_type = if match_string.starts_with('^') {
        MatchType::Regex
    } else if match_string.starts_with('/') {
        MatchType::Directory
    } else {
        MatchType::Default
    };

    let (map_script, php_enabled) = match &config.passthru {
        Some(Passthru::Script(script)) => (script.clone(), true),
        Some(Passthru::Enabled(enabled)) => (String::new(), *enabled),
        None => (String::new(), true),
    };

    VhostLocation {
        match_string: match_string.to_string(),
        match_type,
        location_type: if config.allow {
            LocationType::Generic
        } else {
            LocationType::BlockAccess
        },
        map_script,
        php_enabled,
    }
}

/// Web root below the release symlink, without a trailing slash.
#[must_use]
pub fn web_root(root: Option<&str>) -> String {
    let root = format!("current/{}", root.unwrap_or_default());
    root.strip_suffix('/').unwrap_or(&root).to_string()
}

/// A validated SSH key and the display name of its webspace user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshIdentity {
    pub display_name: String,
    pub key: String,
}

/// Validate a public key and derive the user name for it.
///
/// The name embeds a short fingerprint, so a rotated key becomes a new
/// user instead of overwriting the old one.
pub fn ssh_identity(name: &str, key: &str) -> HostingResult<SshIdentity> {
    let key = key.trim();
    let parts: Vec<&str> = key.split_whitespace().collect();

    let algorithm = parts.first().copied().unwrap_or_default();
    if !SUPPORTED_KEY_TYPES.contains(&algorithm) {
        return Err(HostingError::Validation(format!(
            "SSH key of \"{name}\" uses unsupported algorithm \"{algorithm}\""
        )));
    }

    let body_valid = parts.get(1).is_some_and(|body| {
        body.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
    });
    if !body_valid || parts.len() > 3 {
        return Err(HostingError::Validation(format!(
            "SSH key of \"{name}\" is malformed"
        )));
    }

    let fingerprint = format!("{:x}", Sha512::digest(key.as_bytes()));

    Ok(SshIdentity {
        display_name: format!("{name} #{}#", &fingerprint[..6]),
        key: key.to_string(),
    })
}

/// Text form of a manifest scalar (`true`, `256M`, `3`).
#[must_use]
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
