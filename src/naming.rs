//! Deterministic naming.
//!
//! Every remote resource is looked up by a name computed from the
//! project prefix, the environment (branch) and the application key.
//! Nothing is ever looked up by a stored id, which is what makes
//! repeated runs idempotent.

use std::sync::LazyLock;

use regex::Regex;
use sha1::{Digest, Sha1};

use crate::error::{HostingError, HostingResult};
use crate::manifest::ProjectConfig;

static APP_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{app\}").expect("valid regex"));
static REF_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{ref\}").expect("valid regex"));
static DEFAULT_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{default\}").expect("valid regex"));
static ROTATION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.v(\d+)$").expect("valid regex"));
static TRAILING_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-(\w+)$").expect("valid regex"));

/// Template used when a web entry does not name a domain.
pub const DEFAULT_DOMAIN_TEMPLATE: &str = "{default}";

/// Short stable handle for a repository/workflow pair, used as the
/// project prefix when none is configured.
#[must_use]
pub fn project_handle(repository: &str, workflow: &str) -> String {
    let digest = Sha1::digest(format!("{repository}-{workflow}").as_bytes());
    let hex = format!("{digest:x}");
    hex[..5].to_string()
}

/// A project prefix paired with one environment ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub prefix: String,
    pub ref_name: String,
}

impl Environment {
    #[must_use]
    pub fn new(prefix: &str, ref_name: &str) -> Self {
        Self {
            prefix: prefix.trim().to_string(),
            ref_name: ref_name.trim().to_string(),
        }
    }

    /// `{prefix}-{ref}-{app}`
    #[must_use]
    pub fn webspace_name(&self, app_key: &str) -> String {
        format!("{}-{}-{app_key}", self.prefix, self.ref_name)
    }

    /// `{prefix}-{ref}`, shared by every database of the environment.
    #[must_use]
    pub fn database_prefix(&self) -> String {
        format!("{}-{}", self.prefix, self.ref_name)
    }

    #[must_use]
    pub fn database_name(&self, schema: &str) -> String {
        format!("{}-{}", self.database_prefix(), schema.to_lowercase())
    }

    /// Database user name before the rotation suffix is applied.
    #[must_use]
    pub fn database_user_base(&self, endpoint: &str, app_key: &str) -> String {
        format!(
            "{}-{}--{app_key}",
            self.database_prefix(),
            endpoint.to_lowercase()
        )
    }
}

/// Name of the webspace user the action itself logs in with.
#[must_use]
pub fn service_user_name(webspace_name: &str) -> String {
    format!("github-action--{webspace_name}")
}

/// Rotation number encoded as a `.v{n}` suffix; names without one are
/// rotation zero.
#[must_use]
pub fn rotation_of(name: &str) -> u32 {
    ROTATION_SUFFIX
        .captures(name)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

#[must_use]
pub fn rotated_name(base: &str, rotation: u32) -> String {
    format!("{base}.v{rotation}")
}

/// Whether `name` is `base` itself or one of its `.v{n}` rotations.
#[must_use]
pub fn is_rotation_of(name: &str, base: &str) -> bool {
    name.strip_prefix(base).is_some_and(|rest| {
        rest.is_empty()
            || rest
                .strip_prefix(".v")
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Environment variable prefix for a relationship name.
#[must_use]
pub fn env_key(relationship: &str) -> String {
    relationship.replace('-', "_").to_uppercase()
}

/// Compute the domain a web entry is served on.
///
/// Environments other than `project.parent` always use the preview
/// domain from `project.domain` when one is configured. `{default}`
/// resolves to `default_domain`, falling back to `project.domain`.
/// After placeholder substitution every `/` becomes `--`.
pub fn translate_domain_name(
    template: Option<&str>,
    ref_name: &str,
    project: &ProjectConfig,
    app_key: &str,
    default_domain: Option<&str>,
) -> HostingResult<String> {
    let mut domain = template
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_DOMAIN_TEMPLATE)
        .to_string();

    let preview = project.domain.as_deref().filter(|d| !d.is_empty());
    if let Some(preview) = preview {
        if project.parent.as_deref() != Some(ref_name) {
            domain = preview.to_string();
        }
    }

    if DEFAULT_PLACEHOLDER.is_match(&domain) {
        let fallback = default_domain
            .filter(|d| !d.is_empty())
            .or(preview)
            .ok_or_else(|| missing_domain(app_key))?;
        domain = DEFAULT_PLACEHOLDER
            .replace_all(&domain, regex::NoExpand(fallback))
            .into_owned();
    }

    let domain = APP_PLACEHOLDER.replace_all(&domain, regex::NoExpand(app_key));
    let domain = REF_PLACEHOLDER.replace_all(&domain, regex::NoExpand(ref_name));
    let domain = domain.trim().replace('/', "--");

    if domain.is_empty() {
        return Err(missing_domain(app_key));
    }

    Ok(domain)
}

fn missing_domain(app_key: &str) -> HostingError {
    HostingError::Config(format!(
        "no domain name configured for the app defined under \"applications.{app_key}\"; \
         provide DOMAIN_NAME in the environment settings or set \
         \"applications.{app_key}.web[].domainName\""
    ))
}

/// Extract the branch from a `{prefix}-{ref}-{suffix}` name.
///
/// `known_suffixes` are the application keys (or schema names) that can
/// end the name. Exactly one suffix must match; several matches are
/// ambiguous and yield `None`. Without any match the last `-` segment is
/// taken as the suffix.
#[must_use]
pub fn branch_of(name: &str, prefix: &str, known_suffixes: &[String]) -> Option<String> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;

    let candidates: Vec<&str> = known_suffixes
        .iter()
        .filter_map(|suffix| {
            rest.strip_suffix(suffix.as_str())
                .and_then(|r| r.strip_suffix('-'))
                .filter(|r| !r.is_empty())
        })
        .collect();

    match candidates.as_slice() {
        [branch] => Some((*branch).to_string()),
        [] => TRAILING_SEGMENT
            .captures(rest)
            .map(|c| c[1].to_string()),
        _ => None,
    }
}
