//! Convergence of one application in one environment.
//!
//! Each resource kind is a straight sequence of find, compare, then
//! create/update/delete. Nothing is cached between runs; the names
//! computed in [`naming`](crate::naming) are the only identity.

pub mod database;
pub mod vhost;
pub mod webspace;

use std::thread;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;

use crate::api::HostingApi;
use crate::api::types::{Provisionable, STATUS_ACTIVE};
use crate::error::{HostingError, HostingResult};
use crate::manifest::{AppConfig, Manifest};
use crate::naming::Environment;
use crate::ssh::SSH_PORT;

pub use database::DatabaseOutcome;
pub use vhost::{Destination, VhostOutcome};
pub use webspace::WebspaceOutcome;

/// Run-time knobs of a reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub purge_delay: Duration,
    pub rotate_credentials: bool,
    /// Roles whose SSH users get webspace access; empty admits all.
    pub ssh_roles: Vec<String>,
    pub default_domain: Option<String>,
    pub php_version: Option<String>,
    /// Public key of the service user the workflow logs in with.
    pub service_key: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 150,
            purge_delay: Duration::from_secs(5),
            rotate_credentials: true,
            ssh_roles: Vec::new(),
            default_domain: None,
            php_version: None,
            service_key: None,
        }
    }

    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn purge_delay(mut self, delay: Duration) -> Self {
        self.purge_delay = delay;
        self
    }

    #[must_use]
    pub const fn rotate_credentials(mut self, rotate: bool) -> Self {
        self.rotate_credentials = rotate;
        self
    }

    #[must_use]
    pub fn ssh_roles<S: AsRef<str>>(mut self, roles: &[S]) -> Self {
        self.ssh_roles = roles.iter().map(|r| r.as_ref().to_string()).collect();
        self
    }

    #[must_use]
    pub fn default_domain(mut self, domain: &str) -> Self {
        self.default_domain = Some(domain.to_string());
        self
    }

    #[must_use]
    pub fn php_version(mut self, version: &str) -> Self {
        self.php_version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn service_key(mut self, key: &str) -> Self {
        self.service_key = Some(key.to_string());
        self
    }
}

/// Everything a setup run reports back to the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupReport {
    /// The webspace was created by this run and has no files yet.
    pub sync_files: bool,
    /// Schemas whose databases were created by this run.
    pub sync_databases: Vec<String>,
    pub ssh_user: String,
    pub ssh_host: String,
    pub ssh_port: u16,
    pub http_user: String,
    pub php_version: String,
    pub php_extensions: Vec<String>,
    pub env_vars: IndexMap<String, Value>,
    pub deploy_path: String,
    pub public_url: String,
    /// Variables for the following job steps (`applications.<app>.env`).
    pub exported: IndexMap<String, Value>,
    /// Values to mask in the job log.
    pub secrets: Vec<String>,
}

impl SetupReport {
    /// Outputs in the order the action declares them.
    #[must_use]
    pub fn outputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sync-files", self.sync_files.to_string()),
            ("sync-databases", self.sync_databases.join(" ")),
            ("ssh-user", self.ssh_user.clone()),
            ("ssh-host", self.ssh_host.clone()),
            ("ssh-port", self.ssh_port.to_string()),
            ("http-user", self.http_user.clone()),
            ("php-version", self.php_version.clone()),
            ("php-extensions", self.php_extensions.join(", ")),
            (
                "env-vars",
                Value::Object(self.env_vars.clone().into_iter().collect()).to_string(),
            ),
            ("deploy-path", self.deploy_path.clone()),
            ("public-url", self.public_url.clone()),
        ]
    }
}

/// Converges the resources of one application.
pub struct Reconciler<'a> {
    api: &'a dyn HostingApi,
    manifest: &'a Manifest,
    env: Environment,
    app_key: String,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(
        api: &'a dyn HostingApi,
        manifest: &'a Manifest,
        env: Environment,
        app_key: &str,
    ) -> Self {
        Self {
            api,
            manifest,
            env,
            app_key: app_key.to_string(),
            options: ReconcileOptions::new(),
        }
    }

    #[must_use]
    pub fn options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    fn app(&self) -> HostingResult<&'a AppConfig> {
        self.manifest.app(&self.app_key)
    }

    /// PHP version of the app, falling back to the configured default.
    pub fn php_version(&self) -> HostingResult<String> {
        self.app()?
            .php
            .version
            .clone()
            .or_else(|| self.options.php_version.clone())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                HostingError::Config(format!(
                    "no PHP version configured; set \"applications.{}.php.version\" or PHP_VERSION",
                    self.app_key
                ))
            })
    }

    /// Converge webspace, vhosts and databases and collect the outputs.
    pub fn setup(&self) -> HostingResult<SetupReport> {
        let app = self.app()?;
        let php_version = self.php_version()?;

        let mut env_vars = app.env.clone();

        let webspace = self.webspace()?;
        env_vars.extend(webspace.env_vars.clone());

        let vhosts = self.vhosts(&webspace.webspace)?;
        let databases = self.databases()?;
        env_vars.extend(databases.env_vars);

        let http_user = webspace.webspace.webspace_name.clone();
        let public_url = vhosts
            .destinations
            .first()
            .map(|d| d.public_url.clone())
            .unwrap_or_default();

        Ok(SetupReport {
            sync_files: webspace.is_new,
            sync_databases: databases.new_schemas,
            ssh_user: webspace.ssh_user,
            ssh_host: webspace.webspace.host_name.clone(),
            ssh_port: SSH_PORT,
            deploy_path: format!("/home/{http_user}/html"),
            http_user,
            php_version,
            php_extensions: app.php.extensions.clone(),
            env_vars,
            public_url,
            exported: app.env.clone(),
            secrets: databases.secrets,
        })
    }
}

/// Poll `fetch` until the resource reports `active`.
///
/// Sleeps `interval` before every attempt. A resource that vanishes
/// while booting is fatal; so is exceeding `max_attempts`.
pub fn wait_until_active<T, F>(
    what: &str,
    max_attempts: u32,
    interval: Duration,
    mut fetch: F,
) -> HostingResult<T>
where
    T: Provisionable,
    F: FnMut() -> HostingResult<Option<T>>,
{
    for attempt in 1..=max_attempts {
        thread::sleep(interval);
        log::info!("Waiting for {what} to come up ({attempt}/{max_attempts})...");

        let resource = fetch()?.ok_or_else(|| {
            HostingError::UnexpectedResponse(format!("{what} disappeared while booting"))
        })?;

        if resource.status() == STATUS_ACTIVE {
            return Ok(resource);
        }
        log::debug!("{what} ({}) is {}", resource.id(), resource.status());
    }

    Err(HostingError::ProvisioningTimeout(what.to_string(), max_attempts))
}
