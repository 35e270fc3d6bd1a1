//! Copying databases and file mounts from one environment to another.
//!
//! Resources are paired purely by name. The data itself is moved by a
//! [`DataCopier`]; [`ShellCopier`] does it with `mysqldump`, `mysql`,
//! `ssh` and `rsync`.

use std::env;
use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::api::HostingApi;
use crate::api::lookup;
use crate::api::types::{Database, DatabaseAccess, DatabaseUser};
use crate::cmd;
use crate::desired::Privilege;
use crate::error::{HostingError, HostingResult};
use crate::manifest::Manifest;
use crate::naming::Environment;
use crate::secret;
use crate::ssh::{SSH_PORT, SshSession};

/// Port the destination host's SSH daemon is tunnelled to on the
/// source host.
const TUNNEL_PORT: u16 = 50000;

/// Credentials for one side of a database copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseLocation {
    /// Name as shown in the hosting panel.
    pub name: String,
    pub host: String,
    pub db_name: String,
    pub login: String,
    pub password: String,
}

/// A directory on a webspace host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub host: String,
    pub path: String,
}

/// Moves the bytes once the endpoints are resolved.
pub trait DataCopier {
    fn copy_database(&self, from: &DatabaseLocation, to: &DatabaseLocation) -> HostingResult<()>;
    fn copy_directory(&self, from: &RemotePath, to: &RemotePath) -> HostingResult<()>;
}

/// [`DataCopier`] backed by the command line tools on the runner.
pub struct ShellCopier {
    dump_dir: PathBuf,
}

impl Default for ShellCopier {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellCopier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dump_dir: env::temp_dir(),
        }
    }

    /// Directory for the intermediate dump files.
    #[must_use]
    pub fn dump_dir(mut self, dir: PathBuf) -> Self {
        self.dump_dir = dir;
        self
    }

    /// Fail early when a tool needed for the requested copies is missing.
    pub fn check_tools(&self, databases: bool, files: bool) -> HostingResult<()> {
        let mut tools = Vec::new();
        if databases {
            tools.extend(["mysqldump", "mysql"]);
        }
        if files {
            tools.push("ssh");
        }

        match tools.into_iter().find(|tool| !cmd::command_exists(tool)) {
            Some(missing) => Err(HostingError::CommandNotFound(missing.to_string())),
            None => Ok(()),
        }
    }
}

impl DataCopier for ShellCopier {
    fn copy_database(&self, from: &DatabaseLocation, to: &DatabaseLocation) -> HostingResult<()> {
        let dump = self.dump_dir.join(format!("{}.sql", Uuid::new_v4()));

        let result = cmd::run_to_file(
            "mysqldump",
            &["-h", &from.host, "-u", &from.login, &from.db_name],
            &[("MYSQL_PWD", from.password.as_str())],
            &dump,
        )
        .and_then(|()| {
            cmd::run_from_file(
                "mysql",
                &["-h", &to.host, "-u", &to.login, &to.db_name],
                &[("MYSQL_PWD", to.password.as_str())],
                &dump,
            )
        });

        if let Err(e) = fs::remove_file(&dump) {
            log::warn!("Cannot remove dump {}: {e}", dump.display());
        }
        result
    }

    fn copy_directory(&self, from: &RemotePath, to: &RemotePath) -> HostingResult<()> {
        let rsync = format!(
            "rsync -e 'ssh -p {TUNNEL_PORT}' -azr --delete {}/ localhost:{}/",
            from.path, to.path
        );
        SshSession::new(&from.host)
            .remote_forward(TUNNEL_PORT, &to.host, SSH_PORT)
            .exec_interactive(&rsync)
    }
}

/// Databases of two environments matched by schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabasePairs {
    /// Source and destination per schema.
    pub pairs: Vec<(Database, Database)>,
    pub only_source: Vec<Database>,
    pub only_destination: Vec<Database>,
}

/// Pair databases of `from` and `to` by the part after
/// `{prefix}-{env}-`. When both environment prefixes match a name the
/// longer one wins.
#[must_use]
pub fn pair_databases(databases: &[Database], prefix: &str, from: &str, to: &str) -> DatabasePairs {
    let from_prefix = format!("{prefix}-{from}-");
    let to_prefix = format!("{prefix}-{to}-");

    let mut sources: IndexMap<&str, &Database> = IndexMap::new();
    let mut destinations: IndexMap<&str, &Database> = IndexMap::new();

    for database in databases {
        let as_source = database.name.strip_prefix(&from_prefix);
        let as_destination = database.name.strip_prefix(&to_prefix);

        match (as_source, as_destination) {
            (Some(schema), None) => {
                sources.insert(schema, database);
            }
            (None, Some(schema)) => {
                destinations.insert(schema, database);
            }
            (Some(source), Some(destination)) => {
                if from_prefix.len() >= to_prefix.len() {
                    sources.insert(source, database);
                } else {
                    destinations.insert(destination, database);
                }
            }
            (None, None) => log::debug!("Ignoring database {}", database.name),
        }
    }

    let mut result = DatabasePairs::default();
    for (schema, source) in &sources {
        match destinations.get(schema) {
            Some(destination) => result.pairs.push(((*source).clone(), (*destination).clone())),
            None => result.only_source.push((*source).clone()),
        }
    }
    result.only_destination = destinations
        .iter()
        .filter(|(schema, _)| !sources.contains_key(*schema))
        .map(|(_, d)| (*d).clone())
        .collect();

    result
}

/// Source and destination path of a sync directory.
#[must_use]
pub fn sync_dir_paths(from_webspace: &str, to_webspace: &str, dir: &str) -> (String, String) {
    let dir = dir.trim().trim_matches('/');
    (
        format!("/home/{from_webspace}/html/current/{dir}"),
        format!("/home/{to_webspace}/html/current/{dir}"),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// `(source, destination)` names of the copied databases or paths.
    pub copied: Vec<(String, String)>,
    /// Names present in only one of the environments.
    pub skipped: Vec<String>,
    /// Temporary credentials to mask.
    pub secrets: Vec<String>,
}

/// Copies data from the `from` environment to the `to` environment.
pub struct EnvironmentSync<'a> {
    api: &'a dyn HostingApi,
    manifest: &'a Manifest,
    from: Environment,
    to: Environment,
    app: Option<String>,
    only_databases: Vec<String>,
    wipe: bool,
}

impl<'a> EnvironmentSync<'a> {
    #[must_use]
    pub fn new(
        api: &'a dyn HostingApi,
        manifest: &'a Manifest,
        prefix: &str,
        from: &str,
        to: &str,
    ) -> Self {
        Self {
            api,
            manifest,
            from: Environment::new(prefix, from),
            to: Environment::new(prefix, to),
            app: None,
            only_databases: Vec::new(),
            wipe: false,
        }
    }

    /// Limit the sync to one application.
    #[must_use]
    pub fn app(mut self, app_key: &str) -> Self {
        self.app = Some(app_key.to_string());
        self
    }

    /// Limit the database sync to these schemas (or, with
    /// [`EnvironmentSync::app`], these endpoints).
    #[must_use]
    pub fn only_databases(mut self, names: &[String]) -> Self {
        self.only_databases = names
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        self
    }

    /// Empty each destination database before restoring into it.
    #[must_use]
    pub const fn wipe(mut self, wipe: bool) -> Self {
        self.wipe = wipe;
        self
    }

    /// Copy every database present in both environments.
    ///
    /// A temporary user with full access on both sides does the copy and
    /// is deleted afterwards, also when a copy failed.
    pub fn databases(&self, copier: &dyn DataCopier) -> HostingResult<SyncReport> {
        let mut report = SyncReport::default();

        let queries = self.database_queries()?;
        if queries.is_empty() {
            return Ok(report);
        }

        let found = lookup::find_databases(self.api, &queries)?;
        let pairs = pair_databases(&found, &self.from.prefix, &self.from.ref_name, &self.to.ref_name);

        for database in &pairs.only_destination {
            log::info!(
                "Found database \"{}\" but it is not present in the \"{}\" environment",
                database.name,
                self.from.ref_name
            );
            report.skipped.push(database.name.clone());
        }
        for database in &pairs.only_source {
            log::info!(
                "Database \"{}\" is not present in the \"{}\" environment",
                database.name,
                self.to.ref_name
            );
            report.skipped.push(database.name.clone());
        }

        if pairs.pairs.is_empty() {
            return Ok(report);
        }

        let password = secret::generate_password();
        let user = self
            .api
            .create_database_user(&secret::temporary_user_name(), &password, None)?;
        report.secrets.push(password.clone());

        let result = self.copy_pairs(&pairs.pairs, &user, &password, copier, &mut report);

        log::info!("Deleting temporary user {}", user.name);
        let cleanup = self.api.delete_database_user(&user.id);

        result?;
        cleanup?;
        Ok(report)
    }

    fn copy_pairs(
        &self,
        pairs: &[(Database, Database)],
        user: &DatabaseUser,
        password: &str,
        copier: &dyn DataCopier,
        report: &mut SyncReport,
    ) -> HostingResult<()> {
        for (source, destination) in pairs {
            let from = self.grant(source, user, password)?;
            let to = self.grant(destination, user, password)?;
            report.secrets.push(from.login.clone());
            report.secrets.push(to.login.clone());

            log::info!(
                "Database \"{}\" will be overridden using database \"{}\"",
                to.name,
                from.name
            );

            if self.wipe {
                log::info!("Wiping database {}", to.name);
                self.api.wipe_database(&destination.id)?;
            }

            copier.copy_database(&from, &to)?;
            report.copied.push((from.name, to.name));
        }
        Ok(())
    }

    fn grant(
        &self,
        database: &Database,
        user: &DatabaseUser,
        password: &str,
    ) -> HostingResult<DatabaseLocation> {
        let mut accesses = database.accesses.clone();
        accesses.push(DatabaseAccess {
            user_id: user.id.clone(),
            database_id: Some(database.id.clone()),
            access_level: Privilege::Admin.access_level(),
            ..DatabaseAccess::default()
        });
        let updated = self.api.update_database(database, &accesses)?;

        let login = updated
            .access_of(&user.id)
            .and_then(|a| a.db_login.clone())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| user.db_user_name.clone());

        Ok(DatabaseLocation {
            name: updated.name.clone(),
            host: updated.host_name.clone(),
            db_name: updated.db_name.clone(),
            login,
            password: password.to_string(),
        })
    }

    fn database_queries(&self) -> HostingResult<Vec<String>> {
        let mut queries = Vec::new();

        match &self.app {
            None if self.only_databases.is_empty() => {
                queries.push(format!("{}-*", self.from.database_prefix()));
                queries.push(format!("{}-*", self.to.database_prefix()));
            }
            None => {
                for schema in &self.only_databases {
                    queries.push(self.from.database_name(schema));
                    queries.push(self.to.database_name(schema));
                }
            }
            Some(app_key) => {
                let app = self.manifest.app(app_key)?;
                for relationship in app.database_relationships(app_key) {
                    if !self.only_databases.is_empty()
                        && !self.only_databases.contains(&relationship.endpoint)
                    {
                        continue;
                    }
                    let (schema, _) = self.manifest.database_endpoint(&relationship.endpoint)?;
                    let (from, to) = (self.from.database_name(&schema), self.to.database_name(&schema));
                    if !queries.contains(&from) {
                        queries.push(from);
                        queries.push(to);
                    }
                }
            }
        }

        Ok(queries)
    }

    /// Copy the declared sync directories of each application.
    pub fn files(&self, copier: &dyn DataCopier) -> HostingResult<SyncReport> {
        let mut report = SyncReport::default();

        for (app_key, app) in &self.manifest.applications {
            if self.app.as_ref().is_some_and(|only| only != app_key) {
                continue;
            }

            let from_name = self.from.webspace_name(app_key);
            let Some(from) = lookup::find_webspace_by_name(self.api, &from_name)? else {
                log::info!(
                    "The webspace for app {app_key} is not present in the {} environment. Skipping.",
                    self.from.ref_name
                );
                report.skipped.push(from_name);
                continue;
            };

            let to_name = self.to.webspace_name(app_key);
            let Some(to) = lookup::find_webspace_by_name(self.api, &to_name)? else {
                report.skipped.push(to_name);
                continue;
            };
            if from.id == to.id {
                continue;
            }

            for dir in &app.sync {
                let (from_path, to_path) = sync_dir_paths(&from.webspace_name, &to.webspace_name, dir);
                log::info!("Now syncing: {from_path} to {to_path}");

                copier.copy_directory(
                    &RemotePath {
                        host: from.host_name.clone(),
                        path: from_path.clone(),
                    },
                    &RemotePath {
                        host: to.host_name.clone(),
                        path: to_path.clone(),
                    },
                )?;
                report.copied.push((from_path, to_path));
            }
        }

        Ok(report)
    }
}
