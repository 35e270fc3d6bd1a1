//! Command line surface and dispatch.
//!
//! Every option also reads the runner's `INPUT_<NAME>` variable, so the
//! binary works unchanged as the entry point of the action. Empty inputs
//! count as not given.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};

use crate::actions::ActionsIo;
use crate::api::HostingApi;
use crate::api::hostingde::HostingDe;
use crate::desired::scalar_text;
use crate::manifest::{MANIFEST_PATH, Manifest};
use crate::naming::{Environment, project_handle};
use crate::prune::prune_branches;
use crate::reconcile::{ReconcileOptions, Reconciler};
use crate::sync::{DataCopier, EnvironmentSync, ShellCopier};

#[derive(Debug, Parser)]
#[command(name = "hostingde-deploy")]
#[command(about = "Provision and sync hosting.de environments from a manifest")]
#[command(version)]
pub struct Cli {
    /// API token of the hosting.de account
    #[arg(long, env = "INPUT_AUTH-TOKEN", hide_env_values = true, global = true)]
    pub auth_token: Option<String>,

    /// Prefix shared by every resource of the project
    #[arg(long, env = "INPUT_PROJECT-PREFIX", global = true)]
    pub project_prefix: Option<String>,

    /// Older name of --project-prefix
    #[arg(long, env = "INPUT_WEBSPACE-PREFIX", global = true, hide = true)]
    pub webspace_prefix: Option<String>,

    #[arg(long, env = "GITHUB_REPOSITORY", global = true, hide = true)]
    pub github_repository: Option<String>,

    #[arg(long, env = "GITHUB_WORKFLOW", global = true, hide = true)]
    pub github_workflow: Option<String>,

    /// Path of the manifest
    #[arg(long, default_value = MANIFEST_PATH, global = true)]
    pub manifest: PathBuf,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Converge the resources of one application
    Setup {
        /// Application key under `applications`
        #[arg(long, env = "INPUT_APP")]
        app: String,

        /// Environment (branch) to deploy
        #[arg(long, env = "GITHUB_REF_NAME", default_value = "na")]
        ref_name: String,

        /// Public key of the user the workflow deploys with
        #[arg(long, env = "INPUT_SSH-PUBLIC-KEY")]
        ssh_public_key: Option<String>,

        /// Domain substituted for `{default}`
        #[arg(long, env = "INPUT_DEFAULT-DOMAIN-NAME")]
        default_domain_name: Option<String>,

        #[arg(long, env = "DOMAIN_NAME", hide = true)]
        domain_name: Option<String>,

        /// PHP version for apps that do not declare one
        #[arg(long, env = "PHP_VERSION")]
        php_version: Option<String>,

        /// Roles whose users get SSH access, separated by spaces
        #[arg(long, env = "INPUT_ACCESS-ROLE-SSH")]
        access_role_ssh: Option<String>,

        /// Replace database credentials on every run
        #[arg(
            long,
            env = "INPUT_ROTATE-CREDENTIALS",
            value_parser = parse_bool,
            default_value = "true",
            action = ArgAction::Set
        )]
        rotate_credentials: bool,

        /// Branches to keep when pruning, separated by spaces
        #[arg(long, env = "INPUT_KEEP-BRANCHES")]
        keep_branches: Option<String>,

        #[arg(long, env = "REPO_BRANCHES", hide = true)]
        repo_branches: Option<String>,

        /// Seconds to wait before purging deleted vhosts
        #[arg(long, default_value_t = 5)]
        purge_delay: u64,
    },

    /// Copy databases and files between environments
    Sync {
        /// Only sync this application
        #[arg(long, env = "INPUT_APP")]
        app: Option<String>,

        /// Source environment, defaults to `project.parent`
        #[arg(long, env = "INPUT_FROM")]
        from: Option<String>,

        /// Destination environment
        #[arg(long, env = "INPUT_TO")]
        to: Option<String>,

        /// Sync the declared file mounts
        #[arg(
            long,
            env = "INPUT_FILES",
            value_parser = parse_bool,
            default_value = "false",
            default_missing_value = "true",
            num_args = 0..=1,
            action = ArgAction::Set
        )]
        files: bool,

        /// Sync the databases
        #[arg(
            long,
            env = "INPUT_DATABASES",
            value_parser = parse_bool,
            default_value = "false",
            default_missing_value = "true",
            num_args = 0..=1,
            action = ArgAction::Set
        )]
        databases: bool,

        /// Only sync these databases, separated by spaces
        #[arg(long, env = "INPUT_LIMIT-DATABASE", alias = "only-databases")]
        limit_database: Option<String>,

        /// Wipe each destination database before restoring it
        #[arg(
            long,
            env = "INPUT_WIPE",
            value_parser = parse_bool,
            default_value = "false",
            default_missing_value = "true",
            num_args = 0..=1,
            action = ArgAction::Set
        )]
        wipe: bool,
    },

    /// Delete the environments of branches that no longer exist
    Prune {
        /// Branches to keep, separated by spaces
        #[arg(long, env = "INPUT_KEEP-BRANCHES")]
        keep_branches: Option<String>,

        #[arg(long, env = "REPO_BRANCHES", hide = true)]
        repo_branches: Option<String>,
    },
}

/// Parsed invocation, ready to run against an API.
pub struct Pipeline {
    cli: Cli,
}

impl Pipeline {
    #[must_use]
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse the process arguments and environment.
    #[must_use]
    pub fn from_args() -> Self {
        Self::new(Cli::parse())
    }

    #[must_use]
    pub const fn log_level(&self) -> log::LevelFilter {
        if self.cli.quiet {
            return log::LevelFilter::Error;
        }
        match self.cli.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Run against the live API and the runner's files.
    pub fn run(&self) -> Result<()> {
        let token = present(self.cli.auth_token.as_deref())
            .ok_or_else(|| anyhow!("the auth-token input is required"))?;
        let api = HostingDe::new(token);
        let mut io = ActionsIo::from_env();
        let copier = ShellCopier::new();

        if let Command::Sync {
            files, databases, ..
        } = &self.cli.command
        {
            copier.check_tools(*databases, *files)?;
        }

        self.run_with(&api, &mut io, &copier)
    }

    /// Dispatch the subcommand against the given collaborators.
    pub fn run_with<W: Write>(
        &self,
        api: &dyn HostingApi,
        io: &mut ActionsIo<W>,
        copier: &dyn DataCopier,
    ) -> Result<()> {
        let manifest = load_manifest(&self.cli.manifest)?;
        let prefix = self.project_prefix()?;

        match &self.cli.command {
            Command::Setup {
                app,
                ref_name,
                ssh_public_key,
                default_domain_name,
                domain_name,
                php_version,
                access_role_ssh,
                rotate_credentials,
                keep_branches,
                repo_branches,
                purge_delay,
            } => {
                let mut options = ReconcileOptions::new()
                    .rotate_credentials(*rotate_credentials)
                    .purge_delay(Duration::from_secs(*purge_delay))
                    .ssh_roles(&words(access_role_ssh.as_deref()));
                if let Some(domain) =
                    present(default_domain_name.as_deref()).or(present(domain_name.as_deref()))
                {
                    options = options.default_domain(domain);
                }
                if let Some(version) = present(php_version.as_deref()) {
                    options = options.php_version(version);
                }
                if let Some(key) = present(ssh_public_key.as_deref()) {
                    options = options.service_key(key);
                }

                cmd_setup(api, io, &manifest, &prefix, app, ref_name, options)?;

                if manifest.project.prune {
                    let keep = words(
                        present(keep_branches.as_deref()).or(present(repo_branches.as_deref())),
                    );
                    cmd_prune(api, &manifest, &prefix, &keep)?;
                }
                Ok(())
            }
            Command::Sync {
                app,
                from,
                to,
                files,
                databases,
                limit_database,
                wipe,
            } => {
                let from = present(from.as_deref()).or(manifest.project.parent.as_deref());
                let to = present(to.as_deref());
                let (Some(from), Some(to)) = (from, to) else {
                    log::info!(
                        "Sync destinations were not specified and cannot be derived. \
                         Please check the `project.parent` config in the \"{MANIFEST_PATH}\" file."
                    );
                    return Ok(());
                };
                if from == to {
                    return Ok(());
                }

                let mut sync = EnvironmentSync::new(api, &manifest, &prefix, from, to)
                    .only_databases(&words(limit_database.as_deref()))
                    .wipe(*wipe);
                if let Some(app) = present(app.as_deref()) {
                    sync = sync.app(app);
                }

                cmd_sync(&sync, io, copier, *files, *databases)
                    .with_context(|| format!("syncing from \"{from}\" to \"{to}\""))
            }
            Command::Prune {
                keep_branches,
                repo_branches,
            } => {
                let keep = words(
                    present(keep_branches.as_deref()).or(present(repo_branches.as_deref())),
                );
                cmd_prune(api, &manifest, &prefix, &keep)
            }
        }
    }

    fn project_prefix(&self) -> Result<String> {
        if let Some(prefix) = present(self.cli.project_prefix.as_deref())
            .or(present(self.cli.webspace_prefix.as_deref()))
        {
            return Ok(prefix.to_string());
        }

        match (
            present(self.cli.github_repository.as_deref()),
            present(self.cli.github_workflow.as_deref()),
        ) {
            (Some(repository), Some(workflow)) => Ok(project_handle(repository, workflow)),
            _ => Err(anyhow!(
                "no project prefix given and GITHUB_REPOSITORY/GITHUB_WORKFLOW are not set"
            )),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_setup<W: Write>(
    api: &dyn HostingApi,
    io: &mut ActionsIo<W>,
    manifest: &Manifest,
    prefix: &str,
    app: &str,
    ref_name: &str,
    options: ReconcileOptions,
) -> Result<()> {
    let app_config = manifest.app(app)?;
    for (name, value) in &app_config.env {
        io.export_variable(name, &scalar_text(value))?;
    }

    let reconciler =
        Reconciler::new(api, manifest, Environment::new(prefix, ref_name), app).options(options);
    let report = reconciler
        .setup()
        .with_context(|| format!("provisioning application \"{app}\" for \"{ref_name}\""))?;

    for secret in &report.secrets {
        io.add_mask(secret)?;
    }
    for (name, value) in report.outputs() {
        io.set_output(name, &value)?;
    }

    Ok(())
}

fn cmd_sync<W: Write>(
    sync: &EnvironmentSync<'_>,
    io: &mut ActionsIo<W>,
    copier: &dyn DataCopier,
    files: bool,
    databases: bool,
) -> Result<()> {
    if files {
        log::info!("Syncing file mounts");
        sync.files(copier)?;
    }

    if databases {
        log::info!("Syncing databases");
        let report = sync.databases(copier)?;
        for secret in &report.secrets {
            io.add_mask(secret)?;
        }
    }

    Ok(())
}

fn cmd_prune(api: &dyn HostingApi, manifest: &Manifest, prefix: &str, keep: &[String]) -> Result<()> {
    let report = prune_branches(api, manifest, prefix, keep).context("pruning stale branches")?;
    if !report.branches.is_empty() {
        log::info!("Pruned branches: {}", report.branches.join(", "));
    }
    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    Manifest::load(path).with_context(|| format!("loading {}", path.display()))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn words(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

/// Boolean input as the runner spells it. Empty means false.
fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim() {
        "" | "false" | "False" | "FALSE" => Ok(false),
        "true" | "True" | "TRUE" => Ok(true),
        other => Err(format!("\"{other}\" is not a boolean (true or false)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_follow_runner_spelling() {
        assert_eq!(parse_bool(""), Ok(false));
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn blank_inputs_are_absent() {
        assert_eq!(present(Some("  ")), None);
        assert_eq!(present(Some(" main ")), Some("main"));
        assert_eq!(words(Some("main  feature/x")), vec!["main", "feature/x"]);
    }
}
