//! Provision hosting.de webspaces, vhosts and databases from a
//! declarative manifest.
//!
//! `hostingde-deploy` runs as a GitHub Action (or a plain CLI). It reads
//! `.hosting/config.yaml`, converges the remote resources of one
//! application in one environment, and reports SSH coordinates and
//! connection variables back to the workflow. Environments are branches:
//! every resource name is derived from the project prefix, the branch
//! and the application key.
//!
//! # Overview
//!
//! - [`Manifest`] is the typed manifest, defaults applied on load
//! - [`HostingApi`](api::HostingApi) is the provider's CRUD surface,
//!   implemented over HTTP by [`HostingDe`]
//! - [`Reconciler`] converges webspace, vhosts and databases
//! - [`prune_branches`](prune::prune_branches) removes environments of
//!   deleted branches
//! - [`EnvironmentSync`](sync::EnvironmentSync) copies databases and
//!   file mounts between environments
//! - [`Pipeline`] is the command line entry point
//!
//! # Example
//!
//! ```rust,no_run
//! use hostingde_deploy::{Environment, HostingDe, Manifest, ReconcileOptions, Reconciler};
//!
//! fn main() -> anyhow::Result<()> {
//!     let manifest = Manifest::load(".hosting/config.yaml".as_ref())?;
//!     let api = HostingDe::new(&std::env::var("HOSTINGDE_TOKEN")?);
//!
//!     let report = Reconciler::new(&api, &manifest, Environment::new("acme", "main"), "web")
//!         .options(ReconcileOptions::new().service_key("ssh-rsa AAAA... deploy"))
//!         .setup()?;
//!
//!     println!("deploy to {}@{}", report.ssh_user, report.ssh_host);
//!     Ok(())
//! }
//! ```
//!
//! # Manifest
//!
//! ```yaml
//! project:
//!   parent: main
//!   domain: "{ref}.preview.example.com"
//!
//! applications:
//!   web:
//!     php:
//!       version: "8.2"
//!       extensions: [redis]
//!     relationships:
//!       database: "database:web"
//!       cache: redis
//!     web:
//!       - domainName: "www.example.com"
//!         root: public
//!         locations:
//!           "/": { passthru: "/index.php" }
//!     cron:
//!       - php: bin/console app:cleanup
//!         every: day
//!     users: [alice]
//!     sync: [var/uploads]
//!
//! databases:
//!   schemas: [shop]
//!   endpoints:
//!     web: "shop:admin"
//!
//! users:
//!   alice:
//!     role: developer
//!     key: "ssh-rsa AAAA... alice@example.com"
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod actions;
pub mod api;
pub mod cmd;
pub mod desired;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod prune;
pub mod reconcile;
pub mod secret;
pub mod ssh;
pub mod sync;

pub use api::HostingApi;
pub use api::hostingde::HostingDe;
pub use error::{HostingError, HostingResult};
pub use manifest::Manifest;
pub use naming::Environment;
pub use pipeline::Pipeline;
pub use reconcile::{ReconcileOptions, Reconciler, SetupReport};
