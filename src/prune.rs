//! Removal of environments whose branch no longer exists.

use crate::api::HostingApi;
use crate::api::lookup;
use crate::error::HostingResult;
use crate::manifest::Manifest;
use crate::naming::{self, branch_of};

/// Names of everything a prune run deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub branches: Vec<String>,
    pub webspaces: Vec<String>,
    pub webspace_users: Vec<String>,
    pub databases: Vec<String>,
    pub database_users: Vec<String>,
}

/// Delete the webspaces, databases and users of every environment
/// under `prefix` whose branch is not in `keep`.
///
/// Does nothing when `keep` is empty. Names whose branch cannot be told
/// apart are left alone.
pub fn prune_branches(
    api: &dyn HostingApi,
    manifest: &Manifest,
    prefix: &str,
    keep: &[String],
) -> HostingResult<PruneReport> {
    let mut report = PruneReport::default();

    if keep.is_empty() {
        log::info!("No branch list given; skipping pruning");
        return Ok(report);
    }

    let apps: Vec<String> = manifest.applications.keys().cloned().collect();
    let schemas: Vec<String> = manifest
        .databases
        .schemas
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    let endpoints: Vec<String> = manifest
        .databases
        .endpoints
        .keys()
        .map(|e| e.to_lowercase())
        .collect();

    for webspace in lookup::find_active_webspaces(api, prefix)? {
        let Some(branch) = branch_of(&webspace.name, prefix, &apps) else {
            log::debug!("Cannot tell the branch of webspace {}; skipping", webspace.name);
            continue;
        };
        if keep.contains(&branch) {
            continue;
        }

        log::info!("Deleting webspace {}", webspace.name);
        api.delete_webspace(&webspace.id)?;
        report.webspaces.push(webspace.name.clone());

        let service_user = naming::service_user_name(&webspace.name);
        for user in lookup::find_webspace_users_by_name(api, &[service_user])? {
            log::info!("Deleting webspace user {}", user.name);
            api.delete_webspace_user(&user.id)?;
            report.webspace_users.push(user.name);
        }

        if !report.branches.contains(&branch) {
            report.branches.push(branch);
        }
    }

    for branch in report.branches.clone() {
        let pattern = format!("{prefix}-{branch}-*");

        for database in lookup::find_databases(api, &[pattern.clone()])? {
            if branch_of(&database.name, prefix, &schemas).as_ref() != Some(&branch) {
                continue;
            }
            log::info!("Deleting database {}", database.name);
            api.delete_database(&database.id)?;
            report.databases.push(database.name);
        }

        for user in lookup::find_database_users(api, &pattern)? {
            let owner = user.name.split_once("--").map_or(user.name.as_str(), |(o, _)| o);
            if branch_of(owner, prefix, &endpoints).as_ref() != Some(&branch) {
                continue;
            }
            log::info!("Deleting database user {}", user.name);
            api.delete_database_user(&user.id)?;
            report.database_users.push(user.name);
        }
    }

    Ok(report)
}
