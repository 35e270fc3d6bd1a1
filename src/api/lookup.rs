//! Find queries shared by the reconciler, the pruner and the sync.

use crate::api::HostingApi;
use crate::api::filter::{Filter, fields};
use crate::api::types::{Database, DatabaseUser, STATUS_ACTIVE, Vhost, Webspace, WebspaceUser};
use crate::error::{HostingError, HostingResult};

/// The single active webspace called `name`.
pub fn find_webspace_by_name(
    api: &dyn HostingApi,
    name: &str,
) -> HostingResult<Option<Webspace>> {
    let filter = Filter::and(vec![
        Filter::field(fields::WEBSPACE_NAME, name),
        Filter::field(fields::WEBSPACE_STATUS, STATUS_ACTIVE),
    ]);
    let page = api.find_webspaces(&filter, Some(1))?;

    if page.total_entries > 1 {
        return Err(HostingError::AmbiguousResource(format!(
            "found {} webspaces named \"{name}\" and cannot know where to deploy to",
            page.total_entries
        )));
    }

    Ok(page.data.into_iter().next())
}

/// Webspace by id in any state.
pub fn find_webspace_by_id(api: &dyn HostingApi, id: &str) -> HostingResult<Option<Webspace>> {
    let page = api.find_webspaces(&Filter::field(fields::WEBSPACE_ID, id), Some(1))?;
    Ok(page.data.into_iter().next())
}

/// Every active webspace whose name starts with `{prefix}-`.
pub fn find_active_webspaces(api: &dyn HostingApi, prefix: &str) -> HostingResult<Vec<Webspace>> {
    let filter = Filter::and(vec![
        Filter::field(fields::WEBSPACE_NAME, &format!("{prefix}-*")),
        Filter::field(fields::WEBSPACE_STATUS, STATUS_ACTIVE),
    ]);
    Ok(api.find_webspaces(&filter, None)?.data)
}

pub fn find_vhosts_by_webspace(api: &dyn HostingApi, webspace_id: &str) -> HostingResult<Vec<Vhost>> {
    let filter = Filter::and(vec![
        Filter::field(fields::WEBSPACE_ID, webspace_id),
        Filter::field(fields::VHOST_STATUS, STATUS_ACTIVE),
    ]);
    Ok(api.find_vhosts(&filter)?.data)
}

/// Webspace users matching any of `names` (wildcards allowed).
pub fn find_webspace_users_by_name(
    api: &dyn HostingApi,
    names: &[String],
) -> HostingResult<Vec<WebspaceUser>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    Ok(api
        .find_webspace_users(&Filter::any_of(fields::USER_NAME, names))?
        .data)
}

/// Active databases matching any of `names` (wildcards allowed).
pub fn find_databases(api: &dyn HostingApi, names: &[String]) -> HostingResult<Vec<Database>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let filter = Filter::and(vec![
        Filter::any_of(fields::DATABASE_NAME, names),
        Filter::field(fields::DATABASE_STATUS, STATUS_ACTIVE),
    ]);
    Ok(api.find_databases(&filter, None)?.data)
}

/// Database by id in any state.
pub fn find_database_by_id(api: &dyn HostingApi, id: &str) -> HostingResult<Option<Database>> {
    let page = api.find_databases(&Filter::field(fields::DATABASE_ID, id), Some(1))?;
    Ok(page.data.into_iter().next())
}

/// Database users named `name` (wildcards allowed).
pub fn find_database_users(api: &dyn HostingApi, name: &str) -> HostingResult<Vec<DatabaseUser>> {
    Ok(api
        .find_database_users(&Filter::field(fields::USER_NAME, name))?
        .data)
}
