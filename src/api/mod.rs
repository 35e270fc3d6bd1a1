pub mod filter;
pub mod hostingde;
pub mod lookup;
pub mod types;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{HostingError, HostingResult};
use filter::Filter;
use types::{
    Database, DatabaseAccess, DatabaseUser, NewDatabase, NewWebspace, Page, PhpIniValue, Vhost,
    Webspace, WebspaceAccess, WebspaceUser,
};

/// CRUD surface of the hosting provider, one method per endpoint.
///
/// Implementations turn error envelopes into [`HostingError::Api`] and
/// structurally broken replies into [`HostingError::UnexpectedResponse`].
pub trait HostingApi {
    fn find_webspaces(&self, filter: &Filter, limit: Option<u32>) -> HostingResult<Page<Webspace>>;

    fn create_webspace(
        &self,
        webspace: &NewWebspace,
        accesses: &[WebspaceAccess],
        pool_id: Option<&str>,
    ) -> HostingResult<Webspace>;

    /// Replace the webspace definition and its access list.
    fn update_webspace(
        &self,
        webspace: &Webspace,
        accesses: &[WebspaceAccess],
    ) -> HostingResult<Webspace>;

    fn delete_webspace(&self, webspace_id: &str) -> HostingResult<()>;

    fn find_vhosts(&self, filter: &Filter) -> HostingResult<Page<Vhost>>;

    fn create_vhost(&self, vhost: &Vhost, php_ini: &[PhpIniValue]) -> HostingResult<Vhost>;

    fn update_vhost(&self, vhost: &Vhost, php_ini: &[PhpIniValue]) -> HostingResult<Vhost>;

    fn delete_vhost(&self, vhost_id: &str) -> HostingResult<()>;

    /// Remove a deleted vhost from the restorable state for good.
    fn purge_restorable_vhost(&self, vhost_id: &str) -> HostingResult<()>;

    fn find_webspace_users(&self, filter: &Filter) -> HostingResult<Page<WebspaceUser>>;

    fn create_webspace_user(
        &self,
        name: &str,
        ssh_key: &str,
        password: &str,
    ) -> HostingResult<WebspaceUser>;

    fn delete_webspace_user(&self, user_id: &str) -> HostingResult<()>;

    fn find_databases(&self, filter: &Filter, limit: Option<u32>) -> HostingResult<Page<Database>>;

    fn create_database(
        &self,
        database: &NewDatabase,
        accesses: &[DatabaseAccess],
        pool_id: Option<&str>,
    ) -> HostingResult<Database>;

    /// Replace the access list of a database.
    fn update_database(
        &self,
        database: &Database,
        accesses: &[DatabaseAccess],
    ) -> HostingResult<Database>;

    fn delete_database(&self, database_id: &str) -> HostingResult<()>;

    fn wipe_database(&self, database_id: &str) -> HostingResult<()>;

    fn find_database_users(&self, filter: &Filter) -> HostingResult<Page<DatabaseUser>>;

    fn create_database_user(
        &self,
        name: &str,
        password: &str,
        account_id: Option<&str>,
    ) -> HostingResult<DatabaseUser>;

    fn delete_database_user(&self, user_id: &str) -> HostingResult<()>;
}

/// Normalize a `{status, errors, response}` envelope into the response
/// payload.
pub fn unwrap_envelope<T: DeserializeOwned>(body: Value) -> HostingResult<T> {
    let response = check_envelope(body)?
        .ok_or_else(|| HostingError::UnexpectedResponse("envelope has no response".into()))?;
    Ok(serde_json::from_value(response)?)
}

/// Unwrap the `{data, totalEntries, ...}` response of a `*Find` call.
pub fn unwrap_page<T: DeserializeOwned>(body: Value) -> HostingResult<Page<T>> {
    unwrap_envelope(body)
}

/// Like [`unwrap_envelope`] for calls whose response carries no payload.
pub fn unwrap_empty_envelope(body: Value) -> HostingResult<()> {
    check_envelope(body).map(|_| ())
}

fn check_envelope(body: Value) -> HostingResult<Option<Value>> {
    let Value::Object(mut envelope) = body else {
        return Err(HostingError::UnexpectedResponse(
            "reply is not a JSON object".into(),
        ));
    };

    let status = envelope
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| HostingError::UnexpectedResponse("envelope has no status".into()))?;

    if status == "error" {
        let errors = match envelope.remove("errors") {
            Some(Value::Array(errors)) => errors,
            _ => Vec::new(),
        };
        return Err(HostingError::Api { errors });
    }

    Ok(envelope.remove("response").filter(|r| !r.is_null()))
}
