use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::filter::Filter;
use crate::api::types::{
    Database, DatabaseAccess, DatabaseUser, NewDatabase, NewWebspace, Page, PhpIniValue, Vhost,
    Webspace, WebspaceAccess, WebspaceUser,
};
use crate::api::{HostingApi, unwrap_empty_envelope, unwrap_envelope, unwrap_page};
use crate::desired::MANAGED_COMMENT;
use crate::error::HostingResult;

const API_BASE: &str = "https://secure.hosting.de/api";
const WEBHOSTING: &str = "webhosting/v1/json";
const DATABASE: &str = "database/v1/json";

/// Client for the hosting.de JSON API.
///
/// One instance is built per run and handed to the services that need
/// it; the auth token never lives in global state.
pub struct HostingDe {
    agent: ureq::Agent,
    api_base: String,
    token: String,
}

impl HostingDe {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            api_base: API_BASE.to_string(),
            token: token.to_string(),
        }
    }

    #[must_use]
    pub fn api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, service: &str, method: &str) -> String {
        format!("{}/{service}/{method}", self.api_base)
    }

    fn post(&self, service: &str, method: &str, mut body: Value) -> HostingResult<Value> {
        body["authToken"] = Value::String(self.token.clone());
        log::debug!("POST {service}/{method}");

        let reply: Value = self
            .agent
            .post(&self.url(service, method))
            .header("Content-Type", "application/json")
            .send_json(&body)?
            .body_mut()
            .read_json()?;

        Ok(reply)
    }

    fn find<T: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> HostingResult<Page<T>> {
        let mut body = json!({ "filter": filter });
        if let Some(limit) = limit {
            body["limit"] = json!(limit);
        }
        unwrap_page(self.post(service, method, body)?)
    }

    fn action<T: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        body: Value,
    ) -> HostingResult<T> {
        unwrap_envelope(self.post(service, method, body)?)
    }

    fn command(&self, service: &str, method: &str, body: Value) -> HostingResult<()> {
        unwrap_empty_envelope(self.post(service, method, body)?)
    }
}

impl HostingApi for HostingDe {
    fn find_webspaces(&self, filter: &Filter, limit: Option<u32>) -> HostingResult<Page<Webspace>> {
        self.find(WEBHOSTING, "webspacesFind", filter, limit)
    }

    fn create_webspace(
        &self,
        webspace: &NewWebspace,
        accesses: &[WebspaceAccess],
        pool_id: Option<&str>,
    ) -> HostingResult<Webspace> {
        self.action(
            WEBHOSTING,
            "webspaceCreate",
            json!({ "webspace": webspace, "accesses": accesses, "poolId": pool_id }),
        )
    }

    fn update_webspace(
        &self,
        webspace: &Webspace,
        accesses: &[WebspaceAccess],
    ) -> HostingResult<Webspace> {
        self.action(
            WEBHOSTING,
            "webspaceUpdate",
            json!({ "webspace": webspace, "accesses": accesses }),
        )
    }

    fn delete_webspace(&self, webspace_id: &str) -> HostingResult<()> {
        self.command(WEBHOSTING, "webspaceDelete", json!({ "webspaceId": webspace_id }))
    }

    fn find_vhosts(&self, filter: &Filter) -> HostingResult<Page<Vhost>> {
        self.find(WEBHOSTING, "vhostsFind", filter, None)
    }

    fn create_vhost(&self, vhost: &Vhost, php_ini: &[PhpIniValue]) -> HostingResult<Vhost> {
        self.action(
            WEBHOSTING,
            "vhostCreate",
            json!({ "vhost": vhost, "phpIni": { "values": php_ini } }),
        )
    }

    fn update_vhost(&self, vhost: &Vhost, php_ini: &[PhpIniValue]) -> HostingResult<Vhost> {
        self.action(
            WEBHOSTING,
            "vhostUpdate",
            json!({ "vhost": vhost, "phpIni": { "values": php_ini } }),
        )
    }

    fn delete_vhost(&self, vhost_id: &str) -> HostingResult<()> {
        self.command(WEBHOSTING, "vhostDelete", json!({ "vhostId": vhost_id }))
    }

    fn purge_restorable_vhost(&self, vhost_id: &str) -> HostingResult<()> {
        self.command(
            WEBHOSTING,
            "vhostPurgeRestorable",
            json!({ "vhostId": vhost_id }),
        )
    }

    fn find_webspace_users(&self, filter: &Filter) -> HostingResult<Page<WebspaceUser>> {
        self.find(WEBHOSTING, "usersFind", filter, None)
    }

    fn create_webspace_user(
        &self,
        name: &str,
        ssh_key: &str,
        password: &str,
    ) -> HostingResult<WebspaceUser> {
        self.action(
            WEBHOSTING,
            "userCreate",
            json!({
                "user": { "name": name, "sshKey": ssh_key, "comment": MANAGED_COMMENT },
                "password": password,
            }),
        )
    }

    fn delete_webspace_user(&self, user_id: &str) -> HostingResult<()> {
        self.command(WEBHOSTING, "userDelete", json!({ "userId": user_id }))
    }

    fn find_databases(&self, filter: &Filter, limit: Option<u32>) -> HostingResult<Page<Database>> {
        self.find(DATABASE, "databasesFind", filter, limit)
    }

    fn create_database(
        &self,
        database: &NewDatabase,
        accesses: &[DatabaseAccess],
        pool_id: Option<&str>,
    ) -> HostingResult<Database> {
        self.action(
            DATABASE,
            "databaseCreate",
            json!({ "database": database, "accesses": accesses, "poolId": pool_id }),
        )
    }

    fn update_database(
        &self,
        database: &Database,
        accesses: &[DatabaseAccess],
    ) -> HostingResult<Database> {
        // Only the writable fields; the find result carries read-only
        // ones the endpoint rejects.
        let database = json!({
            "id": database.id,
            "name": database.name,
            "productCode": database.product_code,
            "forceSsl": database.force_ssl,
            "storageQuota": database.storage_quota,
            "comments": database.comments,
        });
        self.action(
            DATABASE,
            "databaseUpdate",
            json!({ "database": database, "accesses": accesses }),
        )
    }

    fn delete_database(&self, database_id: &str) -> HostingResult<()> {
        self.command(DATABASE, "databaseDelete", json!({ "databaseId": database_id }))
    }

    fn wipe_database(&self, database_id: &str) -> HostingResult<()> {
        self.command(DATABASE, "databaseWipe", json!({ "databaseId": database_id }))
    }

    fn find_database_users(&self, filter: &Filter) -> HostingResult<Page<DatabaseUser>> {
        self.find(DATABASE, "usersFind", filter, None)
    }

    fn create_database_user(
        &self,
        name: &str,
        password: &str,
        account_id: Option<&str>,
    ) -> HostingResult<DatabaseUser> {
        self.action(
            DATABASE,
            "userCreate",
            json!({
                "user": { "name": name, "comment": MANAGED_COMMENT, "accountId": account_id },
                "password": password,
            }),
        )
    }

    fn delete_database_user(&self, user_id: &str) -> HostingResult<()> {
        self.command(DATABASE, "userDelete", json!({ "userId": user_id }))
    }
}
