#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use hostingde_deploy::Manifest;
use hostingde_deploy::api::HostingApi;
use hostingde_deploy::api::filter::{Connective, Filter, fields};
use hostingde_deploy::api::types::{
    Database, DatabaseAccess, DatabaseUser, NewDatabase, NewWebspace, Page, PhpIniValue, Vhost,
    Webspace, WebspaceAccess, WebspaceUser,
};
use hostingde_deploy::desired::AccessLevel;
use hostingde_deploy::error::{HostingError, HostingResult};

pub const MANIFEST: &str = r#"
project:
  parent: main

applications:
  web:
    php:
      version: "8.2"
      extensions: [redis]
    relationships:
      database: "database:web"
      cache: redis
    web:
      - domainName: "www.example.com"
        root: public
        locations:
          "/":
            passthru: /index.php
    cron:
      - php: bin/console app:cleanup
        every: day
    users: [alice]
    sync: [var/uploads]

databases:
  schemas: [shop]
  endpoints:
    web: "shop:admin"

users:
  alice:
    role: developer
    key: "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC alice@example.com"
"#;

pub const SERVICE_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQD deploy@ci";

pub fn manifest() -> Manifest {
    Manifest::from_yaml(MANIFEST).unwrap()
}

#[derive(Debug, Default)]
pub struct State {
    pub webspaces: Vec<Webspace>,
    pub vhosts: Vec<Vhost>,
    pub restorable: Vec<Vhost>,
    pub webspace_users: Vec<WebspaceUser>,
    pub databases: Vec<Database>,
    pub database_users: Vec<DatabaseUser>,
    booting: HashMap<String, u32>,
}

/// In-memory hosting account. Mutations are journaled as
/// `"<method> <name>"`.
#[derive(Debug, Default)]
pub struct FakeHosting {
    pub state: RefCell<State>,
    journal: RefCell<Vec<String>>,
    next_id: Cell<u32>,
    boot_polls: u32,
}

impl FakeHosting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Created webspaces and databases report `creating` for this many
    /// polls by id before they turn `active`.
    pub fn boot_polls(mut self, polls: u32) -> Self {
        self.boot_polls = polls;
        self
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.borrow_mut().clear();
    }

    pub fn seed_webspace(&self, name: &str) -> Webspace {
        let n = self.next_number();
        let webspace = Webspace {
            id: format!("ws-{n}"),
            name: name.to_string(),
            webspace_name: format!("w{n}"),
            host_name: format!("host{n}.hosting.test"),
            status: "active".to_string(),
            ..Webspace::default()
        };
        self.state.borrow_mut().webspaces.push(webspace.clone());
        webspace
    }

    pub fn seed_vhost(&self, webspace_id: &str, domain: &str) -> Vhost {
        let vhost = Vhost {
            id: format!("vh-{}", self.next_number()),
            domain_name: domain.to_string(),
            webspace_id: webspace_id.to_string(),
            ..Vhost::default()
        };
        self.state.borrow_mut().vhosts.push(vhost.clone());
        vhost
    }

    pub fn seed_webspace_user(&self, name: &str) -> WebspaceUser {
        let n = self.next_number();
        let user = WebspaceUser {
            id: format!("wu-{n}"),
            name: name.to_string(),
            user_name: format!("u{n}"),
            status: "active".to_string(),
            ..WebspaceUser::default()
        };
        self.state.borrow_mut().webspace_users.push(user.clone());
        user
    }

    pub fn seed_database(&self, name: &str) -> Database {
        let n = self.next_number();
        let database = Database {
            id: format!("db-{n}"),
            name: name.to_string(),
            db_name: format!("db_{n}"),
            host_name: format!("mysql{n}.hosting.test"),
            status: "active".to_string(),
            ..Database::default()
        };
        self.state.borrow_mut().databases.push(database.clone());
        database
    }

    pub fn seed_database_user(&self, name: &str) -> DatabaseUser {
        let n = self.next_number();
        let user = DatabaseUser {
            id: format!("du-{n}"),
            name: name.to_string(),
            db_user_name: format!("dbu_{n}"),
            status: "active".to_string(),
        };
        self.state.borrow_mut().database_users.push(user.clone());
        user
    }

    /// Set the access of a user on a database, replacing any previous one.
    pub fn grant(&self, database_id: &str, user_id: &str, levels: Vec<AccessLevel>) {
        let mut state = self.state.borrow_mut();
        let login = state
            .database_users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.db_user_name.clone());
        let database = state
            .databases
            .iter_mut()
            .find(|d| d.id == database_id)
            .unwrap();
        database.accesses.retain(|a| a.user_id != user_id);
        database.accesses.push(DatabaseAccess {
            user_id: user_id.to_string(),
            database_id: Some(database_id.to_string()),
            access_level: levels,
            db_login: login,
            user_name: None,
        });
    }

    pub fn webspace(&self, name: &str) -> Option<Webspace> {
        self.state
            .borrow()
            .webspaces
            .iter()
            .find(|w| w.name == name)
            .cloned()
    }

    pub fn database(&self, name: &str) -> Option<Database> {
        self.state
            .borrow()
            .databases
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    pub fn webspace_user(&self, name: &str) -> Option<WebspaceUser> {
        self.state
            .borrow()
            .webspace_users
            .iter()
            .find(|u| u.name == name)
            .cloned()
    }

    pub fn database_user(&self, name: &str) -> Option<DatabaseUser> {
        self.state
            .borrow()
            .database_users
            .iter()
            .find(|u| u.name == name)
            .cloned()
    }

    pub fn database_user_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .database_users
            .iter()
            .map(|u| u.name.clone())
            .collect()
    }

    fn next_number(&self) -> u32 {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        n
    }

    fn record(&self, method: &str, name: &str) {
        self.journal.borrow_mut().push(format!("{method} {name}"));
    }

    fn initial_status(&self, id: &str) -> String {
        if self.boot_polls == 0 {
            "active".to_string()
        } else {
            self.state
                .borrow_mut()
                .booting
                .insert(id.to_string(), self.boot_polls);
            "creating".to_string()
        }
    }

    /// Advance the boot of the resource a by-id poll asks for.
    fn tick(&self, filter: &Filter, id_field: &str) {
        let Filter::Field { field, value } = filter else {
            return;
        };
        if field != id_field {
            return;
        }

        let mut state = self.state.borrow_mut();
        let booted = match state.booting.get_mut(value) {
            Some(0) => true,
            Some(left) => {
                *left -= 1;
                false
            }
            None => return,
        };
        if booted {
            state.booting.remove(value);
            for webspace in state.webspaces.iter_mut().filter(|w| &w.id == value) {
                webspace.status = "active".to_string();
            }
            for database in state.databases.iter_mut().filter(|d| &d.id == value) {
                database.status = "active".to_string();
            }
        }
    }

    fn webspace_accesses(&self, accesses: &[WebspaceAccess]) -> Vec<WebspaceAccess> {
        let state = self.state.borrow();
        accesses
            .iter()
            .map(|access| WebspaceAccess {
                user_name: state
                    .webspace_users
                    .iter()
                    .find(|u| u.id == access.user_id)
                    .map(|u| u.user_name.clone()),
                ..access.clone()
            })
            .collect()
    }

    fn database_accesses(&self, database_id: &str, accesses: &[DatabaseAccess]) -> Vec<DatabaseAccess> {
        let state = self.state.borrow();
        accesses
            .iter()
            .map(|access| DatabaseAccess {
                database_id: Some(database_id.to_string()),
                db_login: state
                    .database_users
                    .iter()
                    .find(|u| u.id == access.user_id)
                    .map(|u| u.db_user_name.clone()),
                ..access.clone()
            })
            .collect()
    }
}

fn not_found(what: &str, id: &str) -> HostingError {
    HostingError::Api {
        errors: vec![serde_json::json!({ "code": 404, "text": format!("{what} {id} not found") })],
    }
}

fn matches(filter: &Filter, values: &dyn Fn(&str) -> Vec<String>) -> bool {
    match filter {
        Filter::Field { field, value } => values(field).iter().any(|v| match value.strip_suffix('*') {
            Some(prefix) => v.starts_with(prefix),
            None => v == value,
        }),
        Filter::Group {
            connective: Connective::And,
            filters,
        } => filters.iter().all(|f| matches(f, values)),
        Filter::Group {
            connective: Connective::Or,
            filters,
        } => filters.iter().any(|f| matches(f, values)),
    }
}

fn page<T>(data: Vec<T>, limit: Option<u32>) -> Page<T> {
    let total_entries = data.len() as u64;
    let data = match limit {
        Some(limit) => data.into_iter().take(limit as usize).collect(),
        None => data,
    };
    Page {
        data,
        total_entries,
    }
}

impl HostingApi for FakeHosting {
    fn find_webspaces(&self, filter: &Filter, limit: Option<u32>) -> HostingResult<Page<Webspace>> {
        self.tick(filter, fields::WEBSPACE_ID);
        let state = self.state.borrow();
        let found = state
            .webspaces
            .iter()
            .filter(|w| {
                matches(filter, &|field| match field {
                    fields::WEBSPACE_ID => vec![w.id.clone()],
                    fields::WEBSPACE_NAME => vec![w.name.clone()],
                    fields::WEBSPACE_STATUS => vec![w.status.clone()],
                    _ => Vec::new(),
                })
            })
            .cloned()
            .collect();
        Ok(page(found, limit))
    }

    fn create_webspace(
        &self,
        webspace: &NewWebspace,
        accesses: &[WebspaceAccess],
        _pool_id: Option<&str>,
    ) -> HostingResult<Webspace> {
        self.record("create_webspace", &webspace.name);
        let n = self.next_number();
        let id = format!("ws-{n}");
        let created = Webspace {
            status: self.initial_status(&id),
            id,
            name: webspace.name.clone(),
            webspace_name: format!("w{n}"),
            host_name: format!("host{n}.hosting.test"),
            cron_jobs: webspace.cron_jobs.clone(),
            redis_enabled: webspace.redis_enabled,
            accesses: self.webspace_accesses(accesses),
            ..Webspace::default()
        };
        self.state.borrow_mut().webspaces.push(created.clone());
        Ok(created)
    }

    fn update_webspace(
        &self,
        webspace: &Webspace,
        accesses: &[WebspaceAccess],
    ) -> HostingResult<Webspace> {
        self.record("update_webspace", &webspace.name);
        let accesses = self.webspace_accesses(accesses);
        let mut state = self.state.borrow_mut();
        let stored = state
            .webspaces
            .iter_mut()
            .find(|w| w.id == webspace.id)
            .ok_or_else(|| not_found("webspace", &webspace.id))?;
        *stored = Webspace {
            accesses,
            ..webspace.clone()
        };
        Ok(stored.clone())
    }

    fn delete_webspace(&self, webspace_id: &str) -> HostingResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state
            .webspaces
            .iter()
            .position(|w| w.id == webspace_id)
            .ok_or_else(|| not_found("webspace", webspace_id))?;
        let removed = state.webspaces.remove(index);
        drop(state);
        self.record("delete_webspace", &removed.name);
        Ok(())
    }

    fn find_vhosts(&self, filter: &Filter) -> HostingResult<Page<Vhost>> {
        let state = self.state.borrow();
        let found = state
            .vhosts
            .iter()
            .filter(|v| {
                matches(filter, &|field| match field {
                    fields::WEBSPACE_ID => vec![v.webspace_id.clone()],
                    fields::VHOST_STATUS => vec!["active".to_string()],
                    _ => Vec::new(),
                })
            })
            .cloned()
            .collect();
        Ok(page(found, None))
    }

    fn create_vhost(&self, vhost: &Vhost, _php_ini: &[PhpIniValue]) -> HostingResult<Vhost> {
        self.record("create_vhost", &vhost.domain_name);
        let created = Vhost {
            id: format!("vh-{}", self.next_number()),
            ..vhost.clone()
        };
        self.state.borrow_mut().vhosts.push(created.clone());
        Ok(created)
    }

    fn update_vhost(&self, vhost: &Vhost, _php_ini: &[PhpIniValue]) -> HostingResult<Vhost> {
        self.record("update_vhost", &vhost.domain_name);
        let mut state = self.state.borrow_mut();
        let stored = state
            .vhosts
            .iter_mut()
            .find(|v| v.id == vhost.id)
            .ok_or_else(|| not_found("vhost", &vhost.id))?;
        *stored = vhost.clone();
        Ok(stored.clone())
    }

    fn delete_vhost(&self, vhost_id: &str) -> HostingResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state
            .vhosts
            .iter()
            .position(|v| v.id == vhost_id)
            .ok_or_else(|| not_found("vhost", vhost_id))?;
        let removed = state.vhosts.remove(index);
        state.restorable.push(removed.clone());
        drop(state);
        self.record("delete_vhost", &removed.domain_name);
        Ok(())
    }

    fn purge_restorable_vhost(&self, vhost_id: &str) -> HostingResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state
            .restorable
            .iter()
            .position(|v| v.id == vhost_id)
            .ok_or_else(|| not_found("restorable vhost", vhost_id))?;
        let removed = state.restorable.remove(index);
        drop(state);
        self.record("purge_restorable_vhost", &removed.domain_name);
        Ok(())
    }

    fn find_webspace_users(&self, filter: &Filter) -> HostingResult<Page<WebspaceUser>> {
        let state = self.state.borrow();
        let found = state
            .webspace_users
            .iter()
            .filter(|u| {
                matches(filter, &|field| match field {
                    fields::USER_NAME => vec![u.name.clone()],
                    _ => Vec::new(),
                })
            })
            .cloned()
            .collect();
        Ok(page(found, None))
    }

    fn create_webspace_user(
        &self,
        name: &str,
        ssh_key: &str,
        _password: &str,
    ) -> HostingResult<WebspaceUser> {
        self.record("create_webspace_user", name);
        let mut user = self.seed_webspace_user(name);
        user.ssh_key = ssh_key.to_string();
        if let Some(stored) = self
            .state
            .borrow_mut()
            .webspace_users
            .iter_mut()
            .find(|u| u.id == user.id)
        {
            stored.ssh_key = ssh_key.to_string();
        }
        Ok(user)
    }

    fn delete_webspace_user(&self, user_id: &str) -> HostingResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state
            .webspace_users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| not_found("webspace user", user_id))?;
        let removed = state.webspace_users.remove(index);
        drop(state);
        self.record("delete_webspace_user", &removed.name);
        Ok(())
    }

    fn find_databases(&self, filter: &Filter, limit: Option<u32>) -> HostingResult<Page<Database>> {
        self.tick(filter, fields::DATABASE_ID);
        let state = self.state.borrow();
        let found = state
            .databases
            .iter()
            .filter(|d| {
                matches(filter, &|field| match field {
                    fields::DATABASE_ID => vec![d.id.clone()],
                    fields::DATABASE_NAME => vec![d.name.clone()],
                    fields::DATABASE_STATUS => vec![d.status.clone()],
                    _ => Vec::new(),
                })
            })
            .cloned()
            .collect();
        Ok(page(found, limit))
    }

    fn create_database(
        &self,
        database: &NewDatabase,
        accesses: &[DatabaseAccess],
        _pool_id: Option<&str>,
    ) -> HostingResult<Database> {
        self.record("create_database", &database.name);
        let n = self.next_number();
        let id = format!("db-{n}");
        let created = Database {
            status: self.initial_status(&id),
            accesses: self.database_accesses(&id, accesses),
            id,
            name: database.name.clone(),
            db_name: format!("db_{n}"),
            host_name: format!("mysql{n}.hosting.test"),
            product_code: database.product_code.clone(),
            storage_quota: database.storage_quota,
            comments: database.comments.clone(),
            ..Database::default()
        };
        self.state.borrow_mut().databases.push(created.clone());
        Ok(created)
    }

    fn update_database(
        &self,
        database: &Database,
        accesses: &[DatabaseAccess],
    ) -> HostingResult<Database> {
        self.record("update_database", &database.name);
        let accesses = self.database_accesses(&database.id, accesses);
        let mut state = self.state.borrow_mut();
        let stored = state
            .databases
            .iter_mut()
            .find(|d| d.id == database.id)
            .ok_or_else(|| not_found("database", &database.id))?;
        stored.accesses = accesses;
        Ok(stored.clone())
    }

    fn delete_database(&self, database_id: &str) -> HostingResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state
            .databases
            .iter()
            .position(|d| d.id == database_id)
            .ok_or_else(|| not_found("database", database_id))?;
        let removed = state.databases.remove(index);
        drop(state);
        self.record("delete_database", &removed.name);
        Ok(())
    }

    fn wipe_database(&self, database_id: &str) -> HostingResult<()> {
        let name = self
            .state
            .borrow()
            .databases
            .iter()
            .find(|d| d.id == database_id)
            .map(|d| d.name.clone())
            .ok_or_else(|| not_found("database", database_id))?;
        self.record("wipe_database", &name);
        Ok(())
    }

    fn find_database_users(&self, filter: &Filter) -> HostingResult<Page<DatabaseUser>> {
        let state = self.state.borrow();
        let found = state
            .database_users
            .iter()
            .filter(|u| {
                matches(filter, &|field| match field {
                    fields::USER_NAME => vec![u.name.clone()],
                    _ => Vec::new(),
                })
            })
            .cloned()
            .collect();
        Ok(page(found, None))
    }

    fn create_database_user(
        &self,
        name: &str,
        _password: &str,
        _account_id: Option<&str>,
    ) -> HostingResult<DatabaseUser> {
        self.record("create_database_user", name);
        Ok(self.seed_database_user(name))
    }

    fn delete_database_user(&self, user_id: &str) -> HostingResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state
            .database_users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| not_found("database user", user_id))?;
        let removed = state.database_users.remove(index);
        for database in &mut state.databases {
            database.accesses.retain(|a| a.user_id != user_id);
        }
        drop(state);
        self.record("delete_database_user", &removed.name);
        Ok(())
    }
}
