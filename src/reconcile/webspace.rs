use indexmap::IndexMap;
use serde_json::Value;

use super::{Reconciler, wait_until_active};
use crate::api::lookup;
use crate::api::types::{NewWebspace, Webspace, WebspaceAccess, WebspaceUser};
use crate::desired::{self, RESOURCE_COMMENT, SshIdentity};
use crate::error::{HostingError, HostingResult};
use crate::naming;
use crate::secret;

pub const WEBSPACE_PRODUCT: &str = "webhosting-webspace-v1-1m";

#[derive(Debug, Clone)]
pub struct WebspaceOutcome {
    pub webspace: Webspace,
    pub is_new: bool,
    /// Login of the service user on the webspace host.
    pub ssh_user: String,
    pub env_vars: IndexMap<String, Value>,
}

impl Reconciler<'_> {
    /// Find or create the webspace and converge its cron jobs, redis
    /// flag and SSH accesses.
    pub fn webspace(&self) -> HostingResult<WebspaceOutcome> {
        let app = self.app()?;
        let php_version = self.php_version()?;
        let name = self.env.webspace_name(&self.app_key);

        let redis_enabled = app.redis_relationship().is_some();
        let cron_jobs = app
            .cron
            .iter()
            .map(|c| desired::cron_job(c, &php_version))
            .collect::<HostingResult<Vec<_>>>()?;

        let (service_user, users) = self.webspace_users(&name)?;

        let (webspace, is_new) = match lookup::find_webspace_by_name(self.api, &name)? {
            Some(mut webspace) => {
                let missing: Vec<&WebspaceUser> = users
                    .iter()
                    .filter(|u| !webspace.accesses.iter().any(|a| a.user_id == u.id))
                    .collect();

                if webspace.cron_jobs == cron_jobs
                    && webspace.redis_enabled == redis_enabled
                    && missing.is_empty()
                {
                    log::info!("Using webspace {name} ({})", webspace.id);
                } else {
                    log::info!("Updating webspace {name} ({})", webspace.id);

                    let mut accesses = webspace.accesses.clone();
                    accesses.extend(missing.iter().map(|u| WebspaceAccess::ssh(&u.id)));

                    webspace.cron_jobs = cron_jobs;
                    webspace.redis_enabled = redis_enabled;
                    webspace.accesses.clone_from(&accesses);

                    webspace = self.api.update_webspace(&webspace, &accesses)?;
                }
                (webspace, false)
            }
            None => {
                log::info!("Creating webspace {name}...");

                let accesses: Vec<WebspaceAccess> =
                    users.iter().map(|u| WebspaceAccess::ssh(&u.id)).collect();
                let new = NewWebspace {
                    name: name.clone(),
                    account_id: app.account.clone(),
                    comments: RESOURCE_COMMENT.to_string(),
                    product_code: WEBSPACE_PRODUCT.to_string(),
                    cron_jobs,
                    redis_enabled,
                };
                let created = self.api.create_webspace(
                    &new,
                    &accesses,
                    self.manifest.project.pool.as_deref(),
                )?;

                let webspace = wait_until_active(
                    &format!("webspace {name} ({})", created.id),
                    self.options.max_poll_attempts,
                    self.options.poll_interval,
                    || lookup::find_webspace_by_id(self.api, &created.id),
                )?;
                (webspace, true)
            }
        };

        let access = webspace
            .accesses
            .iter()
            .find(|a| a.user_id == service_user.id)
            .ok_or_else(|| {
                HostingError::UnexpectedResponse(format!(
                    "SSH access to webspace {name} was revoked for {}",
                    service_user.name
                ))
            })?;
        let ssh_user = access.user_name.clone().unwrap_or_default();

        let mut env_vars = IndexMap::new();
        if let Some(relationship) = app.redis_relationship() {
            let key = naming::env_key(relationship);
            let socket = format!("/run/redis-{}/sock", webspace.webspace_name);
            env_vars.insert(format!("{key}_HOST"), Value::String(socket.clone()));
            env_vars.insert(format!("{key}_URL"), Value::String(format!("redis://{socket}")));
        }

        Ok(WebspaceOutcome {
            webspace,
            is_new,
            ssh_user,
            env_vars,
        })
    }

    /// Resolve the service user and the declared SSH users, creating
    /// the ones that do not exist yet. The service user comes first.
    fn webspace_users(&self, webspace_name: &str) -> HostingResult<(WebspaceUser, Vec<WebspaceUser>)> {
        let service_name = naming::service_user_name(webspace_name);
        let identities = self.ssh_identities()?;

        let mut names = vec![service_name.clone()];
        names.extend(identities.iter().map(|i| i.display_name.clone()));
        let available = lookup::find_webspace_users_by_name(self.api, &names)?;

        let service_user = match available.iter().find(|u| u.name == service_name) {
            Some(user) => user.clone(),
            None => {
                let key = self
                    .options
                    .service_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        HostingError::Config(
                            "the ssh-public-key input is required to create the service user"
                                .into(),
                        )
                    })?;
                log::info!("Creating webspace user {service_name}");
                self.api
                    .create_webspace_user(&service_name, key.trim(), &secret::generate_password())?
            }
        };

        let mut users = vec![service_user.clone()];
        for identity in identities {
            let user = match available.iter().find(|u| u.name == identity.display_name) {
                Some(user) => user.clone(),
                None => {
                    log::info!("Creating webspace user {}", identity.display_name);
                    self.api.create_webspace_user(
                        &identity.display_name,
                        &identity.key,
                        &secret::generate_password(),
                    )?
                }
            };
            users.push(user);
        }

        Ok((service_user, users))
    }

    /// SSH identities of the app's users that pass the role filter and
    /// key validation. Invalid keys are skipped with a warning.
    fn ssh_identities(&self) -> HostingResult<Vec<SshIdentity>> {
        let app = self.app()?;
        let mut identities = Vec::new();

        for name in &app.users {
            let user = self.manifest.users.get(name).ok_or_else(|| {
                HostingError::Config(format!(
                    "user \"{name}\" of \"applications.{}.users\" is not declared under \"users\"",
                    self.app_key
                ))
            })?;

            if !self.options.ssh_roles.is_empty() && !self.options.ssh_roles.contains(&user.role) {
                log::debug!("Skipping user {name} with role \"{}\"", user.role);
                continue;
            }

            match desired::ssh_identity(name, &user.key) {
                Ok(identity) => identities.push(identity),
                Err(e) => log::warn!("{e}; skipping"),
            }
        }

        Ok(identities)
    }
}
