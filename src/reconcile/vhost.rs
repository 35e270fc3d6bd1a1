use std::thread;

use serde_json::Map;

use super::Reconciler;
use crate::api::lookup;
use crate::api::types::{SslSettings, Vhost, VhostLocation, Webspace};
use crate::desired;
use crate::error::HostingResult;
use crate::manifest::WebConfig;
use crate::naming;

pub const SERVER_TYPE: &str = "nginx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub deploy_path: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct VhostOutcome {
    /// One entry per web entry, in manifest order.
    pub destinations: Vec<Destination>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl Reconciler<'_> {
    /// Converge the vhosts of `webspace` with the app's web entries and
    /// delete the ones no entry produces anymore.
    pub fn vhosts(&self, webspace: &Webspace) -> HostingResult<VhostOutcome> {
        let app = self.app()?;
        let php_version = self.php_version()?;
        let php_ini = desired::php_ini(&app.php.ini, &app.php.extensions);
        let found = lookup::find_vhosts_by_webspace(self.api, &webspace.id)?;

        let mut outcome = VhostOutcome::default();
        let mut wanted = Vec::new();

        for web in app.web_entries() {
            let domain = naming::translate_domain_name(
                web.domain_name.as_deref(),
                &self.env.ref_name,
                &self.manifest.project,
                &self.app_key,
                self.options.default_domain.as_deref(),
            )?;
            let target = desired_vhost(webspace, &web, &domain, &php_version);

            match found.iter().find(|v| v.domain_name == domain) {
                None => {
                    log::info!("Configuring {domain}...");
                    self.api.create_vhost(&target, &php_ini)?;
                    outcome.created.push(domain.clone());
                }
                Some(current) => {
                    let changes = vhost_changes(current, &target);
                    if !changes.is_empty() {
                        log::info!("Updating {domain} ({})...", changes.join(", "));
                        self.api.update_vhost(&apply(current, &target), &php_ini)?;
                        outcome.updated.push(domain.clone());
                    }
                }
            }

            outcome.destinations.push(Destination {
                deploy_path: format!("/home/{}/html", webspace.webspace_name),
                public_url: format!("https://{domain}"),
            });
            wanted.push(domain);
        }

        let relicts: Vec<&Vhost> = found
            .iter()
            .filter(|v| !wanted.contains(&v.domain_name))
            .collect();

        for relict in &relicts {
            log::info!("Deleting {}...", relict.domain_name);
            self.api.delete_vhost(&relict.id)?;
            outcome.deleted.push(relict.domain_name.clone());
        }

        if !relicts.is_empty() {
            // The domain stays reserved until the restorable copy is gone.
            thread::sleep(self.options.purge_delay);
            for relict in &relicts {
                log::info!("Purging {}...", relict.domain_name);
                self.api.purge_restorable_vhost(&relict.id)?;
            }
        }

        Ok(outcome)
    }
}

/// The vhost a web entry asks for.
#[must_use]
pub fn desired_vhost(webspace: &Webspace, web: &WebConfig, domain: &str, php_version: &str) -> Vhost {
    Vhost {
        id: String::new(),
        domain_name: domain.to_string(),
        webspace_id: webspace.id.clone(),
        server_type: SERVER_TYPE.to_string(),
        web_root: desired::web_root(web.root.as_deref()),
        php_version: php_version.to_string(),
        enable_alias: web.www,
        redirect_to_primary_name: true,
        redirect_http_to_https: true,
        locations: web
            .locations
            .iter()
            .map(|(matcher, location)| desired::location(matcher, location))
            .collect(),
        ssl_settings: Some(SslSettings::default()),
        extra: Map::new(),
    }
}

/// Names of the fields in which `current` differs from `target`.
/// Locations compare as a set.
#[must_use]
pub fn vhost_changes(current: &Vhost, target: &Vhost) -> Vec<&'static str> {
    let mut changes = Vec::new();

    if current.php_version != target.php_version {
        changes.push("phpVersion");
    }
    if current.enable_alias != target.enable_alias {
        changes.push("enableAlias");
    }
    if current.web_root != target.web_root {
        changes.push("webRoot");
    }
    if current.redirect_to_primary_name != target.redirect_to_primary_name {
        changes.push("redirectToPrimaryName");
    }
    if current.redirect_http_to_https != target.redirect_http_to_https {
        changes.push("redirectHttpToHttps");
    }
    if sorted(&current.locations) != sorted(&target.locations) {
        changes.push("locations");
    }

    changes
}

/// `current` with the managed fields of `target`; everything else the
/// API returned is sent back untouched.
fn apply(current: &Vhost, target: &Vhost) -> Vhost {
    Vhost {
        php_version: target.php_version.clone(),
        enable_alias: target.enable_alias,
        web_root: target.web_root.clone(),
        redirect_to_primary_name: target.redirect_to_primary_name,
        redirect_http_to_https: target.redirect_http_to_https,
        locations: target.locations.clone(),
        ..current.clone()
    }
}

fn sorted(locations: &[VhostLocation]) -> Vec<&VhostLocation> {
    let mut sorted: Vec<&VhostLocation> = locations.iter().collect();
    sorted.sort_by(|a, b| a.match_string.cmp(&b.match_string));
    sorted
}
