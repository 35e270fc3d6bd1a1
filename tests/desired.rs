use hostingde_deploy::api::types::{LocationType, MatchType};
use hostingde_deploy::desired::{
    MANAGED_COMMENT, Privilege, accesses, cron_job, location, php_ini, ssh_identity,
};
use hostingde_deploy::error::HostingError;
use hostingde_deploy::manifest::{CronjobConfig, LocationConfig, Passthru};
use indexmap::IndexMap;
use serde_json::json;

fn cron(php: Option<&str>, cmd: Option<&str>, every: &str, on: Option<&str>) -> CronjobConfig {
    CronjobConfig {
        php: php.map(ToString::to_string),
        cmd: cmd.map(ToString::to_string),
        every: every.to_string(),
        on: on.map(ToString::to_string),
    }
}

#[test]
fn access_labels() {
    assert_eq!(accesses("ro"), vec!["read"]);
    assert_eq!(accesses("rw"), vec!["read", "write"]);
    assert_eq!(accesses("admin"), vec!["read", "write", "schema"]);
    assert_eq!(accesses("owner"), vec!["read", "write", "schema"]);
    assert_eq!(Privilege::from_label(" rw "), Privilege::ReadWrite);
}

#[test]
fn php_cron_job() {
    let job = cron_job(&cron(Some("bin/console app:cleanup --force"), None, "day", None), "8.2")
        .unwrap();

    assert_eq!(job.kind, "php");
    assert_eq!(job.script, "bin/console");
    assert_eq!(job.parameters, vec!["app:cleanup", "--force"]);
    assert_eq!(job.interpreter_version, "8.2");
    assert_eq!(job.schedule, "daily");
    assert_eq!(job.daypart, "1-5");
    assert_eq!(job.comments, MANAGED_COMMENT);
}

#[test]
fn bash_cron_job_has_no_interpreter() {
    let job = cron_job(&cron(None, Some("bin/backup.sh"), "week", Some("Fri")), "8.2").unwrap();

    assert_eq!(job.kind, "bash");
    assert_eq!(job.interpreter_version, "");
    assert_eq!(job.schedule, "weekly");
    assert_eq!(job.weekday, "fri");
}

#[test]
fn monthly_cron_job_defaults_to_first_day() {
    let first = cron_job(&cron(None, Some("a"), "month", None), "8.2").unwrap();
    let fifteenth = cron_job(&cron(None, Some("a"), "month", Some("15")), "8.2").unwrap();

    assert_eq!(first.day_of_month, 1);
    assert_eq!(fifteenth.day_of_month, 15);
}

#[test]
fn other_schedules_pass_through() {
    let job = cron_job(&cron(None, Some("a"), "hourly", None), "8.2").unwrap();

    assert_eq!(job.schedule, "hourly");
    assert_eq!(job.daypart, "");
}

#[test]
fn cron_job_without_command_is_rejected() {
    let err = cron_job(&cron(None, None, "day", None), "8.2").unwrap_err();

    assert!(matches!(err, HostingError::Config(_)));
}

#[test]
fn location_kinds() {
    let passthru = LocationConfig {
        passthru: Some(Passthru::Script("/index.php".into())),
        allow: true,
    };
    let blocked = LocationConfig {
        passthru: Some(Passthru::Enabled(false)),
        allow: false,
    };

    let root = location("/", &passthru);
    let regex = location("^/private", &blocked);
    let plain = location("@fallback", &LocationConfig::default());

    assert_eq!(root.match_type, MatchType::Directory);
    assert_eq!(root.location_type, LocationType::Generic);
    assert_eq!(root.map_script, "/index.php");
    assert!(root.php_enabled);

    assert_eq!(regex.match_type, MatchType::Regex);
    assert_eq!(regex.location_type, LocationType::BlockAccess);
    assert!(!regex.php_enabled);

    assert_eq!(plain.match_type, MatchType::Default);
    assert!(plain.php_enabled);
}

#[test]
fn php_ini_adds_extension_lines() {
    let ini = IndexMap::from([
        ("memory_limit".to_string(), json!("256M")),
        ("max_execution_time".to_string(), json!(60)),
    ]);

    let values = php_ini(&ini, &["redis".to_string(), "intl".to_string()]);

    let pairs: Vec<(&str, &str)> = values
        .iter()
        .map(|v| (v.key.as_str(), v.value.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("memory_limit", "256M"),
            ("max_execution_time", "60"),
            ("extension=redis.so", "true"),
        ]
    );
}

#[test]
fn ssh_identity_embeds_fingerprint() {
    let a = ssh_identity("alice", "ssh-rsa AAAAB3NzaC1yc2E alice@laptop").unwrap();
    let b = ssh_identity("alice", "ssh-rsa AAAAB3NzaC1yc2F alice@laptop").unwrap();

    assert!(a.display_name.starts_with("alice #"));
    assert!(a.display_name.ends_with('#'));
    assert_eq!(a.display_name.len(), "alice #".len() + 7);
    assert_ne!(a.display_name, b.display_name);
    assert_eq!(a.key, "ssh-rsa AAAAB3NzaC1yc2E alice@laptop");
}

#[test]
fn unsupported_or_malformed_keys_are_rejected() {
    for key in [
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5",
        "ssh-rsa",
        "ssh-rsa AAAA$$ x",
        "ssh-rsa AAAA a b",
    ] {
        assert!(
            matches!(ssh_identity("bob", key), Err(HostingError::Validation(_))),
            "{key} was accepted"
        );
    }
}
