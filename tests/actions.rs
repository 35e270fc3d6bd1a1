use std::fs;

use hostingde_deploy::actions::ActionsIo;

#[test]
fn outputs_are_appended_as_heredocs() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    let mut io = ActionsIo::new(Some(output.clone()), None, Vec::new());

    io.set_output("ssh-user", "u1").unwrap();
    io.set_output("env-vars", "{\n\"A\":1}").unwrap();

    let content = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with("ssh-user<<ghadelimiter_"));
    assert_eq!(lines[1], "u1");
    assert_eq!(lines[2], lines[0].trim_start_matches("ssh-user<<"));
    assert!(lines[3].starts_with("env-vars<<ghadelimiter_"));
    assert_eq!(lines[4..6], ["{", "\"A\":1}"]);
    assert!(io.into_inner().is_empty());
}

#[test]
fn outputs_fall_back_to_workflow_commands() {
    let mut io = ActionsIo::new(None, None, Vec::new());

    io.set_output("public-url", "https://a.test").unwrap();
    io.set_output("sync-databases", "shop\nblog").unwrap();

    let commands = String::from_utf8(io.into_inner()).unwrap();
    assert_eq!(
        commands,
        "::set-output name=public-url::https://a.test\n\
         ::set-output name=sync-databases::shop%0Ablog\n"
    );
}

#[test]
fn masks_skip_empty_values() {
    let mut io = ActionsIo::new(None, None, Vec::new());

    io.add_mask("").unwrap();
    io.add_mask("s3cr%t").unwrap();

    assert_eq!(String::from_utf8(io.into_inner()).unwrap(), "::add-mask::s3cr%25t\n");
}

#[test]
fn exported_variables_go_to_env_file() {
    let dir = tempfile::tempdir().unwrap();
    let env = dir.path().join("env");
    let mut io = ActionsIo::new(None, Some(env.clone()), Vec::new());

    io.export_variable("APP_ENV", "prod").unwrap();

    let content = fs::read_to_string(&env).unwrap();
    assert!(content.starts_with("APP_ENV<<ghadelimiter_"));
    assert!(content.contains("\nprod\n"));
}

#[test]
fn export_without_env_file_is_ignored() {
    let mut io = ActionsIo::new(None, None, Vec::new());

    io.export_variable("APP_ENV", "prod").unwrap();

    assert!(io.into_inner().is_empty());
}

#[test]
fn failure_is_an_error_annotation() {
    let mut io = ActionsIo::new(None, None, Vec::new());

    io.fail("provisioning failed:\nwebspace timed out").unwrap();

    assert_eq!(
        String::from_utf8(io.into_inner()).unwrap(),
        "::error::provisioning failed:%0Awebspace timed out\n"
    );
}
