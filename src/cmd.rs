use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{HostingError, HostingResult};

/// Run a command with stdin/stdout/stderr inherited.
pub fn run_interactive(program: &str, args: &[&str]) -> HostingResult<()> {
    log::debug!("$ {}", format_command(program, args));

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| not_found_or_io(program, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(HostingError::CommandFailed {
            command: format_command(program, args),
            status,
        })
    }
}

/// Run a command with stdout redirected into `path`.
///
/// `envs` are added to the child environment only; use them for
/// credentials so they never show up in the argument list.
pub fn run_to_file(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    path: &Path,
) -> HostingResult<()> {
    let file = File::create(path)?;
    run_redirected(program, args, envs, Stdio::inherit(), Stdio::from(file))
}

/// Run a command reading its stdin from `path`.
pub fn run_from_file(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    path: &Path,
) -> HostingResult<()> {
    let file = File::open(path)?;
    run_redirected(program, args, envs, Stdio::from(file), Stdio::inherit())
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn run_redirected(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    stdin: Stdio,
    stdout: Stdio,
) -> HostingResult<()> {
    log::debug!("$ {}", format_command(program, args));

    let output = Command::new(program)
        .args(args)
        .envs(envs.iter().copied())
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(program, e))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        log::error!("stderr: {stderr}");
        Err(HostingError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

fn not_found_or_io(program: &str, e: std::io::Error) -> HostingError {
    if e.kind() == std::io::ErrorKind::NotFound {
        HostingError::CommandNotFound(program.to_string())
    } else {
        HostingError::Io(e)
    }
}

fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}
