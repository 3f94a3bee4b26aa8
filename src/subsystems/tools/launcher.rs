//! Desktop launchers: `WebsiteOpener`, `AppFinder`, `AppOpener`.
//!
//! Launched processes are not awaited by the tool; a background task reaps
//! each one when it exits.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ToolError;

/// Prefix `https://` unless the input already starts with `http`.
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    if input.starts_with("http") {
        input.to_string()
    } else {
        format!("https://{input}")
    }
}

pub fn open_website(input: &str) -> Result<String, ToolError> {
    let url = normalize_url(input);
    open_target(&url)?;
    Ok(format!("Opening {url}..."))
}

/// Resolve an executable on `PATH`.
pub fn resolve_app(name: &str) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    which::which(name).ok()
}

pub fn find_app(name: &str) -> String {
    match resolve_app(name) {
        Some(path) => path.display().to_string(),
        None => format!("Could not find the application: {}", name.trim()),
    }
}

pub fn open_app(input: &str) -> Result<String, ToolError> {
    let item = input.trim().to_lowercase();
    if item.is_empty() {
        return Err(ToolError::InvalidInput("no application given".into()));
    }
    if Path::new(&item).exists() {
        open_target(&item)?;
        return Ok(format!("Opening {item}..."));
    }
    match resolve_app(&item) {
        Some(path) => {
            spawn_detached(Command::new(&path), &item)?;
            Ok(format!("Opening {item} from {}...", path.display()))
        }
        None => Ok(format!("Could not find the application: {item}")),
    }
}

/// Hand a URL or file path to the platform opener.
fn open_target(target: &str) -> Result<(), ToolError> {
    let mut cmd = platform_opener();
    cmd.arg(target);
    spawn_detached(cmd, target).map(|_| ())
}

#[cfg(target_os = "macos")]
fn platform_opener() -> Command {
    Command::new("open")
}

#[cfg(target_os = "windows")]
fn platform_opener() -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_opener() -> Command {
    Command::new("xdg-open")
}

/// Spawn `cmd` with null stdio. The returned task waits on the child so it
/// does not linger as a zombie. Must be called inside the tokio runtime.
fn spawn_detached(mut cmd: Command, what: &str) -> Result<JoinHandle<Option<ExitStatus>>, ToolError> {
    debug!(?cmd, "spawning");
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ToolError::Launch(format!("{what}: {e}")))?;
    let what = what.to_string();
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                debug!(%what, %status, "launched process exited");
                Some(status)
            }
            Err(e) => {
                warn!(%what, error = %e, "failed to wait on launched process");
                None
            }
        }
    }))
}
