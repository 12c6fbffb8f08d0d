//! Host environment probing.
//!
//! Collects the operating system, architecture, and shell so the system
//! prompt can restrict answers to what actually runs on this machine.

use std::path::{Path, PathBuf};

/// Fallback OS name when nothing better can be determined on Linux.
const LINUX: &str = "linux";
/// Shell assumed when `$SHELL` is unset.
const DEFAULT_SHELL: &str = "sh";
/// Standard location of the OS release metadata on Linux.
const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Probed description of the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    pub shell: String,
}

/// Inputs for a probe, split out so tests can fake the platform.
#[derive(Debug, Clone)]
pub struct Prober {
    pub platform: String,
    pub arch: String,
    pub shell: Option<String>,
    pub os_release: PathBuf,
}

impl Prober {
    /// A prober reading from the running process.
    pub fn from_process() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            shell: std::env::var("SHELL").ok(),
            os_release: PathBuf::from(OS_RELEASE_PATH),
        }
    }

    /// Resolve the environment. Never fails; every branch has a fallback.
    pub fn probe(&self) -> EnvironmentInfo {
        EnvironmentInfo {
            os: self.os_name(),
            arch: self.arch.clone(),
            shell: shell_name(self.shell.as_deref()),
        }
    }

    fn os_name(&self) -> String {
        if self.platform != LINUX {
            return self.platform.clone();
        }
        read_os_release(&self.os_release).unwrap_or_else(|| LINUX.to_string())
    }
}

/// Probe the current process environment.
pub fn probe() -> EnvironmentInfo {
    Prober::from_process().probe()
}

/// Get the shell's file name from a `$SHELL` value (e.g. `/bin/zsh` -> `zsh`).
fn shell_name(shell: Option<&str>) -> String {
    let shell = shell.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SHELL);
    shell.rsplit('/').next().unwrap_or(shell).to_string()
}

/// Read a distribution name from an os-release file, if the file exists.
fn read_os_release(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    Some(parse_os_release(&contents).unwrap_or_else(|| LINUX.to_string()))
}

/// Pick the best display name from os-release contents.
///
/// `PRETTY_NAME` wins; otherwise `NAME VERSION`, then `NAME` alone.
fn parse_os_release(contents: &str) -> Option<String> {
    let mut pretty_name = None;
    let mut name = None;
    let mut version = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim_matches(|c| c == '"' || c == '\'');
        match key {
            "PRETTY_NAME" => pretty_name = Some(value),
            "NAME" => name = Some(value),
            "VERSION" => version = Some(value),
            _ => {}
        }
    }

    fn non_empty(value: Option<&str>) -> Option<&str> {
        value.filter(|s| !s.is_empty())
    }

    match (non_empty(pretty_name), non_empty(name), non_empty(version)) {
        (Some(pretty), _, _) => Some(pretty.to_string()),
        (None, Some(name), Some(version)) => Some(format!("{name} {version}")),
        (None, Some(name), None) => Some(name.to_string()),
        _ => None,
    }
}
