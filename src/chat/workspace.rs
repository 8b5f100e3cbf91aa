//! Working-directory provider
//!
//! Display only: the status bar shows where the session runs. Sandboxing
//! and path enforcement belong to the tool layer, not here.

use std::path::{Path, PathBuf};

pub trait Workspace: Send + Sync {
    fn current_dir(&self) -> PathBuf;
}

/// The process working directory, read on every call
#[derive(Debug, Default)]
pub struct ProcessWorkspace;

impl Workspace for ProcessWorkspace {
    fn current_dir(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// A fixed directory (tests, sandboxed sessions)
#[derive(Debug, Clone)]
pub struct FixedWorkspace(pub PathBuf);

impl Workspace for FixedWorkspace {
    fn current_dir(&self) -> PathBuf {
        self.0.clone()
    }
}

/// Replace the home directory prefix with `~`
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}
