// src/trigger.rs
use crate::error::WatchError;
use crate::event::FileEvent;
use filetime::FileTime;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Action fired by a watch session for each batch of relevant changes.
///
/// Implementations must not block: the session delivers events one at a time and
/// waits for `fire` to return before handling the next batch.
pub trait Trigger: Send + Sync + 'static {
    fn fire(&self, event: &FileEvent);
}

/// Updates the target file's modification time to now, creating it empty if absent.
///
/// The contents of an existing file are never altered.
pub fn touch(target: &Path) -> Result<(), WatchError> {
    let map_err = |source| WatchError::Trigger {
        path: target.to_path_buf(),
        source,
    };
    if !target.exists() {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(target)
            .map_err(map_err)?;
    }
    filetime::set_file_mtime(target, FileTime::now()).map_err(map_err)
}

/// Touches a target file on every fired event, without waiting for the touch to finish.
#[derive(Debug, Clone)]
pub struct TouchTrigger {
    target: PathBuf,
    runtime: Option<tokio::runtime::Handle>,
}

impl TouchTrigger {
    /// Dispatches onto the current tokio runtime's blocking pool when one exists,
    /// otherwise onto a detached thread.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            runtime: tokio::runtime::Handle::try_current().ok(),
        }
    }
}

fn touch_and_log(target: PathBuf) {
    match touch(&target) {
        Ok(()) => debug!("Touched {}", target.display()),
        Err(e) => warn!("Rebuild trigger failed: {}", e),
    }
}

impl Trigger for TouchTrigger {
    fn fire(&self, event: &FileEvent) {
        debug!(
            "Trigger fired by {} on {}",
            event.kind,
            event.path.display()
        );
        let target = self.target.clone();
        match &self.runtime {
            Some(handle) => {
                handle.spawn_blocking(move || touch_and_log(target));
            }
            None => {
                let spawned = std::thread::Builder::new()
                    .name("docwatch-touch".into())
                    .spawn(move || touch_and_log(target));
                if let Err(e) = spawned {
                    warn!("Failed to dispatch touch of {}: {}", self.target.display(), e);
                }
            }
        }
    }
}
