// src/watcher.rs
use crate::config::{Mode, WatchConfig};
use crate::error::WatchError;
use crate::event::{classify, FileEvent};
use crate::pattern::PatternSet;
use crate::trigger::{TouchTrigger, Trigger};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcherTrait};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often the session thread re-checks the stop flag while idle.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle of a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Watching,
    Stopped,
}

/// What the session thread needs to decide whether a path is relevant.
struct Filter {
    cwd: PathBuf,
    target: PathBuf,
    patterns: PatternSet,
}

impl Filter {
    fn first_match(&self, events: &[FileEvent]) -> Option<FileEvent> {
        events
            .iter()
            .find(|e| e.path != self.target && self.patterns.matches(&self.cwd, &e.path))
            .cloned()
    }
}

/// An active watcher bound to one [`WatchConfig`].
///
/// The session exclusively owns the underlying file system watcher. It is released by
/// [`WatchSession::stop`] or, at the latest, when the session is dropped.
pub struct WatchSession {
    roots: Vec<PathBuf>,
    stopped: Arc<AtomicBool>,
    debouncer: Option<Debouncer<RecommendedWatcher, FileIdMap>>,
    worker: Option<JoinHandle<()>>,
}

/// Resolves symlinks in a path whose final component may not exist yet.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

impl WatchSession {
    /// Starts a session that touches `config.target_file` on every relevant change.
    ///
    /// Returns `Ok(None)` without any watch setup when `mode` is [`Mode::Serve`] and
    /// `config.files` is empty; the host already watches its own sources then.
    pub fn start(config: WatchConfig, mode: Mode) -> Result<Option<Self>, WatchError> {
        let trigger = TouchTrigger::new(config.target_file.clone());
        Self::start_with(config, mode, Arc::new(trigger))
    }

    /// Like [`WatchSession::start`] but with a caller-supplied trigger action.
    pub fn start_with(
        config: WatchConfig,
        mode: Mode,
        trigger: Arc<dyn Trigger>,
    ) -> Result<Option<Self>, WatchError> {
        if mode == Mode::Serve && config.files.is_empty() {
            info!("Serve mode with no watch patterns; not starting a watcher");
            return Ok(None);
        }

        let patterns = PatternSet::parse(&config.files)?;
        let cwd = config
            .cwd
            .canonicalize()
            .map_err(|source| WatchError::InvalidCwd {
                path: config.cwd.clone(),
                source,
            })?;
        let roots = patterns.watch_roots(&cwd)?;
        let idle = patterns.is_empty();
        let filter = Filter {
            target: canonicalize_lenient(&config.target_file),
            cwd,
            patterns,
        };

        let (debouncer_internal_tx, debouncer_internal_rx) = mpsc::channel();
        let mut debouncer = new_debouncer(config.debounce, None, debouncer_internal_tx).map_err(
            |source| WatchError::WatchInit {
                path: config.cwd.clone(),
                source,
            },
        )?;

        for root in &roots {
            debouncer
                .watcher()
                .watch(root, RecursiveMode::Recursive)
                .map_err(|source| WatchError::WatchInit {
                    path: root.clone(),
                    source,
                })?;
            debouncer.cache().add_root(root, RecursiveMode::Recursive);
            info!("Watching {}", root.display());
        }

        if idle {
            warn!("No watch patterns configured; session is idle");
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let thread_stopped = Arc::clone(&stopped);
        let worker = std::thread::Builder::new()
            .name("docwatch-session".into())
            .spawn(move || run_session(debouncer_internal_rx, filter, trigger, thread_stopped))
            .map_err(|e| WatchError::WatchInit {
                path: config.cwd.clone(),
                source: notify::Error::io(e),
            })?;

        info!(
            "Watch session started for {:?} (target {})",
            config.files,
            config.target_file.display()
        );

        Ok(Some(Self {
            roots,
            stopped,
            debouncer: Some(debouncer),
            worker: Some(worker),
        }))
    }

    /// Directories the session registered with the file system watcher.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn state(&self) -> SessionState {
        if self.stopped.load(Ordering::SeqCst) {
            SessionState::Stopped
        } else {
            SessionState::Watching
        }
    }

    /// Releases the watch handle. No trigger fires after this returns.
    ///
    /// Calling it again is a no-op. Touches already dispatched are not cancelled.
    pub fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(self.debouncer.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Watch session thread panicked");
            }
        }
        info!("Watch session stopped");
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Receives debounced batches and fires the trigger at most once per batch.
fn run_session(
    rx: Receiver<DebounceEventResult>,
    filter: Filter,
    trigger: Arc<dyn Trigger>,
    stopped: Arc<AtomicBool>,
) {
    loop {
        let batch = match rx.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(batch) => batch,
            Err(RecvTimeoutError::Timeout) => {
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if stopped.load(Ordering::SeqCst) {
            break;
        }

        match batch {
            Ok(debounced) => {
                let events: Vec<FileEvent> = debounced
                    .iter()
                    .flat_map(|e| classify(&e.kind, &e.paths))
                    .collect();
                match filter.first_match(&events) {
                    Some(event) => trigger.fire(&event),
                    None => debug!("Ignoring {} unrelated event(s)", events.len()),
                }
            }
            Err(errors) => {
                for e in errors {
                    error!("Watcher reported error: {:?}", e);
                }
            }
        }
    }
    debug!("Watch session thread exiting");
}
