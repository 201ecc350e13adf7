// src/lib.rs

#![doc(html_root_url = "https://docs.rs/docwatch/0.1.0")]
#![doc = r#"
# Docwatch

Docwatch watches a set of documentation source patterns and touches a target file
(by default `README.md`) whenever one of them is added, changed or removed, so that a
site generator's own file watcher picks up a rebuild.

## Modules

- [`config`]: Configuration loading and merging from CLI, host `book.json`, file, and environment.
- [`error`]: Error taxonomy shared by every module.
- [`event`]: Classification of raw notifications into add/change/unlink events.
- [`pattern`]: Glob pattern validation, watch roots and path matching.
- [`trigger`]: The trigger action fired for each change.
- [`watcher`]: The watch session owning the file system watcher.
"#]

pub mod config;
pub mod error;
pub mod event;
pub mod pattern;
pub mod trigger;
pub mod watcher;

pub use config::{Mode, WatchConfig};
pub use error::WatchError;
pub use trigger::{TouchTrigger, Trigger};
pub use watcher::WatchSession;
