// src/event.rs
use notify::event::{EventKind, ModifyKind, RenameMode};
use std::fmt;
use std::path::PathBuf;

/// The kind of change observed on a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A file appeared.
    Add,
    /// A file's contents or metadata changed.
    Change,
    /// A file was removed.
    Unlink,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Add => "add",
            ChangeKind::Change => "change",
            ChangeKind::Unlink => "unlink",
        };
        f.write_str(s)
    }
}

/// A single file change delivered to the trigger logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The path of the file affected by the event.
    pub path: PathBuf,
    /// What happened to it.
    pub kind: ChangeKind,
}

/// Converts a raw notification into zero or more file events.
///
/// Renames are split into an unlink of the old path and an add of the new one.
/// Access and other metadata-free notifications produce nothing.
pub fn classify(kind: &EventKind, paths: &[PathBuf]) -> Vec<FileEvent> {
    let Some(first) = paths.first() else {
        return Vec::new();
    };

    let single = |kind: ChangeKind| {
        vec![FileEvent {
            path: first.clone(),
            kind,
        }]
    };

    match kind {
        EventKind::Create(_) => single(ChangeKind::Add),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => single(ChangeKind::Add),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => single(ChangeKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = single(ChangeKind::Unlink);
            if let Some(to) = paths.get(1) {
                events.push(FileEvent {
                    path: to.clone(),
                    kind: ChangeKind::Add,
                });
            }
            events
        }
        EventKind::Modify(_) => single(ChangeKind::Change),
        EventKind::Remove(_) => single(ChangeKind::Unlink),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};

    #[test]
    fn create_write_remove_map_to_add_change_unlink() {
        let p = vec![PathBuf::from("docs/a.md")];
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File), &p)[0].kind,
            ChangeKind::Add
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content)), &p)[0].kind,
            ChangeKind::Change
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File), &p)[0].kind,
            ChangeKind::Unlink
        );
    }

    #[test]
    fn rename_both_splits_into_unlink_and_add() {
        let p = vec![PathBuf::from("old.md"), PathBuf::from("new.md")];
        let events = classify(&EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &p);
        assert_eq!(
            events,
            vec![
                FileEvent {
                    path: PathBuf::from("old.md"),
                    kind: ChangeKind::Unlink
                },
                FileEvent {
                    path: PathBuf::from("new.md"),
                    kind: ChangeKind::Add
                },
            ]
        );
    }

    #[test]
    fn access_and_empty_paths_are_ignored() {
        let p = vec![PathBuf::from("a.md")];
        assert!(classify(&EventKind::Access(AccessKind::Any), &p).is_empty());
        assert!(classify(&EventKind::Create(CreateKind::File), &[]).is_empty());
    }
}
