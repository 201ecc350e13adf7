// src/pattern.rs
//! Watch pattern handling.
//!
//! Patterns are globs relative to the session's working directory, e.g. `docs/*.md` or
//! `src/**/*.rs`. `*` and `?` never cross a path separator; `**` matches any depth;
//! `{a,b}` expands to one alternative per branch. Absolute patterns are matched
//! against absolute event paths. Relative patterns cannot leave the working directory.

use crate::error::WatchError;
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Upper bound on the alternatives a single braced pattern may expand to.
const MAX_EXPANSIONS: usize = 256;

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Expands `{a,b}` alternation, including nested and repeated groups.
fn expand_braces(pattern: &str) -> Result<Vec<String>, String> {
    let Some(open) = pattern.find('{') else {
        if pattern.contains('}') {
            return Err("unmatched '}'".to_string());
        }
        return Ok(vec![pattern.to_string()]);
    };
    if pattern[..open].contains('}') {
        return Err("unmatched '}'".to_string());
    }

    let mut depth = 0usize;
    let mut close = None;
    let mut bounds = vec![open];
    for (offset, c) in pattern[open..].char_indices() {
        let i = open + offset;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => bounds.push(i),
            _ => {}
        }
    }
    let close = close.ok_or("unmatched '{'")?;
    bounds.push(close);

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut out: Vec<String> = Vec::new();
    for window in bounds.windows(2) {
        let branch = &pattern[window[0] + 1..window[1]];
        for expanded in expand_braces(&format!("{prefix}{branch}{suffix}"))? {
            if !out.contains(&expanded) {
                out.push(expanded);
            }
            if out.len() > MAX_EXPANSIONS {
                return Err(format!("expands to more than {MAX_EXPANSIONS} alternatives"));
            }
        }
    }
    Ok(out)
}

/// One brace-free alternative of a pattern.
#[derive(Debug, Clone)]
struct Alternative {
    glob: Pattern,
    absolute: bool,
}

impl Alternative {
    fn root(&self, cwd: &Path) -> Option<PathBuf> {
        let literal = Path::new(self.glob.as_str());
        let mut root = if self.absolute {
            PathBuf::new()
        } else {
            cwd.to_path_buf()
        };

        let components: Vec<Component<'_>> = literal.components().collect();
        let last = components.len().saturating_sub(1);
        for (i, component) in components.iter().enumerate() {
            let text = component.as_os_str().to_string_lossy();
            if i == last || has_glob_meta(&text) {
                break;
            }
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    root.pop();
                }
                _ => root.push(component.as_os_str()),
            }
        }

        while !root.is_dir() {
            if (!self.absolute && root == cwd) || !root.pop() {
                break;
            }
        }

        // A recursive watch on the file system root would walk every mounted disk.
        if self.absolute && root.parent().is_none() {
            return None;
        }
        Some(root)
    }

    fn matches(&self, cwd: &Path, path: &Path) -> bool {
        if self.absolute {
            return self.glob.matches_path_with(path, MATCH_OPTIONS);
        }
        match path.strip_prefix(cwd) {
            Ok(relative) => self.glob.matches_path_with(relative, MATCH_OPTIONS),
            Err(_) => false,
        }
    }
}

/// A single validated watch pattern.
#[derive(Debug, Clone)]
pub struct WatchPattern {
    raw: String,
    alternatives: Vec<Alternative>,
}

impl WatchPattern {
    /// Parses a pattern, rejecting empty strings, malformed globs, unbalanced braces
    /// and relative patterns that climb out of the working directory.
    pub fn parse(raw: &str) -> Result<Self, WatchError> {
        let invalid = |reason: String| WatchError::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("pattern is empty".to_string()));
        }

        let mut alternatives = Vec::new();
        for expanded in expand_braces(trimmed).map_err(invalid)? {
            let normalized = expanded.strip_prefix("./").unwrap_or(&expanded);
            let absolute = Path::new(normalized).is_absolute();
            if !absolute
                && Path::new(normalized)
                    .components()
                    .any(|c| c == Component::ParentDir)
            {
                return Err(invalid(
                    "relative patterns cannot leave the working directory; use an absolute pattern"
                        .to_string(),
                ));
            }
            let glob = Pattern::new(normalized).map_err(|e| invalid(e.to_string()))?;
            alternatives.push(Alternative { glob, absolute });
        }

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// The deepest directories that are known not to depend on a wildcard.
    ///
    /// Falls back to the nearest existing ancestor when such a directory does not exist
    /// yet, never climbing above `cwd` for relative patterns. An absolute pattern whose
    /// nearest existing ancestor is the file system root is rejected.
    pub fn watch_roots(&self, cwd: &Path) -> Result<Vec<PathBuf>, WatchError> {
        self.alternatives
            .iter()
            .map(|alt| {
                alt.root(cwd).ok_or_else(|| WatchError::InvalidPattern {
                    pattern: self.raw.clone(),
                    reason: "no existing directory below the file system root to watch"
                        .to_string(),
                })
            })
            .collect()
    }

    /// Whether `path` (absolute) matches this pattern for a session rooted at `cwd`.
    pub fn matches(&self, cwd: &Path, path: &Path) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(cwd, path))
    }
}

/// The ordered set of patterns a session watches.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<WatchPattern>,
}

impl PatternSet {
    /// Validates every pattern; the first invalid one aborts with `InvalidPattern`.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, WatchError> {
        let patterns = raw
            .iter()
            .map(|p| WatchPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, cwd: &Path, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches(cwd, path))
    }

    /// Watch roots for all patterns with nested roots folded into their ancestors.
    pub fn watch_roots(&self, cwd: &Path) -> Result<Vec<PathBuf>, WatchError> {
        let mut roots: Vec<PathBuf> = Vec::new();
        for pattern in &self.patterns {
            roots.extend(pattern.watch_roots(cwd)?);
        }
        roots.sort();
        roots.dedup();

        let mut folded: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            if !folded.iter().any(|kept| root.starts_with(kept)) {
                folded.push(root);
            }
        }
        Ok(folded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_malformed_patterns() {
        for bad in ["  ", "docs/[.md", "docs/{a,b.md", "docs/a}.md", "../outside/*.md"] {
            assert!(
                matches!(WatchPattern::parse(bad), Err(WatchError::InvalidPattern { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let cwd = Path::new("/project");
        let p = WatchPattern::parse("docs/*.md").unwrap();
        assert!(p.matches(cwd, Path::new("/project/docs/new.md")));
        assert!(!p.matches(cwd, Path::new("/project/docs/sub/new.md")));
        assert!(!p.matches(cwd, Path::new("/project/docs/new.txt")));
        assert!(!p.matches(cwd, Path::new("/elsewhere/docs/new.md")));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let cwd = Path::new("/project");
        let p = WatchPattern::parse("./src/**/*.rs").unwrap();
        assert!(p.matches(cwd, Path::new("/project/src/lib.rs")));
        assert!(p.matches(cwd, Path::new("/project/src/a/b/c.rs")));
    }

    #[test]
    fn braces_expand_to_alternatives() {
        let cwd = Path::new("/p");
        let p = WatchPattern::parse("docs/{intro,guide}.md").unwrap();
        assert!(p.matches(cwd, Path::new("/p/docs/intro.md")));
        assert!(p.matches(cwd, Path::new("/p/docs/guide.md")));
        assert!(!p.matches(cwd, Path::new("/p/docs/other.md")));

        let nested = WatchPattern::parse("{docs,book/{en,fr}}/*.{md,txt}").unwrap();
        assert!(nested.matches(cwd, Path::new("/p/book/fr/a.txt")));
        assert!(nested.matches(cwd, Path::new("/p/docs/a.md")));
        assert!(!nested.matches(cwd, Path::new("/p/book/de/a.md")));
    }

    #[test]
    fn brace_expansion_output() {
        assert_eq!(
            expand_braces("a/{b,c{d,e}}/f").unwrap(),
            vec!["a/b/f", "a/cd/f", "a/ce/f"]
        );
        assert_eq!(expand_braces("plain/*.md").unwrap(), vec!["plain/*.md"]);
    }

    #[test]
    fn watch_root_stops_at_first_wildcard_and_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path();
        std::fs::create_dir_all(cwd.join("docs/guide")).unwrap();

        let p = WatchPattern::parse("docs/guide/*.md").unwrap();
        assert_eq!(p.watch_roots(cwd).unwrap(), vec![cwd.join("docs/guide")]);

        let missing = WatchPattern::parse("missing/deeper/*.md").unwrap();
        assert_eq!(missing.watch_roots(cwd).unwrap(), vec![cwd.to_path_buf()]);

        let literal = WatchPattern::parse("SUMMARY.md").unwrap();
        assert_eq!(literal.watch_roots(cwd).unwrap(), vec![cwd.to_path_buf()]);
    }

    #[test]
    fn absolute_pattern_never_watches_filesystem_root() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path();

        let nowhere = WatchPattern::parse("/docwatch-nonexistent/a/*.md").unwrap();
        assert!(matches!(
            nowhere.watch_roots(cwd),
            Err(WatchError::InvalidPattern { .. })
        ));

        let inside = format!("{}/missing/*.md", cwd.display());
        let p = WatchPattern::parse(&inside).unwrap();
        assert_eq!(p.watch_roots(cwd).unwrap(), vec![cwd.to_path_buf()]);
    }

    #[test]
    fn nested_roots_are_folded() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path();
        std::fs::create_dir_all(cwd.join("docs/guide")).unwrap();

        let set = PatternSet::parse(&["docs/guide/*.md", "docs/*.md", "docs/*.txt"]).unwrap();
        assert_eq!(set.watch_roots(cwd).unwrap(), vec![cwd.join("docs")]);
    }
}
