//! # Environment Configuration Tests
//!
//! Kept in their own test binary: they mutate `DOCWATCH_*` process environment
//! variables, which would race with the config tests in `integration_tests.rs`.

use clap::Parser;
use docwatch::config::{split_pattern_list, AppConfig, CliArgs};
use std::fs;
use std::sync::Mutex;

/// Serializes the tests below; they share the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets `vars` for the duration of `f`, removing them afterwards.
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    for (k, v) in vars {
        std::env::set_var(k, v);
    }
    let out = f();
    for (k, _) in vars {
        std::env::remove_var(k);
    }
    out
}

fn load_in(dir: &std::path::Path) -> AppConfig {
    AppConfig::from_cli(CliArgs::parse_from([
        "docwatch",
        "--cwd",
        dir.to_str().unwrap(),
    ]))
    .expect("config should load")
}

#[test]
fn test_env_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("docwatch.toml"),
        "[docwatch]\nfiles = [\"from-toml/*.md\"]\ntarget = \"FROM_TOML.md\"\n",
    )
    .unwrap();

    let cfg = with_env(&[("DOCWATCH_TARGET", "FROM_ENV.md")], || load_in(dir.path()));
    assert_eq!(cfg.watch.target_file, dir.path().join("FROM_ENV.md"));
    // Keys the environment leaves alone still come from the file.
    assert_eq!(cfg.watch.files, vec!["from-toml/*.md"]);

    let cfg = load_in(dir.path());
    assert_eq!(cfg.watch.target_file, dir.path().join("FROM_TOML.md"));
}

#[test]
fn test_env_files_accepts_plain_and_comma_separated_strings() {
    let dir = tempfile::tempdir().unwrap();

    let single = with_env(&[("DOCWATCH_FILES", "docs/*.md")], || load_in(dir.path()));
    assert_eq!(single.watch.files, vec!["docs/*.md"]);

    let list = with_env(
        &[("DOCWATCH_FILES", "docs/*.md, SUMMARY.md,book/{intro,guide}.md")],
        || load_in(dir.path()),
    );
    assert_eq!(
        list.watch.files,
        vec!["docs/*.md", "SUMMARY.md", "book/{intro,guide}.md"]
    );

    let array = with_env(&[("DOCWATCH_FILES", r#"["a.md", "b.md"]"#)], || load_in(dir.path()));
    assert_eq!(array.watch.files, vec!["a.md", "b.md"]);
}

#[test]
fn test_split_pattern_list_keeps_brace_groups() {
    assert_eq!(
        split_pattern_list(" {a,b}/*.md ,, c.md "),
        vec!["{a,b}/*.md", "c.md"]
    );
    assert!(split_pattern_list("").is_empty());
}
