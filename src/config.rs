// src/config.rs
use crate::error::WatchError;
use clap::Parser;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default target touched on every change, relative to the working directory.
pub const DEFAULT_TARGET: &str = "README.md";
/// Default debounce window for raw notifications.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Command-line arguments for the application.
#[derive(Parser, Debug, Deserialize, Default)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Host invocation arguments; the token `serve` selects serve mode
    #[clap(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Host invocation arguments (must come last); the token `serve` selects serve mode"
    )]
    pub args: Vec<String>,

    /// File patterns to watch (e.g., "docs/*.md"); may be repeated
    #[clap(
        short,
        long = "files",
        value_parser,
        help = "File patterns to watch (e.g., \"docs/*.md\"); may be repeated"
    )]
    pub files: Vec<String>,

    /// Working directory the patterns are relative to
    #[clap(long, value_parser, help = "Working directory the patterns are relative to")]
    pub cwd: Option<PathBuf>,

    /// File whose timestamp is updated on change (default: README.md)
    #[clap(
        short,
        long,
        value_parser,
        help = "File whose timestamp is updated on change (default: README.md)"
    )]
    pub target: Option<PathBuf>,

    /// Host book configuration (default: book.json in the working directory)
    #[clap(
        long,
        value_parser,
        help = "Host book configuration (default: book.json in the working directory)"
    )]
    pub book: Option<PathBuf>,

    /// Path to a configuration file (e.g., docwatch.toml)
    #[clap(
        short,
        long,
        value_parser,
        help = "Path to a configuration file (e.g., docwatch.toml)"
    )]
    pub config: Option<PathBuf>,

    /// Debounce window in milliseconds
    #[clap(long, value_parser, help = "Debounce window in milliseconds")]
    pub debounce_ms: Option<u64>,

    /// Log level (e.g., trace, debug, info, warn, error)
    #[clap(
        long,
        value_parser,
        help = "Log level (e.g., trace, debug, info, warn, error)"
    )]
    pub log_level: Option<String>,
}

/// Configuration loaded from file, environment, or defaults.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct FileConfig {
    /// Patterns to watch; a sequence, or one string of comma-separated patterns
    #[serde(default, deserialize_with = "deserialize_patterns")]
    pub files: Option<Vec<String>>,
    /// Target file to touch
    pub target: Option<PathBuf>,
    /// Debounce window in milliseconds
    pub debounce_ms: Option<u64>,
    /// Log level
    pub log_level: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternList {
    One(String),
    Many(Vec<String>),
}

/// Splits `a.md, docs/{x,y}.md` at commas outside brace groups.
pub fn split_pattern_list(list: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                patterns.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    patterns.push(&list[start..]);
    patterns
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn deserialize_patterns<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<PatternList>::deserialize(deserializer)?.map(|list| match list {
            PatternList::One(s) => split_pattern_list(&s),
            PatternList::Many(v) => v,
        }),
    )
}

/// The `pluginsConfig.watch` section of a host `book.json`.
#[derive(Deserialize, Debug, Default)]
struct HostWatchSection {
    #[serde(default)]
    files: Vec<String>,
}

/// Whether the host is serving (live rebuild) or doing a one-off build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    Build,
}

impl Mode {
    /// `Serve` if the literal token `serve` is among the invocation arguments.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if args.into_iter().any(|a| a.as_ref() == "serve") {
            Mode::Serve
        } else {
            Mode::Build
        }
    }
}

/// Everything a watch session needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Glob patterns, relative to `cwd` unless absolute.
    pub files: Vec<String>,
    /// Directory the patterns are resolved against.
    pub cwd: PathBuf,
    /// File whose modification time is bumped on every change.
    pub target_file: PathBuf,
    /// Debounce window for raw notifications.
    pub debounce: Duration,
}

impl WatchConfig {
    /// Stores the patterns for later use. Performs no I/O.
    pub fn configure<S: Into<String>>(files: impl IntoIterator<Item = S>, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let target_file = cwd.join(DEFAULT_TARGET);
        Self {
            files: files.into_iter().map(Into::into).collect(),
            cwd,
            target_file,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }

    /// Overrides the target file; relative paths resolve against `cwd`.
    pub fn with_target(mut self, target: impl AsRef<Path>) -> Self {
        self.target_file = self.cwd.join(target);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Final application configuration after merging all sources.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Mode derived from the host invocation arguments
    pub mode: Mode,
    /// Session configuration
    pub watch: WatchConfig,
    /// Log level
    pub log_level: String,
}

/// Reads `pluginsConfig.watch.files` from a host `book.json`, if the file exists.
fn load_host_files(book: &Path) -> Result<Option<Vec<String>>, figment::Error> {
    if !book.is_file() {
        return Ok(None);
    }
    let fig = Figment::from(Json::file(book));
    if !fig.contains("pluginsConfig.watch") {
        return Ok(None);
    }
    let section: HostWatchSection = fig.extract_inner("pluginsConfig.watch")?;
    Ok(Some(section.files))
}

impl AppConfig {
    /// Loads the application configuration from the process arguments.
    pub fn load() -> Result<Self, WatchError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Merges defaults, host `book.json`, config file, environment and CLI (highest wins).
    pub fn from_cli(cli_args: CliArgs) -> Result<Self, WatchError> {
        let cwd = match cli_args.cwd.clone() {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|source| WatchError::InvalidCwd {
                path: PathBuf::from("."),
                source,
            })?,
        };

        let config_file_path = cli_args
            .config
            .clone()
            .unwrap_or_else(|| cwd.join("docwatch.toml"));
        let book_path = cli_args
            .book
            .clone()
            .map(|b| cwd.join(b))
            .unwrap_or_else(|| cwd.join("book.json"));

        // Default log level from environment variable DOCWATCH_LOG_LEVEL, then "info"
        let default_log_level =
            std::env::var("DOCWATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let host_files = load_host_files(&book_path)?;
        if host_files.is_some() {
            tracing::debug!("Read watch patterns from {}", book_path.display());
        }

        let fig = Figment::new()
            .merge(Serialized::defaults(FileConfig {
                files: Some(host_files.unwrap_or_default()),
                target: Some(PathBuf::from(DEFAULT_TARGET)),
                debounce_ms: Some(DEFAULT_DEBOUNCE_MS),
                log_level: Some(default_log_level.clone()),
            }))
            .merge(Toml::file(config_file_path).nested())
            // Global so env beats the selected `[docwatch]` profile of the toml file.
            .merge(
                Env::prefixed("DOCWATCH_")
                    .map(|key| key.as_str().replace("__", ".").into())
                    .global(),
            );

        let mut merged_config: FileConfig = fig.select("docwatch").extract()?;

        // CLI always wins when specified.
        if !cli_args.files.is_empty() {
            merged_config.files = Some(cli_args.files);
        }
        if let Some(target) = cli_args.target {
            merged_config.target = Some(target);
        }
        if let Some(ms) = cli_args.debounce_ms {
            merged_config.debounce_ms = Some(ms);
        }
        if let Some(level) = cli_args.log_level {
            merged_config.log_level = Some(level);
        }

        let watch = WatchConfig::configure(merged_config.files.unwrap_or_default(), cwd)
            .with_target(
                merged_config
                    .target
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET)),
            )
            .with_debounce(Duration::from_millis(
                merged_config.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
            ));

        Ok(AppConfig {
            mode: Mode::from_args(&cli_args.args),
            watch,
            log_level: merged_config.log_level.unwrap_or(default_log_level),
        })
    }
}
