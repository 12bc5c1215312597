//! Configuration loading and discovery.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Merging with sensible defaults
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.upshift.<ext>` in current directory or any parent
//! - `upshift.<ext>` in current directory or any parent
//! - `~/.config/upshift/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use upshift_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// The configuration for upshift.
///
/// Deserialized from config files found during discovery (TOML, YAML, or JSON).
/// Every field is optional; command-line flags override what is set here.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Create annotated tags instead of lightweight ones.
    pub annotated_tags: bool,
    /// Release commit message. `{tag}` is replaced with the new tag.
    pub commit_message: Option<String>,
    /// Commit types that produce a patch release, on top of `fix`, `perf`
    /// and `security`.
    pub patch_types: Vec<String>,
    /// Environment variables exported to every hook command.
    pub env: BTreeMap<String, String>,
    /// Identity for the release commit.
    pub commit_author: Option<CommitAuthor>,
    /// Files whose embedded version is rewritten on release.
    pub bumps: Vec<BumpFile>,
    /// Changelog rendering.
    pub changelog: ChangelogConfig,
    /// Git behaviour.
    pub git: GitConfig,
    /// Hook commands per workflow stage.
    pub hooks: HooksConfig,
}

/// Name and email used for the release commit.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommitAuthor {
    /// Committer name.
    pub name: String,
    /// Committer email.
    pub email: String,
}

/// A file containing a version that is rewritten on release.
///
/// `pattern` is a regular expression in which the literal `$VERSION` marks
/// where the version sits.
///
/// # Example
///
/// ```toml
/// [[bumps]]
/// file = "Cargo.toml"
/// pattern = 'version = "$VERSION"'
/// count = 1
/// semver = true
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BumpFile {
    /// Path relative to the project root.
    pub file: Utf8PathBuf,
    /// Regex with a `$VERSION` placeholder.
    pub pattern: String,
    /// Replace at most this many matches (all when unset or zero).
    #[serde(default)]
    pub count: Option<usize>,
    /// Write the version without its prefix.
    #[serde(default)]
    pub semver: bool,
}

/// Changelog rendering options.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Entry order: `asc` or `desc` (default).
    pub sort: Option<String>,
    /// Drop commits whose header matches any of these regexes.
    pub exclude: Vec<String>,
    /// Keep only commits whose header matches one of these regexes.
    pub include: Vec<String>,
    /// Render the whole message instead of the header line.
    pub multiline: bool,
    /// Do not write a changelog for prerelease versions.
    pub skip_prerelease: bool,
    /// Classify and render from the conventional header, dropping leading lines.
    pub trim_header: bool,
}

/// Git behaviour.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Allow running on a detached HEAD.
    pub ignore_detached: bool,
    /// Allow running in a shallow clone.
    pub ignore_shallow: bool,
    /// Passed to every push as `--push-option`.
    pub push_options: Vec<String>,
    /// Glob used to list version tags (default `*`).
    pub tag_pattern: Option<String>,
    /// `version` (default) or `date`.
    pub tag_sort: Option<String>,
}

/// Hook commands to run at each workflow stage.
///
/// Each hook is a list of shell commands executed in order. Commands
/// support variable interpolation:
/// - `{current_version}` the version before the run
/// - `{next_version}` the version being released
/// - `{changelog_path}` path to the changelog file
///
/// # Example
///
/// ```toml
/// [hooks]
/// after_bump = ["cargo check", "echo bumped to {next_version}"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HooksConfig {
    /// Commands to run before anything else.
    pub before: Vec<String>,
    /// Commands to run before bumping files.
    pub before_bump: Vec<String>,
    /// Commands to run after bumping files.
    pub after_bump: Vec<String>,
    /// Commands to run before writing the changelog.
    pub before_changelog: Vec<String>,
    /// Commands to run after writing the changelog.
    pub after_changelog: Vec<String>,
    /// Commands to run before creating the tag.
    pub before_tag: Vec<String>,
    /// Commands to run after pushing the tag.
    pub after_tag: Vec<String>,
    /// Commands to run once the workflow is complete.
    pub after: Vec<String>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "upshift";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/upshift/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. Explicit files (in order added via `with_file`)
    /// 2. Project config (closest to search root)
    /// 3. User config (`~/.config/upshift/config.<ext>`)
    /// 4. Default values
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            bumps = config.bumps.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration, returning an error if no config file is found.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        let has_user = self.include_user_config && self.find_user_config().is_some();
        let has_project = self
            .project_search_root
            .as_ref()
            .and_then(|root| self.find_project_config(root))
            .is_some();
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            // The repository root is the last directory searched.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;

        for ext in CONFIG_EXTENSIONS {
            let config_path = config_dir.join(format!("config.{ext}"));
            if config_path.is_file() {
                return Some(config_path);
            }
        }

        None
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Get the project directories for XDG-compliant path resolution.
///
/// Returns `None` if the home directory cannot be determined.
fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/upshift/` on Linux, `~/Library/Application Support/upshift/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user data directory path, where logs go by default.
///
/// Returns `~/.local/share/upshift/` on Linux, `~/Library/Application Support/upshift/`
/// on macOS, and equivalent on other platforms.
pub fn user_data_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_dir().to_path_buf()).ok()
}
