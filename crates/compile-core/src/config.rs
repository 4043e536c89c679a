//! Session configuration, loadable from YAML.
//!
//! ```yaml
//! first_column: 0
//! skip_threshold: error
//! search_path: [~, /usr/include]
//! rules: [gnu, rust]
//! file_transforms:
//!   - pattern: "^/build/"
//!     replacement: "/src/"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::columns::DEFAULT_TAB_WIDTH;
use crate::directory::DirectoryTracker;
use crate::error::ConfigError;
use crate::location::LocationCache;
use crate::matcher::FileTransform;
use crate::message::Severity;
use crate::navigator::NavigationConfig;
use crate::rules::RuleSet;
use crate::source_buffers::SourceBuffers;

/// A file-name rewrite as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTransformSpec {
    /// Regular expression matched against the file name.
    pub pattern: String,
    /// Replacement (`$1` syntax); absent means matches naming such files are dropped.
    #[serde(default)]
    pub replacement: Option<String>,
}

/// Settings of one compilation session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilationConfig {
    /// Column the tool numbers first (0 or 1).
    pub first_column: usize,
    /// Columns count display cells rather than chars.
    pub screen_columns: bool,
    /// Tab stop width for screen columns.
    pub tab_width: usize,
    /// Navigation skips messages below this severity.
    pub skip_threshold: Severity,
    /// Navigation skips already visited locations.
    pub skip_visited: bool,
    /// Directories searched for relative file names; `~` is the working directory.
    pub search_path: Vec<Option<PathBuf>>,
    /// Base of relative paths; the process working directory when unset.
    pub working_directory: Option<PathBuf>,
    /// Custom directory-change pattern with `dir` and optional `leave` groups.
    pub directory_pattern: Option<String>,
    /// Builtin rules to enable, in priority order; all when unset.
    pub rules: Option<Vec<String>>,
    /// Rewrites applied to matched file names.
    pub file_transforms: Vec<FileTransformSpec>,
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self {
            first_column: 1,
            screen_columns: true,
            tab_width: DEFAULT_TAB_WIDTH,
            skip_threshold: Severity::Warning,
            skip_visited: false,
            search_path: vec![None],
            working_directory: None,
            directory_pattern: None,
            rules: None,
            file_transforms: Vec::new(),
        }
    }
}

impl CompilationConfig {
    /// Parse a YAML document; missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// The configured working directory, else the process one, else `.`.
    pub fn resolved_working_directory(&self) -> PathBuf {
        self.working_directory
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The builtin catalog, restricted to [`CompilationConfig::rules`] when set.
    pub fn rule_set(&self) -> Result<RuleSet, ConfigError> {
        let builtin = RuleSet::builtin()?;
        Ok(match &self.rules {
            Some(names) => builtin.only(names)?,
            None => builtin,
        })
    }

    /// A directory tracker for the configured pattern.
    pub fn directory_tracker(&self) -> Result<DirectoryTracker, ConfigError> {
        match &self.directory_pattern {
            Some(pattern) => DirectoryTracker::with_pattern(pattern),
            None => Ok(DirectoryTracker::new()),
        }
    }

    /// The compiled file-name transforms.
    pub fn file_transforms(&self) -> Result<Vec<FileTransform>, ConfigError> {
        self.file_transforms
            .iter()
            .map(|spec| FileTransform::new(&spec.pattern, spec.replacement.clone()))
            .collect()
    }

    /// Navigation settings.
    pub fn navigation(&self) -> NavigationConfig {
        NavigationConfig {
            skip_threshold: self.skip_threshold,
            skip_visited: self.skip_visited,
            screen_columns: self.screen_columns,
        }
    }

    /// An empty location cache for the configured directories.
    pub fn location_cache(&self) -> LocationCache {
        LocationCache::new(self.resolved_working_directory())
            .with_search_path(self.search_path.clone())
    }

    /// In-memory source buffers using the configured tab width.
    pub fn source_buffers(&self) -> SourceBuffers {
        SourceBuffers::new().with_tab_width(self.tab_width)
    }
}
