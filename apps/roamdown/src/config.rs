//! # Configuration
//!
//! Settings come from three layers, highest first:
//!
//! 1. Command-line flags ([`Overrides`])
//! 2. A TOML file (`--config`, else `roamdown.toml` in the working directory)
//! 3. Built-in defaults
//!
//! ```toml
//! input = "export.edn"
//! publish_tag = "publish"
//! output_dir = "output"
//! fail_fast = false
//! ```

use roamdown_core::RoamError;
use roamdown_core::primitives::DEFAULT_PUBLISH_TAG;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "roamdown.toml";

/// Default directory for written posts.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Maximum config file size (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

// =============================================================================
// SETTINGS
// =============================================================================

/// Effective settings of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Snapshot export to read.
    pub input: Option<PathBuf>,
    /// Tag (page title) selecting posts.
    pub publish_tag: String,
    /// Existing directory receiving `post_<uid>.md` files.
    pub output_dir: PathBuf,
    /// Abort on the first failing post instead of skipping it.
    pub fail_fast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: None,
            publish_tag: DEFAULT_PUBLISH_TAG.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            fail_fast: false,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, RoamError> {
        toml::from_str(text).map_err(|e| RoamError::ConfigError(e.to_string()))
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RoamError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            RoamError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(RoamError::ConfigError(format!(
                "Config file '{}' exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            RoamError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
            .map_err(|e| RoamError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Resolve the config file layer.
    ///
    /// An explicit path must exist. Without one, `roamdown.toml` in `dir` is
    /// used when present, otherwise the defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, RoamError> {
        if let Some(path) = explicit {
            tracing::debug!("Loading config from {}", path.display());
            return Self::load(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!("Loading config from {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line flags on top of these settings.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(input) = overrides.input {
            self.input = Some(input);
        }
        if let Some(tag) = overrides.publish_tag {
            self.publish_tag = tag;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        self.fail_fast |= overrides.fail_fast;
        self
    }

    /// The input path, which has no default.
    pub fn input(&self) -> Result<&Path, RoamError> {
        self.input.as_deref().ok_or_else(|| {
            RoamError::ConfigError(
                "No input snapshot: pass --input or set `input` in the config file".to_string(),
            )
        })
    }
}

/// Values given on the command line. `None`/`false` leaves a setting as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub publish_tag: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub fail_fast: bool,
}

// =============================================================================
// TESTS
// =============================================================================
