//! Tool configuration
//!
//! Where the Velvet binaries live, what the installed build supports, and
//! how long each phase may run. Loaded from JSON or built from defaults.

use crate::constants::{
    DEFAULT_CATEGORIES, DEFAULT_MAX_KMER_LENGTH, DEFAULT_STDERR_TAIL_LINES, VELVETG_BINARY,
    VELVETH_BINARY,
};
use crate::error::{Phase, Result, VelvetError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for running the Velvet binaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Path or name of the velveth binary
    pub velveth_binary: PathBuf,

    /// Path or name of the velvetg binary
    pub velvetg_binary: PathBuf,

    /// Working directory of both phases; relative folders resolve against it
    pub scratch_dir: PathBuf,

    /// `MAXKMERLENGTH` of the installed build
    pub max_kmer_length: u32,

    /// `CATEGORIES` of the installed build: channels allowed per read family
    pub categories: usize,

    /// Budget for velveth in seconds (None = unbounded)
    pub velveth_timeout_secs: Option<u64>,

    /// Budget for velvetg in seconds (None = unbounded)
    pub velvetg_timeout_secs: Option<u64>,

    /// Lines of stderr kept for failure reports
    pub stderr_tail_lines: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            velveth_binary: PathBuf::from(VELVETH_BINARY),
            velvetg_binary: PathBuf::from(VELVETG_BINARY),
            scratch_dir: PathBuf::from("."),
            max_kmer_length: DEFAULT_MAX_KMER_LENGTH,
            categories: DEFAULT_CATEGORIES,
            velveth_timeout_secs: None,
            velvetg_timeout_secs: None,
            stderr_tail_lines: DEFAULT_STDERR_TAIL_LINES,
        }
    }
}

impl ToolConfig {
    /// Create a configuration rooted at `scratch_dir`
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Result<Self> {
        let config = Self {
            scratch_dir: scratch_dir.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file; absent fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| VelvetError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| VelvetError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_kmer_length < 1 {
            return Err(VelvetError::Config("max_kmer_length must be at least 1".into()));
        }
        if self.categories == 0 {
            return Err(VelvetError::Config("categories must be at least 1".into()));
        }
        if self.velveth_binary.as_os_str().is_empty() || self.velvetg_binary.as_os_str().is_empty() {
            return Err(VelvetError::Config("binary paths must not be empty".into()));
        }
        if self.velveth_timeout_secs == Some(0) || self.velvetg_timeout_secs == Some(0) {
            return Err(VelvetError::Config("timeouts must be positive when set".into()));
        }
        Ok(())
    }

    /// Binary implementing `phase`
    pub fn binary(&self, phase: Phase) -> &Path {
        match phase {
            Phase::Indexing => &self.velveth_binary,
            Phase::GraphConstruction => &self.velvetg_binary,
        }
    }

    /// Time budget for `phase`
    pub fn timeout(&self, phase: Phase) -> Option<Duration> {
        let secs = match phase {
            Phase::Indexing => self.velveth_timeout_secs,
            Phase::GraphConstruction => self.velvetg_timeout_secs,
        };
        secs.map(Duration::from_secs)
    }

    /// Location of a folder named in the parameters
    pub fn resolve(&self, folder: &str) -> PathBuf {
        let path = Path::new(folder);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.scratch_dir.join(path)
        }
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Tool Configuration:");
        tracing::info!("  velveth = {}", self.velveth_binary.display());
        tracing::info!("  velvetg = {}", self.velvetg_binary.display());
        tracing::info!("  scratch_dir = {}", self.scratch_dir.display());
        tracing::debug!("  max_kmer_length = {}", self.max_kmer_length);
        tracing::debug!("  categories = {}", self.categories);
        match self.velveth_timeout_secs {
            Some(secs) => tracing::info!("  velveth timeout = {}s", secs),
            None => tracing::debug!("  velveth timeout = none"),
        }
        match self.velvetg_timeout_secs {
            Some(secs) => tracing::info!("  velvetg timeout = {}s", secs),
            None => tracing::debug!("  velvetg timeout = none"),
        }
        tracing::debug!("  stderr_tail_lines = {}", self.stderr_tail_lines);
    }
}
