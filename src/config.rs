//! Run configuration.
//!
//! Everything the engine consumes arrives through an explicit
//! `SyncConfig`; there is no ambient settings state. The binary merges an
//! optional TOML file with command-line flags, flags winning, then hands
//! the result down.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SyncError;

/// Sequential by default; uploads only parallelize when asked to
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Lower bound for the worker pool
pub const MIN_CONCURRENCY: usize = 1;

/// Upper bound for the worker pool, keeping the task count and open
/// connections within reason
pub const MAX_CONCURRENCY: usize = 64;

/// Which hash strategy drives the copy-or-skip decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Compare against the entity tag from a metadata probe
    Etag,
    /// Compare against a content-md5 field in object metadata
    Metadata,
    /// Digest the mirrored object's bytes directly
    Mirror,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Etag => "etag",
            StrategyKind::Metadata => "metadata",
            StrategyKind::Mirror => "mirror",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "etag" => Ok(StrategyKind::Etag),
            "metadata" => Ok(StrategyKind::Metadata),
            "mirror" => Ok(StrategyKind::Mirror),
            other => Err(SyncError::Configuration {
                message: format!(
                    "unknown strategy '{}' (expected etag, metadata, or mirror)",
                    other
                ),
            }),
        }
    }
}

/// Which lookup cache wraps the strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKind {
    /// No cache; every lookup reaches the backend
    None,
    /// Per-process in-memory table
    Memory,
    /// Plain-text cache file persisted across runs
    File { path: PathBuf },
}

impl FromStr for CacheKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CacheKind::None),
            "memory" => Ok(CacheKind::Memory),
            "" => Err(SyncError::Configuration {
                message: "cache must be 'none', 'memory', or a file path".to_string(),
            }),
            path => Ok(CacheKind::File {
                path: PathBuf::from(path),
            }),
        }
    }
}

/// Options steering one sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub strategy: StrategyKind,
    /// Worker count; values outside [1, 64] clamp
    pub concurrency: usize,
    /// When false, every entry uploads without consulting the strategy
    pub enabled: bool,
    /// Evaluate decisions and report, but transfer nothing
    pub dry_run: bool,
    /// Hash and upload the gzipped form of compressible files
    pub is_gzipped: bool,
    pub cache: CacheKind,
    /// Prepended to every remote key the collector produces
    pub key_prefix: Option<String>,
}

impl SyncConfig {
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            concurrency: DEFAULT_CONCURRENCY,
            enabled: true,
            dry_run: false,
            is_gzipped: false,
            cache: CacheKind::Memory,
            key_prefix: None,
        }
    }

    /// Concurrency with the pool bounds applied
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
    }
}

/// `[sync]` section of the config file; every field optional so flags can
/// fill the gaps
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SyncSection {
    pub strategy: Option<String>,
    pub concurrency: Option<usize>,
    pub enabled: Option<bool>,
    pub gzip: Option<bool>,
    pub cache: Option<String>,
    pub key_prefix: Option<String>,
}

/// `[target]` section describing where uploads land
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TargetSection {
    pub backend: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub credential_file: Option<String>,
    pub mirror_root: Option<PathBuf>,
}

/// Parsed TOML config file
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub target: TargetSection,
}

impl FileConfig {
    /// Read and parse a config file; parse trouble is fatal configuration
    /// trouble
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SyncError::Configuration {
            message: format!("could not read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&contents).map_err(|e| SyncError::Configuration {
            message: format!("could not parse config file {}: {}", path.display(), e),
        })
    }
}
