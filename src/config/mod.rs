//! Worker configuration
//!
//! Three-layer merge in precedence order: built-in defaults, optional TOML
//! file, CLI flags. The file may repoint the engine tools for nonstandard
//! installs and change the raster compressor; the remaining tuning values
//! are fixed for worker runs.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable enabling null-value compression
pub const COMPRESS_NULLS_VAR: &str = "GRASS_COMPRESS_NULLS";

/// Environment variable selecting the raster compressor
pub const COMPRESSOR_VAR: &str = "GRASS_COMPRESSOR";

/// Environment variable selecting the engine message format
pub const MESSAGE_FORMAT_VAR: &str = "GRASS_MESSAGE_FORMAT";

/// Compressors the engine accepts
pub const COMPRESSORS: &[&str] = &["ZLIB", "LZ4", "ZSTD", "BZIP2"];

/// Error types for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown compressor '{0}' (expected one of ZLIB, LZ4, ZSTD, BZIP2)")]
    UnknownCompressor(String),

    #[error("tool name for '{0}' is empty")]
    EmptyToolName(&'static str),
}

/// Engine tool names, overridable for nonstandard installs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSet {
    /// Session introspection tool
    pub gisenv: String,
    /// Mapset create/switch tool
    pub mapset: String,
    /// Region (extent) tool
    pub region: String,
    /// Map-algebra tool
    pub mapcalc: String,
    /// Dataset lookup tool
    pub findfile: String,
}

impl Default for ToolSet {
    fn default() -> Self {
        Self {
            gisenv: "g.gisenv".to_string(),
            mapset: "g.mapset".to_string(),
            region: "g.region".to_string(),
            mapcalc: "r.mapcalc".to_string(),
            findfile: "g.findfile".to_string(),
        }
    }
}

impl ToolSet {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("gisenv", &self.gisenv),
            ("mapset", &self.mapset),
            ("region", &self.region),
            ("mapcalc", &self.mapcalc),
            ("findfile", &self.findfile),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyToolName(name));
            }
        }
        Ok(())
    }
}

/// Per-tool overrides from the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolOverrides {
    pub gisenv: Option<String>,
    pub mapset: Option<String>,
    pub region: Option<String>,
    pub mapcalc: Option<String>,
    pub findfile: Option<String>,
}

/// Optional TOML overrides (layer 2)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Raster compressor override
    pub compressor: Option<String>,

    /// Engine tool overrides
    pub tools: ToolOverrides,
}

impl FileConfig {
    /// Load and parse overrides from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parse overrides from a TOML string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

/// Effective worker configuration after the merge
#[derive(Debug, Clone, Serialize)]
pub struct WorkerConfig {
    /// Raster compressor handed to the engine
    pub compressor: String,

    /// Compress null cells in engine output
    pub compress_nulls: bool,

    /// Engine message format; workers run non-interactive
    pub message_format: String,

    /// Engine tool names
    pub tools: ToolSet,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            compressor: "LZ4".to_string(),
            compress_nulls: true,
            message_format: "plain".to_string(),
            tools: ToolSet::default(),
        }
    }
}

impl WorkerConfig {
    /// Build the effective configuration: defaults, then the optional file,
    /// then CLI flags
    pub fn load(
        file: Option<&Path>,
        cli_compressor: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = WorkerConfig::default();
        if let Some(path) = file {
            config.apply_file(FileConfig::from_file(path)?);
        }
        if let Some(compressor) = cli_compressor {
            config.compressor = compressor.to_uppercase();
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply file-level overrides (layer 2)
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(compressor) = file.compressor {
            self.compressor = compressor.to_uppercase();
        }
        let overrides = file.tools;
        if let Some(gisenv) = overrides.gisenv {
            self.tools.gisenv = gisenv;
        }
        if let Some(mapset) = overrides.mapset {
            self.tools.mapset = mapset;
        }
        if let Some(region) = overrides.region {
            self.tools.region = region;
        }
        if let Some(mapcalc) = overrides.mapcalc {
            self.tools.mapcalc = mapcalc;
        }
        if let Some(findfile) = overrides.findfile {
            self.tools.findfile = findfile;
        }
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !COMPRESSORS.contains(&self.compressor.as_str()) {
            return Err(ConfigError::UnknownCompressor(self.compressor.clone()));
        }
        self.tools.validate()
    }

    /// Tuning variables applied to every engine child process
    pub fn tuning(&self) -> Vec<(String, String)> {
        vec![
            (
                COMPRESS_NULLS_VAR.to_string(),
                if self.compress_nulls { "1" } else { "0" }.to_string(),
            ),
            (COMPRESSOR_VAR.to_string(), self.compressor.clone()),
            (MESSAGE_FORMAT_VAR.to_string(), self.message_format.clone()),
        ]
    }
}
