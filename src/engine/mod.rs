//! Engine interface
//!
//! The worker consumes the geospatial engine through this trait so the run
//! sequence can be exercised against a mock. Engine failures surface as
//! `EngineError` values; the worker owns no recovery or retry. The real
//! implementation lives in [`GrassEngine`].

mod grass;

pub use grass::GrassEngine;

use std::fmt;
use std::io;

use crate::session::{SessionEnv, SessionInfo};

/// The engine operations a worker performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Session introspection
    SessionInfo,
    /// Mapset create/switch
    SwitchMapset,
    /// Region (extent) selection
    SetRegion,
    /// Generic command execution
    Execute,
    /// Raster existence lookup
    RasterExists,
}

impl Operation {
    /// Stable lowercase name, used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SessionInfo => "session_info",
            Operation::SwitchMapset => "switch_mapset",
            Operation::SetRegion => "set_region",
            Operation::Execute => "execute",
            Operation::RasterExists => "raster_exists",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A generic engine command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Tool name or path
    pub tool: String,

    /// `key=value` and flag arguments, in order
    pub args: Vec<String>,

    /// Suppress routine progress output
    pub quiet: bool,
}

impl Invocation {
    /// Start an invocation of `tool`
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: Vec::new(),
            quiet: false,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Suppress routine progress output
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// Errors raised by engine calls
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to run {tool}: {source}")]
    Spawn { tool: String, source: io::Error },

    #[error("{tool} exited with status {code}: {stderr}")]
    Failed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("session variable {0} missing from engine output")]
    MissingVariable(String),

    #[error("session-state file path ({0}) is not set in the environment")]
    NoStateFile(&'static str),
}

/// Abstract engine capability set consumed by the worker.
///
/// `session_info` reads the ambient session identity once; every other call
/// takes the explicit [`SessionEnv`] it must run under.
pub trait Engine {
    /// Read the current session identity
    fn session_info(&self) -> Result<SessionInfo, EngineError>;

    /// Switch into `mapset`, creating it first when `create_if_missing`
    fn switch_mapset(
        &self,
        env: &SessionEnv,
        mapset: &str,
        create_if_missing: bool,
    ) -> Result<(), EngineError>;

    /// Apply the saved region named `region`
    fn set_region(&self, env: &SessionEnv, region: &str) -> Result<(), EngineError>;

    /// Run a generic engine command
    fn execute(&self, env: &SessionEnv, invocation: &Invocation) -> Result<(), EngineError>;

    /// Whether a raster named `raster` exists in `mapset`
    fn raster_exists(
        &self,
        env: &SessionEnv,
        raster: &str,
        mapset: &str,
    ) -> Result<bool, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let invocation = Invocation::new("r.mapcalc")
            .arg("expression=out = a + b")
            .quiet();
        assert_eq!(invocation.tool, "r.mapcalc");
        assert_eq!(invocation.args, vec!["expression=out = a + b"]);
        assert!(invocation.quiet);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::SwitchMapset.name(), "switch_mapset");
        assert_eq!(Operation::RasterExists.to_string(), "raster_exists");
    }
}
