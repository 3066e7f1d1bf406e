//! Mock engine implementation
//!
//! Configurable in-process engine for testing the worker run sequence
//! without a GRASS installation. Records every call, serves configured
//! session info and raster lookups, and injects per-operation failures.

mod failure;
mod state;

pub use failure::{FailureConfig, FailureInjector};
pub use state::{EngineCall, MockState};

use std::sync::{Arc, Mutex};

use crate::engine::{Engine, EngineError, Invocation, Operation};
use crate::expression::Expression;
use crate::session::{SessionEnv, SessionInfo};

/// Configurable mock engine for tests.
///
/// Clones share state, so a test can keep a handle for assertions after
/// moving a clone into the worker.
#[derive(Debug, Clone)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
    execute_creates_output: Arc<Mutex<bool>>,
}

impl MockEngine {
    /// Create a mock engine serving `session`
    pub fn new(session: SessionInfo) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new(session))),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
            execute_creates_output: Arc::new(Mutex::new(true)),
        }
    }

    // === Public API for test configuration ===

    /// Record a raster as present in the simulated store
    pub fn add_raster(&self, raster: &str, mapset: &str) {
        let mut state = self.state.lock().unwrap();
        state.add_raster(raster, mapset);
    }

    /// Whether `execute` materializes the output raster of a map-algebra
    /// expression (default: true). Disable to simulate a run whose output
    /// never appears.
    pub fn set_execute_creates_output(&self, creates: bool) {
        *self.execute_creates_output.lock().unwrap() = creates;
    }

    /// Inject a failure for the next calls to an operation
    pub fn inject_failure(&self, op: Operation, config: FailureConfig) {
        let mut failures = self.failures.lock().unwrap();
        failures.inject(op, config);
    }

    /// Inject an always-failing error with the given diagnostic
    pub fn inject_error(&self, op: Operation, message: &str) {
        self.inject_failure(op, FailureConfig::error(message));
    }

    /// Clear all failure injections
    pub fn clear_failures(&self) {
        let mut failures = self.failures.lock().unwrap();
        failures.clear();
    }

    /// Snapshot of the recorded calls, in order
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Whether a raster is present in the simulated store
    pub fn has_raster(&self, raster: &str, mapset: &str) -> bool {
        self.state.lock().unwrap().has_raster(raster, mapset)
    }

    // === Internal helpers ===

    fn check_failure(&self, op: Operation) -> Result<(), EngineError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.check(op) {
            Some(config) => Err(EngineError::Failed {
                tool: op.name().to_string(),
                code: config.code,
                stderr: config.message,
            }),
            None => Ok(()),
        }
    }

    /// Derive the output raster of a mapcalc-style `expression=` argument
    fn expression_output(args: &[String]) -> Option<String> {
        let raw = args
            .iter()
            .find_map(|arg| arg.strip_prefix("expression="))?;
        Expression::new(raw)
            .ok()
            .map(|expr| expr.output_name().to_string())
    }
}

impl Engine for MockEngine {
    fn session_info(&self) -> Result<SessionInfo, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::SessionInfo);
        drop(state);
        self.check_failure(Operation::SessionInfo)?;
        Ok(self.state.lock().unwrap().session.clone())
    }

    fn switch_mapset(
        &self,
        env: &SessionEnv,
        mapset: &str,
        create_if_missing: bool,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::SwitchMapset {
            state_file: env.state_file().to_path_buf(),
            mapset: mapset.to_string(),
            create_if_missing,
        });
        state.current_mapset = Some(mapset.to_string());
        drop(state);
        self.check_failure(Operation::SwitchMapset)
    }

    fn set_region(&self, env: &SessionEnv, region: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::SetRegion {
            state_file: env.state_file().to_path_buf(),
            region: region.to_string(),
        });
        drop(state);
        self.check_failure(Operation::SetRegion)
    }

    fn execute(&self, env: &SessionEnv, invocation: &Invocation) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::Execute {
            state_file: env.state_file().to_path_buf(),
            tool: invocation.tool.clone(),
            args: invocation.args.clone(),
            quiet: invocation.quiet,
        });
        drop(state);
        self.check_failure(Operation::Execute)?;

        if *self.execute_creates_output.lock().unwrap() {
            if let Some(output) = Self::expression_output(&invocation.args) {
                let mut state = self.state.lock().unwrap();
                if let Some(mapset) = state.current_mapset.clone() {
                    state.add_raster(&output, &mapset);
                }
            }
        }
        Ok(())
    }

    fn raster_exists(
        &self,
        env: &SessionEnv,
        raster: &str,
        mapset: &str,
    ) -> Result<bool, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(EngineCall::RasterExists {
            state_file: env.state_file().to_path_buf(),
            raster: raster.to_string(),
            mapset: mapset.to_string(),
        });
        let exists = state.has_raster(raster, mapset);
        drop(state);
        self.check_failure(Operation::RasterExists)?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn session_fixture() -> SessionInfo {
        SessionInfo {
            gisdbase: PathBuf::from("/data/grassdata"),
            location: "nc_spm".to_string(),
            state_file: PathBuf::from("/tmp/rc"),
        }
    }

    fn env_fixture() -> SessionEnv {
        SessionEnv::new("/tmp/rc", Vec::new())
    }

    #[test]
    fn test_session_info_served() {
        let engine = MockEngine::new(session_fixture());
        let info = engine.session_info().unwrap();
        assert_eq!(info.location, "nc_spm");
        assert_eq!(engine.calls(), vec![EngineCall::SessionInfo]);
    }

    #[test]
    fn test_execute_materializes_expression_output() {
        let engine = MockEngine::new(session_fixture());
        let env = env_fixture();

        engine.switch_mapset(&env, "tile_01", true).unwrap();
        let invocation = Invocation::new("r.mapcalc")
            .arg("expression=result = a + b")
            .quiet();
        engine.execute(&env, &invocation).unwrap();

        assert!(engine.has_raster("result", "tile_01"));
        assert!(engine.raster_exists(&env, "result", "tile_01").unwrap());
    }

    #[test]
    fn test_execute_without_output_creation() {
        let engine = MockEngine::new(session_fixture());
        engine.set_execute_creates_output(false);
        let env = env_fixture();

        engine.switch_mapset(&env, "tile_01", true).unwrap();
        let invocation = Invocation::new("r.mapcalc").arg("expression=result = a");
        engine.execute(&env, &invocation).unwrap();

        assert!(!engine.has_raster("result", "tile_01"));
    }

    #[test]
    fn test_injected_failure_surfaces_as_engine_error() {
        let engine = MockEngine::new(session_fixture());
        engine.inject_error(Operation::SetRegion, "region not found");

        let err = engine.set_region(&env_fixture(), "missing").unwrap_err();
        match err {
            EngineError::Failed { tool, code, stderr } => {
                assert_eq!(tool, "set_region");
                assert_eq!(code, 1);
                assert_eq!(stderr, "region not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        engine.clear_failures();
        engine.set_region(&env_fixture(), "missing").unwrap();
    }

    #[test]
    fn test_clones_share_state() {
        let engine = MockEngine::new(session_fixture());
        let clone = engine.clone();

        clone.add_raster("result", "tile_01");
        assert!(engine.has_raster("result", "tile_01"));
    }
}
