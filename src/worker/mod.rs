//! The worker run sequence
//!
//! One invocation means one mapset, one expression, one output check. The
//! steps mirror the orchestrator contract: reset the target mapset, take a
//! pid-keyed private copy of the session-state file, switch into the mapset
//! with create-if-missing, apply the saved region, run the expression,
//! verify the output raster, then release the private state.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::WorkerConfig;
use crate::engine::{Engine, EngineError, Invocation};
use crate::expression::Expression;
use crate::session::{self, PrivateStateFile, SessionEnv, SessionError};

/// Errors terminating a worker run
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// An engine call failed; the engine's own diagnostics carry the detail
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Session-state filesystem handling failed
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The expression ran but the expected output raster is absent
    #[error("ERROR calculating {output}")]
    OutputMissing { output: String },
}

impl WorkerError {
    /// Process exit code the binary maps this error to
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::Engine(_) => 30,
            WorkerError::Session(_) => 40,
            WorkerError::OutputMissing { .. } => 50,
        }
    }
}

/// The three caller-supplied parameters of one computation
#[derive(Debug, Clone)]
pub struct MapcalcJob {
    /// Saved region name, optionally `name@mapset` when saved outside the
    /// target mapset
    pub region: String,

    /// Mapset to create and compute in
    pub mapset: String,

    /// The assignment to evaluate
    pub expression: Expression,
}

/// Success record of a run
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    /// Mapset the output lives in
    pub mapset: String,

    /// Name of the produced raster
    pub output: String,

    /// Session-state file the environment points at after the run
    pub state_file: PathBuf,

    /// Completion time
    pub finished_at: DateTime<Utc>,
}

/// Executes one mapcalc job against an engine
pub struct Worker<E> {
    engine: E,
    config: WorkerConfig,
}

impl<E: Engine> Worker<E> {
    /// Create a worker over `engine` with the effective configuration
    pub fn new(engine: E, config: WorkerConfig) -> Self {
        Self { engine, config }
    }

    /// Run the job sequence.
    ///
    /// On success the private session-state copy is removed and the returned
    /// outcome points back at the original state file. When the output check
    /// fails the private copy stays on disk and the error names the missing
    /// raster.
    pub fn run(&self, job: &MapcalcJob) -> Result<JobOutcome, WorkerError> {
        let info = self.engine.session_info()?;
        let mut env = SessionEnv::new(info.state_file.clone(), self.config.tuning());

        eprintln!("New mapset: <{}>", job.mapset);
        session::ensure_dir_absent(&info.mapset_path(&job.mapset))?;

        // Private state-file copy keyed by pid; every engine call below runs
        // against the copy, so siblings sharing the session root never see
        // this worker's mapset switch.
        let private = PrivateStateFile::create(&info.state_file, process::id())?;
        env.point_state_file_to(private.path());
        eprintln!("GISRC: <{}>", env.state_file().display());

        self.engine.switch_mapset(&env, &job.mapset, true)?;
        self.engine.set_region(&env, &job.region)?;

        eprintln!("Running r.mapcalc ...");
        let invocation = Invocation::new(self.config.tools.mapcalc.as_str())
            .arg(format!("expression={}", job.expression.as_str()))
            .quiet();
        self.engine.execute(&env, &invocation)?;

        let output = job.expression.output_name();
        if !self.engine.raster_exists(&env, output, &job.mapset)? {
            // The private copy stays behind on this path.
            return Err(WorkerError::OutputMissing {
                output: output.to_string(),
            });
        }

        private.release()?;
        env.point_state_file_to(&info.state_file);

        Ok(JobOutcome {
            mapset: job.mapset.clone(),
            output: output.to_string(),
            state_file: env.state_file().to_path_buf(),
            finished_at: Utc::now(),
        })
    }
}
