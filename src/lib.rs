//! Mapcalc Worker - isolated-mapset map-algebra execution
//!
//! This crate implements a single-shot worker that runs one `r.mapcalc`
//! computation inside its own GRASS GIS mapset, so an external orchestrator
//! can fan a larger raster calculation out across many worker processes
//! sharing one session root.

pub mod config;
pub mod engine;
pub mod expression;
pub mod mock;
pub mod session;
pub mod worker;

pub use config::{ConfigError, ToolSet, WorkerConfig};
pub use engine::{Engine, EngineError, GrassEngine, Invocation, Operation};
pub use expression::{Expression, ExpressionError};
pub use mock::MockEngine;
pub use session::{PrivateStateFile, SessionEnv, SessionInfo};
pub use worker::{JobOutcome, MapcalcJob, Worker, WorkerError};
