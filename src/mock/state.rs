//! Mock engine state
//!
//! Records every engine call in order and keeps the simulated data store
//! (which rasters exist in which mapset).

use std::collections::HashSet;
use std::path::PathBuf;

use crate::session::SessionInfo;

/// One recorded engine call, with the state file it ran against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    SessionInfo,
    SwitchMapset {
        state_file: PathBuf,
        mapset: String,
        create_if_missing: bool,
    },
    SetRegion {
        state_file: PathBuf,
        region: String,
    },
    Execute {
        state_file: PathBuf,
        tool: String,
        args: Vec<String>,
        quiet: bool,
    },
    RasterExists {
        state_file: PathBuf,
        raster: String,
        mapset: String,
    },
}

/// Mutable mock state behind the engine facade
#[derive(Debug)]
pub struct MockState {
    /// The session identity served by `session_info`
    pub session: SessionInfo,

    /// Calls in arrival order
    pub calls: Vec<EngineCall>,

    /// Rasters present in the simulated store, as `(raster, mapset)`
    pub rasters: HashSet<(String, String)>,

    /// Mapset most recently switched into
    pub current_mapset: Option<String>,
}

impl MockState {
    /// Create state serving `session`
    pub fn new(session: SessionInfo) -> Self {
        Self {
            session,
            calls: Vec::new(),
            rasters: HashSet::new(),
            current_mapset: None,
        }
    }

    /// Record a raster as present
    pub fn add_raster(&mut self, raster: &str, mapset: &str) {
        self.rasters.insert((raster.to_string(), mapset.to_string()));
    }

    /// Whether a raster is present
    pub fn has_raster(&self, raster: &str, mapset: &str) -> bool {
        self.rasters
            .contains(&(raster.to_string(), mapset.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_fixture() -> SessionInfo {
        SessionInfo {
            gisdbase: PathBuf::from("/data/grassdata"),
            location: "nc_spm".to_string(),
            state_file: PathBuf::from("/tmp/rc"),
        }
    }

    #[test]
    fn test_raster_bookkeeping() {
        let mut state = MockState::new(session_fixture());
        assert!(!state.has_raster("result", "tile_01"));

        state.add_raster("result", "tile_01");
        assert!(state.has_raster("result", "tile_01"));
        assert!(!state.has_raster("result", "tile_02"));
    }
}
