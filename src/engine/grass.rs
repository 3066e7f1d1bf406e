//! GRASS GIS engine backed by the module command-line tools
//!
//! Every call spawns the corresponding tool (`g.mapset`, `g.region`,
//! `r.mapcalc`, `g.findfile`) with the session environment applied to the
//! child process only; the worker's own process environment stays untouched.
//! Tool output uses `KEY=value` lines (`g.findfile` single-quotes its
//! values), parsed by [`parse_kv_lines`].

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use crate::config::ToolSet;
use crate::session::{SessionEnv, SessionInfo, STATE_FILE_VAR};

use super::{Engine, EngineError, Invocation};

/// Session variable naming the database root
const GISDBASE_VAR: &str = "GISDBASE";

/// Session variable naming the active location
const LOCATION_VAR: &str = "LOCATION_NAME";

/// The real engine, shelling out to the GRASS module tools
#[derive(Debug, Clone)]
pub struct GrassEngine {
    tools: ToolSet,
}

impl GrassEngine {
    /// Create an engine using the given tool names
    pub fn new(tools: ToolSet) -> Self {
        Self { tools }
    }

    fn run(
        &self,
        vars: &[(String, String)],
        tool: &str,
        args: &[String],
    ) -> Result<Output, EngineError> {
        let mut command = Command::new(tool);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in vars {
            command.env(key, value);
        }

        let output = command.output().map_err(|source| EngineError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                tool: tool.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

impl Engine for GrassEngine {
    fn session_info(&self) -> Result<SessionInfo, EngineError> {
        // The orchestrator's session wrapper exports the state-file path.
        // Reading it is the one ambient lookup; everything after runs
        // against an explicit SessionEnv.
        let state_file = env::var_os(STATE_FILE_VAR)
            .map(PathBuf::from)
            .ok_or(EngineError::NoStateFile(STATE_FILE_VAR))?;

        let vars = vec![(
            STATE_FILE_VAR.to_string(),
            state_file.display().to_string(),
        )];
        let output = self.run(&vars, &self.tools.gisenv, &["-n".to_string()])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let session_vars = parse_kv_lines(&stdout);

        let gisdbase = session_vars
            .get(GISDBASE_VAR)
            .ok_or_else(|| EngineError::MissingVariable(GISDBASE_VAR.to_string()))?;
        let location = session_vars
            .get(LOCATION_VAR)
            .ok_or_else(|| EngineError::MissingVariable(LOCATION_VAR.to_string()))?;

        Ok(SessionInfo {
            gisdbase: PathBuf::from(gisdbase),
            location: location.clone(),
            state_file,
        })
    }

    fn switch_mapset(
        &self,
        env: &SessionEnv,
        mapset: &str,
        create_if_missing: bool,
    ) -> Result<(), EngineError> {
        let mut args = Vec::new();
        if create_if_missing {
            args.push("-c".to_string());
        }
        args.push(format!("mapset={mapset}"));
        self.run(&env.vars(), &self.tools.mapset, &args)?;
        Ok(())
    }

    fn set_region(&self, env: &SessionEnv, region: &str) -> Result<(), EngineError> {
        let invocation = Invocation::new(self.tools.region.as_str())
            .arg(format!("region={region}"))
            .quiet();
        self.execute(env, &invocation)
    }

    fn execute(&self, env: &SessionEnv, invocation: &Invocation) -> Result<(), EngineError> {
        let mut args = invocation.args.clone();
        if invocation.quiet {
            args.push("--quiet".to_string());
        }
        self.run(&env.vars(), &invocation.tool, &args)?;
        Ok(())
    }

    fn raster_exists(
        &self,
        env: &SessionEnv,
        raster: &str,
        mapset: &str,
    ) -> Result<bool, EngineError> {
        // Raster datasets live under the "cell" element.
        let args = vec![
            "element=cell".to_string(),
            format!("file={raster}"),
            format!("mapset={mapset}"),
        ];

        // Depending on version the lookup tool signals a missing dataset
        // either with a non-zero exit or with an empty file= value.
        let output = match self.run(&env.vars(), &self.tools.findfile, &args) {
            Ok(output) => output,
            Err(EngineError::Failed { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let vars = parse_kv_lines(&stdout);
        Ok(vars.get("file").is_some_and(|file| !file.is_empty()))
    }
}

/// Parse `KEY=value` lines, stripping optional single quotes around values
fn parse_kv_lines(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('\'');
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_output() {
        let text = "GISDBASE=/data/grassdata\nLOCATION_NAME=nc_spm\nMAPSET=PERMANENT\n";
        let vars = parse_kv_lines(text);
        assert_eq!(vars["GISDBASE"], "/data/grassdata");
        assert_eq!(vars["LOCATION_NAME"], "nc_spm");
        assert_eq!(vars["MAPSET"], "PERMANENT");
    }

    #[test]
    fn test_parse_quoted_lookup_output() {
        let text = concat!(
            "name='result'\n",
            "mapset='tile_01'\n",
            "file='/data/grassdata/nc_spm/tile_01/cell/result'\n",
            "fullname='result@tile_01'\n",
        );
        let vars = parse_kv_lines(text);
        assert_eq!(vars["name"], "result");
        assert_eq!(
            vars["file"],
            "/data/grassdata/nc_spm/tile_01/cell/result"
        );
    }

    #[test]
    fn test_parse_empty_quoted_value() {
        let vars = parse_kv_lines("name=''\nfile=''\n");
        assert_eq!(vars["file"], "");
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let vars = parse_kv_lines("no separator here\n=value_without_key\nGOOD=1\n");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["GOOD"], "1");
    }
}
