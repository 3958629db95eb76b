//! Version probing and the one-time rebuild.
//!
//! Whether a parser binary reports the expected version is remembered for the
//! lifetime of the process, keyed by binary, version flag and expected
//! version. Only success is remembered unconditionally: a binary that failed
//! the probe is probed again on the next call, so a parser fixed by hand is
//! picked up without a restart. The build command runs at most once per key
//! and is killed if it outlives the configured build timeout. Each key has its
//! own lock, so a slow build of one parser never holds up checks of another.
//!
//! The check is advisory. Tests avoid it by injecting a stub
//! [`ToolRunner`] or by leaving `expected_version` unset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::runner::{Invocation, ToolRunner};
use crate::config::ParserConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProbeKey {
    binary: PathBuf,
    version_flag: String,
    expected: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeState {
    Available,
    BuildFailed,
}

type ProbeSlot = Arc<Mutex<Option<ProbeState>>>;

static PROBES: LazyLock<Mutex<HashMap<ProbeKey, ProbeSlot>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn probe_slot(key: ProbeKey) -> ProbeSlot {
    let mut probes = PROBES.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(probes.entry(key).or_default())
}

/// Make sure the configured parser reports the expected version.
///
/// Attempts the configured build command once if it does not.
pub(crate) fn ensure_available(runner: &dyn ToolRunner, config: &ParserConfig) -> Result<()> {
    if !config.version_check_enabled() {
        return Ok(());
    }
    let Some(expected) = config.expected_version.as_deref() else {
        return Ok(());
    };

    let key = ProbeKey {
        binary: config.binary.clone(),
        version_flag: config.version_flag.clone(),
        expected: expected.to_string(),
    };

    // Held across probe and build so concurrent first calls build only once
    let slot = probe_slot(key);
    let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = *state;
    if previous == Some(ProbeState::Available) {
        return Ok(());
    }

    let found = probe_version(runner, config);
    if found.as_deref() == Some(expected) {
        debug!(binary = %config.binary.display(), version = expected, "Parser is available");
        *state = Some(ProbeState::Available);
        return Ok(());
    }

    warn!(
        binary = %config.binary.display(),
        expected,
        found = ?found,
        "Parser is missing or outdated"
    );

    if config.build_command.is_empty() || previous == Some(ProbeState::BuildFailed) {
        return Err(Error::build_required(config.build_instructions(), None));
    }

    let outcome = run_build(runner, config).and_then(|()| {
        let rebuilt = probe_version(runner, config);
        if rebuilt.as_deref() == Some(expected) {
            Ok(())
        } else {
            Err(Error::VersionMismatch {
                program: config.binary.display().to_string(),
                expected: expected.to_string(),
                found: rebuilt,
            })
        }
    });

    match outcome {
        Ok(()) => {
            info!(binary = %config.binary.display(), "Parser built successfully");
            *state = Some(ProbeState::Available);
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Automatic parser build failed");
            *state = Some(ProbeState::BuildFailed);
            Err(Error::build_required(config.build_instructions(), Some(e)))
        }
    }
}

/// Ask the parser for its version, uncached.
///
/// Returns `None` if the parser cannot be run or exits unsuccessfully.
pub(crate) fn probe_version(runner: &dyn ToolRunner, config: &ParserConfig) -> Option<String> {
    let args = [config.version_flag.clone()];
    let invocation = Invocation {
        timeout: config.timeout(),
        ..Invocation::new(&config.binary, &args)
    };

    match runner.run(&invocation) {
        Ok(output) if output.is_success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => {
            debug!(exit_code = ?output.exit_code, "Version probe failed");
            None
        }
        Err(e) => {
            debug!(error = %e, "Version probe could not run");
            None
        }
    }
}

fn run_build(runner: &dyn ToolRunner, config: &ParserConfig) -> Result<()> {
    let Some((program, args)) = config.build_command.split_first() else {
        return Err(Error::Config("no build command configured".to_string()));
    };

    info!(
        command = %config.build_command.join(" "),
        timeout_secs = config.build_timeout_secs,
        "Attempting to build parser"
    );

    let invocation = Invocation {
        timeout: Some(config.build_timeout()),
        ..Invocation::new(Path::new(program), args)
    };
    let output = runner.run(&invocation)?;
    if output.is_success() {
        Ok(())
    } else {
        Err(Error::internal_tool(
            program,
            output.exit_code,
            output.stderr_lossy(),
        ))
    }
}
