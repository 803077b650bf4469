//! Replay scripts
//!
//! A script is a JSON array of timed inputs:
//!
//! ```json
//! [
//!   { "atMs": 0,    "event": { "type": "target", "target": { "status": "AWAITING_UNLOCK" } } },
//!   { "atMs": 1500, "event": { "type": "unlock" } },
//!   { "atMs": 2000, "event": { "type": "volume", "volume": 40 } }
//! ]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use setcast_playback::{ControllerEvent, TargetShowInfo};
use std::path::Path;

/// One timed input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Offset from script start, in milliseconds
    pub at_ms: u64,
    pub event: ScriptEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScriptEvent {
    Target { target: TargetShowInfo },
    Volume { volume: f64 },
    Unlock,
}

impl From<ScriptEvent> for ControllerEvent {
    fn from(event: ScriptEvent) -> Self {
        match event {
            ScriptEvent::Target { target } => ControllerEvent::TargetUpdated(target),
            ScriptEvent::Volume { volume } => ControllerEvent::VolumeChanged(volume),
            ScriptEvent::Unlock => ControllerEvent::UnlockRequested,
        }
    }
}

/// Parse a script, ordering steps by time
///
/// Steps sharing a timestamp keep their written order.
pub fn parse(json: &str) -> Result<Vec<ScriptStep>> {
    let mut steps: Vec<ScriptStep> =
        serde_json::from_str(json).context("Malformed replay script")?;
    steps.sort_by_key(|step| step.at_ms);
    Ok(steps)
}

/// Read and parse a script file
pub fn load(path: &Path) -> Result<Vec<ScriptStep>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse(&json).with_context(|| format!("In script {}", path.display()))
}
