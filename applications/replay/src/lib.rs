//! SetCast replay
//!
//! Drives the playback reconciliation core from a timed script of target
//! updates, volume changes and unlock gestures, using simulated handles.

pub mod config;
pub mod runner;
pub mod script;
pub mod simulated;

pub use config::{ReplayConfig, SimulationSettings};
pub use runner::{run, StepOutcome};
pub use script::{ScriptEvent, ScriptStep};

use setcast_playback::ShowController;

/// Build a controller wired to simulated handles and audio engine
pub fn simulated_controller(config: &ReplayConfig) -> ShowController {
    ShowController::new(config.controller.clone())
        .with_surface(simulated::simulated_surface(
            config.speed,
            config.simulation.block_autoplay,
        ))
        .with_graph_builder(Box::new(simulated::SimulatedGraphBuilder::new(
            config.simulation.fail_graph,
        )))
}
