//! Timed script replay against a show controller

use crate::script::ScriptStep;
use anyhow::{Context, Result};
use serde::Serialize;
use setcast_playback::{ShowController, ShowEvent, ShowInfo};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info};

/// Result of dispatching one script step
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub at_ms: u64,
    pub show_info: ShowInfo,
    pub events: Vec<ShowEvent>,
    /// Local playhead of the active handle after the step
    pub local_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replay `steps` in time, scaled by `speed`
///
/// A step that the controller rejects is reported in its outcome; the
/// replay carries on with the next step. A step whose scaled offset does
/// not fit the clock stops the replay with an error.
pub async fn run<F>(
    controller: &mut ShowController,
    steps: Vec<ScriptStep>,
    speed: f64,
    mut on_step: F,
) -> Result<Vec<StepOutcome>>
where
    F: FnMut(&StepOutcome),
{
    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(steps.len());

    info!(steps = steps.len(), speed, "Starting replay");

    for step in steps {
        let deadline = Duration::try_from_secs_f64(step.at_ms as f64 / 1000.0 / speed)
            .ok()
            .and_then(|offset| start.checked_add(offset))
            .with_context(|| {
                format!("Step at {}ms is out of range at speed {}", step.at_ms, speed)
            })?;
        sleep_until(deadline).await;

        let error = controller
            .dispatch(step.event.into())
            .await
            .err()
            .map(|e| {
                error!(at_ms = step.at_ms, error = %e, "Step rejected");
                e.to_string()
            });

        let outcome = StepOutcome {
            at_ms: step.at_ms,
            show_info: controller.show_info().clone(),
            events: controller.drain_events(),
            local_time: controller
                .surface()
                .map(|surface| surface.active().current_time()),
            error,
        };

        on_step(&outcome);
        outcomes.push(outcome);
    }

    info!(status = %controller.status(), "Replay finished");
    Ok(outcomes)
}
