//! Audio engine unlock
//!
//! Host audio engines refuse programmatic playback until a user gesture.
//! Unlocking is opportunistic: every step is attempted independently and a
//! failing step only degrades the result (no analysis graph, handles still
//! locked) instead of failing the caller.

use crate::surface::{AudioGraph, AudioGraphBuilder, DualBuffer, PlaybackHandle, SIGNAL_CHAIN};
use crate::types::AnalyserSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Outcome of one unlock attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockReport {
    /// An audio graph exists after this attempt
    pub graph_ready: bool,

    /// The active handle accepted its priming play
    pub primed_active: bool,

    /// The inactive handle accepted its priming play
    pub primed_inactive: bool,

    /// The audio engine resumed
    pub resumed: bool,
}

/// Owns the audio engine and performs the unlock sequence
pub struct AudioUnlocker {
    builder: Option<Box<dyn AudioGraphBuilder>>,
    graph: Option<Box<dyn AudioGraph>>,
    analyser: AnalyserSettings,
    skip_graph: bool,
    primed: bool,
    unlocked: bool,
}

impl AudioUnlocker {
    pub fn new(analyser: AnalyserSettings, skip_graph: bool) -> Self {
        Self {
            builder: None,
            graph: None,
            analyser,
            skip_graph,
            primed: false,
            unlocked: false,
        }
    }

    /// Install the graph builder used on the next unlock
    pub fn set_builder(&mut self, builder: Box<dyn AudioGraphBuilder>) {
        self.builder = Some(builder);
    }

    /// Whether an unlock has been performed (successfully or not)
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Whether an audio graph is active
    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    /// Push `gain` into the graph; no-op until a graph exists
    pub fn set_gain(&mut self, gain: f32) {
        if let Some(graph) = self.graph.as_mut() {
            graph.set_gain(gain);
        }
    }

    /// Run the unlock sequence
    ///
    /// Safe to call repeatedly: construction is only attempted while no
    /// graph exists, handles are primed only once (priming a live handle
    /// would pause it), and resume runs whenever a graph exists.
    pub async fn unlock(&mut self, mut surface: Option<&mut DualBuffer>) -> UnlockReport {
        let mut report = UnlockReport::default();

        if self.graph.is_none() && !self.skip_graph {
            self.build_graph(surface.as_deref_mut());
        }
        report.graph_ready = self.graph.is_some();

        if self.primed {
            debug!("Playback handles already primed");
        } else if let Some(surface) = surface.as_deref_mut() {
            report.primed_active = prime(surface.active_mut(), "active").await;
            report.primed_inactive = prime(surface.inactive_mut(), "inactive").await;
            self.primed = true;
        } else {
            debug!("No playback surface attached; skipping priming");
        }

        if let Some(graph) = self.graph.as_mut() {
            match graph.resume().await {
                Ok(()) => report.resumed = true,
                Err(e) => warn!("Audio engine resume failed: {}", e),
            }
        }

        self.unlocked = true;
        info!(
            graph_ready = report.graph_ready,
            primed_active = report.primed_active,
            primed_inactive = report.primed_inactive,
            resumed = report.resumed,
            "Audio unlock finished"
        );

        report
    }

    /// Bring a newly attached surface under an unlock that already happened
    ///
    /// The graph is rebuilt against the new handles and both handles are
    /// primed; fresh handles carry no live audio that priming could pause.
    pub async fn adopt_surface(&mut self, surface: &mut DualBuffer) -> UnlockReport {
        if let Some(mut graph) = self.graph.take() {
            graph.close();
            debug!("Closed audio graph bound to the previous handles");
        }
        self.primed = false;
        self.unlock(Some(surface)).await
    }

    fn build_graph(&mut self, surface: Option<&mut DualBuffer>) {
        let Some(builder) = self.builder.as_mut() else {
            debug!("No audio graph builder installed");
            return;
        };

        match builder.build(surface, &SIGNAL_CHAIN, &self.analyser) {
            Ok(graph) => {
                debug!("Audio graph constructed");
                self.graph = Some(graph);
            }
            Err(e) => warn!("Audio graph construction failed, continuing without it: {}", e),
        }
    }

    /// Close the audio engine
    pub fn release(&mut self) {
        if let Some(mut graph) = self.graph.take() {
            graph.close();
            debug!("Audio graph closed");
        }
    }
}

async fn prime(handle: &mut dyn PlaybackHandle, label: &str) -> bool {
    match handle.prime_for_unlock().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Priming {} playback handle failed: {}", label, e);
            false
        }
    }
}
