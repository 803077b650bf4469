//! Platform-agnostic playback surface
//!
//! Abstracts the host's media element and audio engine so the reconciler
//! never special-cases a platform. The only commands issued to a handle are
//! set source, seek, play and pause.

use crate::error::Result;
use crate::types::AnalyserSettings;
use async_trait::async_trait;

/// A single media playback handle (an `<audio>` element, a decoder sink, ...)
#[async_trait]
pub trait PlaybackHandle: Send {
    /// URL currently loaded, if any
    fn source(&self) -> Option<&str>;

    /// Load a new URL
    fn set_source(&mut self, url: &str);

    /// Seek to `position` seconds into the loaded item
    fn seek(&mut self, position: f64) -> Result<()>;

    /// Start playback
    ///
    /// Hosts that refuse programmatic playback before unlock return an error.
    fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self);

    /// Locally observed elapsed seconds into the loaded item
    fn current_time(&self) -> f64;

    /// Unlock capability: satisfy host autoplay policy during a user gesture
    ///
    /// The default tries to play and pauses immediately afterwards, so that
    /// hosts which would otherwise start playing as soon as a source is set
    /// stay silent.
    async fn prime_for_unlock(&mut self) -> Result<()> {
        let played = self.play();
        self.pause();
        played
    }
}

/// Node types in the mixing graph, in signal order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNode {
    /// Adjustable amplification
    Gain,

    /// Level/spectrum measurement
    Analyser,
}

/// Signal chain between the playback handles and the output
pub const SIGNAL_CHAIN: [GraphNode; 2] = [GraphNode::Gain, GraphNode::Analyser];

/// A constructed mixing/analysis graph
#[async_trait]
pub trait AudioGraph: Send {
    /// Set the gain node's linear gain (0.0-1.0)
    fn set_gain(&mut self, gain: f32);

    /// Resume the underlying audio engine
    async fn resume(&mut self) -> Result<()>;

    /// Release engine resources
    fn close(&mut self) {}
}

/// Builds the audio graph during unlock
pub trait AudioGraphBuilder: Send {
    /// Construct a graph bound to the surface's handles, wiring `chain` in order
    ///
    /// `surface` is `None` when no handles are attached yet; the graph is then
    /// built without media sources.
    fn build(
        &mut self,
        surface: Option<&mut DualBuffer>,
        chain: &[GraphNode],
        analyser: &AnalyserSettings,
    ) -> Result<Box<dyn AudioGraph>>;
}

/// Two interchangeable playback handles
///
/// The active handle is the audible one. The inactive handle can be
/// prepared with the next item's audio and swapped in for gapless handoff.
pub struct DualBuffer {
    active: Box<dyn PlaybackHandle>,
    inactive: Box<dyn PlaybackHandle>,
}

impl DualBuffer {
    pub fn new(active: Box<dyn PlaybackHandle>, inactive: Box<dyn PlaybackHandle>) -> Self {
        Self { active, inactive }
    }

    pub fn active(&self) -> &dyn PlaybackHandle {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> &mut dyn PlaybackHandle {
        self.active.as_mut()
    }

    pub fn inactive(&self) -> &dyn PlaybackHandle {
        self.inactive.as_ref()
    }

    pub fn inactive_mut(&mut self) -> &mut dyn PlaybackHandle {
        self.inactive.as_mut()
    }

    /// Load `url` onto the inactive handle unless it is already there
    ///
    /// Returns true if the source was changed.
    pub fn prepare_inactive(&mut self, url: &str) -> bool {
        if self.inactive.source() == Some(url) {
            return false;
        }
        self.inactive.set_source(url);
        true
    }

    /// Exchange active and inactive handles
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.active, &mut self.inactive);
    }

    /// Pause both handles
    pub fn release(&mut self) {
        self.active.pause();
        self.inactive.pause();
    }
}

impl std::fmt::Debug for DualBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualBuffer")
            .field("active", &self.active.source())
            .field("inactive", &self.inactive.source())
            .finish()
    }
}
