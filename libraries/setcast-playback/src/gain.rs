//! Gain control
//!
//! Maps a 0-100 volume onto the linear gain of the graph's gain node.

/// Convert a volume percentage to linear gain
///
/// - `v <= 0` (or NaN) → 0.0
/// - `v >= 100`        → 1.0
/// - otherwise         → `v / 100`
pub fn volume_to_gain(volume: f64) -> f32 {
    if volume.is_nan() || volume <= 0.0 {
        0.0
    } else if volume >= 100.0 {
        1.0
    } else {
        (volume / 100.0) as f32
    }
}

/// Gain setter for the audio graph
///
/// Holds the last requested volume. Mutating a graph is left to the owner,
/// which pushes [`GainController::gain`] into the graph once one exists.
#[derive(Debug, Clone)]
pub struct GainController {
    /// Volume as requested (clamped to 0-100)
    volume: f64,

    /// Cached linear gain
    gain: f32,
}

impl GainController {
    /// Create a gain controller at the given volume
    pub fn new(volume: f64) -> Self {
        let mut controller = Self {
            volume: 0.0,
            gain: 0.0,
        };
        controller.set_volume(volume);
        controller
    }

    /// Set volume (0-100), returning the new linear gain
    ///
    /// Out-of-range input is clamped. Idempotent.
    pub fn set_volume(&mut self, volume: f64) -> f32 {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 100.0)
        };
        self.gain = volume_to_gain(volume);
        self.gain
    }

    /// Current volume (0-100)
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Current linear gain (0.0-1.0)
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Default for GainController {
    fn default() -> Self {
        Self::new(100.0)
    }
}
