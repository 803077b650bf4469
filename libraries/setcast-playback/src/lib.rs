//! SetCast - Playback Reconciliation
//!
//! Keeps a listener's local playback in step with a live show.
//!
//! This crate provides:
//! - Show status reconciliation (target vs. observed state, single pending change)
//! - Drift compensation between the server clock and the local playback clock
//! - Opportunistic audio unlock (graph construction, handle priming, engine resume)
//! - Gain control (0-100 volume, linear gain)
//! - Dual playback handles (active + reserved inactive handle)
//! - Stall detection and UI events
//!
//! # Architecture
//!
//! `setcast-playback` is platform-agnostic:
//! - No transport (polling/websocket) - targets are pushed in by the host
//! - No rendering - the host reads [`ShowInfo`] and drains [`ShowEvent`]s
//! - No decoding - media handles and audio engines are provided via traits
//!
//! # Example: Following a show
//!
//! ```rust
//! use setcast_playback::{
//!     ControllerConfig, DualBuffer, PlaybackHandle, Result, ShowController, ShowStatus,
//!     TargetShowInfo,
//! };
//!
//! #[derive(Default)]
//! struct Silent {
//!     source: Option<String>,
//!     position: f64,
//! }
//!
//! impl PlaybackHandle for Silent {
//!     fn source(&self) -> Option<&str> {
//!         self.source.as_deref()
//!     }
//!     fn set_source(&mut self, url: &str) {
//!         self.source = Some(url.to_string());
//!     }
//!     fn seek(&mut self, position: f64) -> Result<()> {
//!         self.position = position;
//!         Ok(())
//!     }
//!     fn play(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//!     fn pause(&mut self) {}
//!     fn current_time(&self) -> f64 {
//!         self.position
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let surface = DualBuffer::new(Box::new(Silent::default()), Box::new(Silent::default()));
//! let mut controller = ShowController::new(ControllerConfig::default()).with_surface(surface);
//!
//! // Known before the user clicks: deferred until unlock
//! controller.on_target_update(TargetShowInfo::from_json(
//!     r#"{"status":"WAITING_UNTIL_START","currentSet":null,"nextSet":null,"secondsUntilSet":30}"#,
//! )?)?;
//! assert_eq!(controller.status(), ShowStatus::AwaitingUnlock);
//!
//! // User gesture
//! controller.initialize_audio().await?;
//! assert_eq!(controller.status(), ShowStatus::WaitingUntilStart);
//!
//! controller.set_volume(80.0);
//! for event in controller.drain_events() {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod controller;
pub mod drift;
mod error;
mod events;
mod gain;
mod surface;
pub mod types;
mod unlock;
mod watchdog;

// Public exports
pub use controller::{ControllerEvent, ShowController};
pub use error::{PlaybackError, Result};
pub use events::ShowEvent;
pub use gain::{volume_to_gain, GainController};
pub use surface::{
    AudioGraph, AudioGraphBuilder, DualBuffer, GraphNode, PlaybackHandle, SIGNAL_CHAIN,
};
pub use types::{AnalyserSettings, ControllerConfig, Item, ShowInfo, ShowStatus, TargetShowInfo};
pub use unlock::{AudioUnlocker, UnlockReport};
pub use watchdog::StallWatchdog;
