//! Show Events
//!
//! Event-based communication for UI synchronization. Events are queued by
//! the controller and drained by the host after each dispatched input:
//! - Observed status changes
//! - Source assignment, seek and play on the active handle
//! - Clock updates (countdown, delay)
//! - Unlock outcome, volume changes, stalls

use crate::types::ShowStatus;
use crate::unlock::UnlockReport;
use serde::{Deserialize, Serialize};

/// Events emitted by the show controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShowEvent {
    /// Observed status changed
    StatusChanged {
        /// Previous observed status
        from: ShowStatus,
        /// New observed status
        to: ShowStatus,
    },

    /// A new source was loaded onto the active handle
    SourceChanged {
        /// ID of the loaded set
        item_id: String,
        /// URL assigned to the handle
        url: String,
    },

    /// Playback was started on the active handle
    PlaybackStarted {
        /// ID of the playing set (if known)
        item_id: Option<String>,
        /// Position playback started from, in seconds
        position: f64,
    },

    /// Countdown to the next set was updated
    CountdownUpdated {
        /// Seconds until the set starts
        seconds_until_set: f64,
    },

    /// Drift was recomputed while playing
    DelayUpdated {
        /// Target elapsed time
        current_time: f64,
        /// Seconds local playback trails the target
        delay: f64,
    },

    /// Unlock sequence finished
    Unlocked {
        /// What the unlock achieved
        report: UnlockReport,
    },

    /// Volume changed
    VolumeChanged {
        /// New volume (0-100)
        volume: f64,
        /// Resulting linear gain
        gain: f32,
    },

    /// The active handle's clock stopped advancing while the target moved on
    PlaybackStalled {
        /// ID of the stalled set (if known)
        item_id: Option<String>,
    },
}

impl ShowEvent {
    /// Whether this event reflects a command issued to the playback surface
    pub fn is_playback_command(&self) -> bool {
        matches!(
            self,
            ShowEvent::SourceChanged { .. } | ShowEvent::PlaybackStarted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = ShowEvent::StatusChanged {
            from: ShowStatus::AwaitingUnlock,
            to: ShowStatus::WaitingUntilStart,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "statusChanged");
        assert_eq!(json["to"], "WAITING_UNTIL_START");
    }

    #[test]
    fn playback_commands_are_flagged() {
        assert!(ShowEvent::SourceChanged {
            item_id: "a".to_string(),
            url: "https://cdn/a.mp3".to_string(),
        }
        .is_playback_command());
        assert!(!ShowEvent::DelayUpdated {
            current_time: 1.0,
            delay: 0.0,
        }
        .is_playback_command());
    }
}
