//! Core types for show reconciliation
//!
//! Target state arrives from the transport as internally tagged JSON:
//!
//! ```json
//! { "status": "PLAYING", "currentSet": { ... }, "nextSet": null, "currentTime": 12.5 }
//! ```

use crate::error::{PlaybackError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed mismatch between `end` and `start + duration` (server timestamps are whole seconds)
const ITEM_END_TOLERANCE_MS: i64 = 1000;

/// A single set in the show schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique set identifier
    pub id: String,

    /// Audio URL loaded onto the playback handle
    pub audio_url: String,

    /// Performing artist
    pub artist: String,

    /// Scheduled start
    pub start: DateTime<Utc>,

    /// Length in seconds
    pub duration: f64,

    /// Scheduled end (`start + duration`)
    pub end: DateTime<Utc>,
}

impl Item {
    /// Create an item, deriving `end` from `start + duration`
    pub fn new(
        id: impl Into<String>,
        audio_url: impl Into<String>,
        artist: impl Into<String>,
        start: DateTime<Utc>,
        duration: f64,
    ) -> Self {
        let end = start + seconds_to_delta(duration).unwrap_or_else(TimeDelta::zero);

        Self {
            id: id.into(),
            audio_url: audio_url.into(),
            artist: artist.into(),
            start,
            duration,
            end,
        }
    }

    /// Check the item invariants
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(PlaybackError::InvalidTarget("item id is empty".to_string()));
        }
        if self.audio_url.is_empty() {
            return Err(PlaybackError::InvalidTarget(format!(
                "item {} has no audio URL",
                self.id
            )));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(PlaybackError::InvalidTarget(format!(
                "item {} has invalid duration {}",
                self.id, self.duration
            )));
        }

        let expected_end = seconds_to_delta(self.duration)
            .and_then(|duration| self.start.checked_add_signed(duration))
            .ok_or_else(|| {
                PlaybackError::InvalidTarget(format!("item {} duration overflows", self.id))
            })?;

        if (self.end - expected_end).num_milliseconds().abs() > ITEM_END_TOLERANCE_MS {
            return Err(PlaybackError::InvalidTarget(format!(
                "item {} ends at {} but start + duration is {}",
                self.id, self.end, expected_end
            )));
        }

        Ok(())
    }

    /// Seconds between this item's start and `other`'s start
    pub fn start_offset_from(&self, other: &Item) -> f64 {
        (self.start - other.start).num_milliseconds() as f64 / 1000.0
    }
}

fn seconds_to_delta(seconds: f64) -> Option<TimeDelta> {
    if !seconds.is_finite() {
        return None;
    }
    TimeDelta::try_milliseconds((seconds * 1000.0).round() as i64)
}

/// Show status shared by target and observed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShowStatus {
    /// Host audio engine has not been unlocked yet
    AwaitingUnlock,

    /// Show has not started; counting down to the next set
    WaitingUntilStart,

    /// A set is live
    Playing,

    /// Show is over
    Ended,
}

impl fmt::Display for ShowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShowStatus::AwaitingUnlock => "AWAITING_UNLOCK",
            ShowStatus::WaitingUntilStart => "WAITING_UNTIL_START",
            ShowStatus::Playing => "PLAYING",
            ShowStatus::Ended => "ENDED",
        };
        f.write_str(name)
    }
}

/// Authoritative description of what should be audible, produced by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetShowInfo {
    AwaitingUnlock,

    #[serde(rename_all = "camelCase")]
    WaitingUntilStart {
        current_set: Option<Item>,
        next_set: Option<Item>,
        seconds_until_set: f64,
    },

    #[serde(rename_all = "camelCase")]
    Playing {
        current_set: Option<Item>,
        next_set: Option<Item>,
        /// Server elapsed seconds into `current_set`
        current_time: f64,
    },

    Ended,
}

impl TargetShowInfo {
    /// Parse a target from transport JSON
    ///
    /// Unknown `status` values are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn status(&self) -> ShowStatus {
        match self {
            TargetShowInfo::AwaitingUnlock => ShowStatus::AwaitingUnlock,
            TargetShowInfo::WaitingUntilStart { .. } => ShowStatus::WaitingUntilStart,
            TargetShowInfo::Playing { .. } => ShowStatus::Playing,
            TargetShowInfo::Ended => ShowStatus::Ended,
        }
    }

    pub fn current_set(&self) -> Option<&Item> {
        match self {
            TargetShowInfo::WaitingUntilStart { current_set, .. }
            | TargetShowInfo::Playing { current_set, .. } => current_set.as_ref(),
            TargetShowInfo::AwaitingUnlock | TargetShowInfo::Ended => None,
        }
    }

    pub fn next_set(&self) -> Option<&Item> {
        match self {
            TargetShowInfo::WaitingUntilStart { next_set, .. }
            | TargetShowInfo::Playing { next_set, .. } => next_set.as_ref(),
            TargetShowInfo::AwaitingUnlock | TargetShowInfo::Ended => None,
        }
    }

    /// Validate every carried item and the time fields
    pub fn validate(&self) -> Result<()> {
        if let Some(item) = self.current_set() {
            item.validate()?;
        }
        if let Some(item) = self.next_set() {
            item.validate()?;
        }

        match self {
            TargetShowInfo::WaitingUntilStart {
                seconds_until_set, ..
            } if !seconds_until_set.is_finite() => Err(PlaybackError::InvalidTarget(format!(
                "secondsUntilSet is not finite: {seconds_until_set}"
            ))),
            TargetShowInfo::Playing { current_time, .. } if !current_time.is_finite() => Err(
                PlaybackError::InvalidTarget(format!("currentTime is not finite: {current_time}")),
            ),
            _ => Ok(()),
        }
    }
}

/// Locally observed mirror of the target, used for rendering
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShowInfo {
    #[default]
    AwaitingUnlock,

    #[serde(rename_all = "camelCase")]
    WaitingUntilStart {
        current_set: Option<Item>,
        next_set: Option<Item>,
        seconds_until_set: f64,
    },

    #[serde(rename_all = "camelCase")]
    Playing {
        current_set: Option<Item>,
        next_set: Option<Item>,
        current_time: f64,
        /// Seconds local playback trails the target (never negative)
        delay: f64,
    },

    Ended,
}

impl ShowInfo {
    pub fn status(&self) -> ShowStatus {
        match self {
            ShowInfo::AwaitingUnlock => ShowStatus::AwaitingUnlock,
            ShowInfo::WaitingUntilStart { .. } => ShowStatus::WaitingUntilStart,
            ShowInfo::Playing { .. } => ShowStatus::Playing,
            ShowInfo::Ended => ShowStatus::Ended,
        }
    }

    pub fn current_set(&self) -> Option<&Item> {
        match self {
            ShowInfo::WaitingUntilStart { current_set, .. }
            | ShowInfo::Playing { current_set, .. } => current_set.as_ref(),
            ShowInfo::AwaitingUnlock | ShowInfo::Ended => None,
        }
    }

    pub fn next_set(&self) -> Option<&Item> {
        match self {
            ShowInfo::WaitingUntilStart { next_set, .. } | ShowInfo::Playing { next_set, .. } => {
                next_set.as_ref()
            }
            ShowInfo::AwaitingUnlock | ShowInfo::Ended => None,
        }
    }

    /// Current delay while playing
    pub fn delay(&self) -> Option<f64> {
        match self {
            ShowInfo::Playing { delay, .. } => Some(*delay),
            _ => None,
        }
    }
}

/// Analyser (measurement) node parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserSettings {
    /// FFT window size (power of two)
    pub fft_size: u32,

    /// Lower bound of the measured range in dB
    pub min_decibels: f32,

    /// Averaging constant between frames (0.0-1.0)
    pub smoothing: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            min_decibels: -85.0,
            smoothing: 0.75,
        }
    }
}

/// Configuration for the show controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Skip building the audio graph during unlock (hosts without an audio engine)
    pub skip_audio_graph: bool,

    /// Initial volume (0-100, default: 100)
    pub initial_volume: f64,

    /// Consecutive non-advancing clock updates before a stall is reported (0 disables)
    pub stall_threshold: u32,

    /// Measurement node parameters
    pub analyser: AnalyserSettings,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            skip_audio_graph: false,
            initial_volume: 100.0,
            stall_threshold: 3,
            analyser: AnalyserSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap()
    }

    #[test]
    fn default_config() {
        let config = ControllerConfig::default();
        assert!(!config.skip_audio_graph);
        assert_eq!(config.initial_volume, 100.0);
        assert_eq!(config.stall_threshold, 3);
        assert_eq!(config.analyser.fft_size, 1024);
        assert_eq!(config.analyser.min_decibels, -85.0);
    }

    #[test]
    fn item_end_derived_from_duration() {
        let item = Item::new("a", "https://cdn/a.mp3", "Artist", start(), 1800.0);
        assert_eq!(item.end, start() + TimeDelta::seconds(1800));
        assert!(item.validate().is_ok());
    }

    #[test]
    fn item_with_mismatched_end_is_invalid() {
        let mut item = Item::new("a", "https://cdn/a.mp3", "Artist", start(), 1800.0);
        item.end = start() + TimeDelta::seconds(60);
        assert!(matches!(
            item.validate(),
            Err(PlaybackError::InvalidTarget(_))
        ));
    }

    #[test]
    fn item_end_tolerates_sub_second_rounding() {
        let mut item = Item::new("a", "https://cdn/a.mp3", "Artist", start(), 1800.4);
        item.end = start() + TimeDelta::seconds(1800);
        assert!(item.validate().is_ok());
    }

    #[test]
    fn item_without_url_is_invalid() {
        let item = Item::new("a", "", "Artist", start(), 10.0);
        assert!(item.validate().is_err());
    }

    #[test]
    fn parses_playing_target() {
        let json = r#"{
            "status": "PLAYING",
            "currentSet": {
                "id": "set-1",
                "audioUrl": "https://cdn/set-1.mp3",
                "artist": "DJ One",
                "start": "2024-06-01T20:00:00Z",
                "duration": 3600,
                "end": "2024-06-01T21:00:00Z"
            },
            "nextSet": null,
            "currentTime": 42.5
        }"#;

        let target = TargetShowInfo::from_json(json).unwrap();
        assert_eq!(target.status(), ShowStatus::Playing);
        assert_eq!(target.current_set().unwrap().id, "set-1");
        assert!(target.next_set().is_none());
        assert!(target.validate().is_ok());
    }

    #[test]
    fn parses_ended_target() {
        let target = TargetShowInfo::from_json(r#"{"status":"ENDED"}"#).unwrap();
        assert_eq!(target, TargetShowInfo::Ended);
    }

    #[test]
    fn rejects_unknown_status() {
        let result = TargetShowInfo::from_json(r#"{"status":"INTERMISSION"}"#);
        assert!(matches!(result, Err(PlaybackError::Json(_))));
    }

    #[test]
    fn non_finite_time_is_invalid() {
        let target = TargetShowInfo::Playing {
            current_set: None,
            next_set: None,
            current_time: f64::NAN,
        };
        assert!(target.validate().is_err());
    }

    #[test]
    fn status_display_matches_wire_names() {
        assert_eq!(ShowStatus::WaitingUntilStart.to_string(), "WAITING_UNTIL_START");
        assert_eq!(
            serde_json::to_string(&ShowStatus::AwaitingUnlock).unwrap(),
            "\"AWAITING_UNLOCK\""
        );
    }

    #[test]
    fn observed_state_starts_awaiting_unlock() {
        let info = ShowInfo::default();
        assert_eq!(info.status(), ShowStatus::AwaitingUnlock);
        assert!(info.current_set().is_none());
        assert!(info.delay().is_none());
    }
}
