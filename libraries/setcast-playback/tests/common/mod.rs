//! Shared test helpers: recording playback handles and audio graphs

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use setcast_playback::{
    AnalyserSettings, AudioGraph, AudioGraphBuilder, DualBuffer, GraphNode, Item, PlaybackError,
    PlaybackHandle, Result, TargetShowInfo,
};
use std::sync::{Arc, Mutex};

/// Command observed on a playback handle
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetSource(String),
    Seek(f64),
    Play,
    Pause,
}

/// Shared view into a [`RecordingHandle`]
#[derive(Debug, Default)]
pub struct HandleLog {
    pub commands: Vec<Command>,
    pub source: Option<String>,
    /// Local elapsed time reported by the handle
    pub position: f64,
    pub playing: bool,
    pub reject_play: bool,
    /// Refuse `play` until the handle is primed during unlock
    pub autoplay_blocked: bool,
}

pub type SharedLog = Arc<Mutex<HandleLog>>;

pub struct RecordingHandle {
    log: SharedLog,
    source: Option<String>,
}

impl RecordingHandle {
    pub fn new() -> (Self, SharedLog) {
        let log = SharedLog::default();
        (
            Self {
                log: Arc::clone(&log),
                source: None,
            },
            log,
        )
    }
}

#[async_trait]
impl PlaybackHandle for RecordingHandle {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        let mut log = self.log.lock().unwrap();
        log.source = Some(url.to_string());
        log.position = 0.0;
        log.playing = false;
        log.commands.push(Command::SetSource(url.to_string()));
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.position = position;
        log.commands.push(Command::Seek(position));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.commands.push(Command::Play);
        if log.reject_play || log.autoplay_blocked {
            return Err(PlaybackError::Handle("playback not allowed".to_string()));
        }
        log.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.playing = false;
        log.commands.push(Command::Pause);
    }

    fn current_time(&self) -> f64 {
        self.log.lock().unwrap().position
    }

    async fn prime_for_unlock(&mut self) -> Result<()> {
        self.log.lock().unwrap().autoplay_blocked = false;
        let played = self.play();
        self.pause();
        played
    }
}

/// Build a surface of two recording handles, returning (surface, active log, inactive log)
pub fn recording_surface() -> (DualBuffer, SharedLog, SharedLog) {
    let (active, active_log) = RecordingHandle::new();
    let (inactive, inactive_log) = RecordingHandle::new();
    (
        DualBuffer::new(Box::new(active), Box::new(inactive)),
        active_log,
        inactive_log,
    )
}

/// Shared view into graphs produced by [`RecordingGraphBuilder`]
#[derive(Debug, Default)]
pub struct GraphLog {
    pub builds: u32,
    pub resumes: u32,
    pub closes: u32,
    pub chain: Vec<GraphNode>,
    pub gain: Option<f32>,
}

pub type SharedGraphLog = Arc<Mutex<GraphLog>>;

struct RecordingGraph {
    log: SharedGraphLog,
}

#[async_trait]
impl AudioGraph for RecordingGraph {
    fn set_gain(&mut self, gain: f32) {
        self.log.lock().unwrap().gain = Some(gain);
    }

    async fn resume(&mut self) -> Result<()> {
        self.log.lock().unwrap().resumes += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

pub struct RecordingGraphBuilder {
    log: SharedGraphLog,
    fail: bool,
}

impl RecordingGraphBuilder {
    pub fn new(fail: bool) -> (Box<Self>, SharedGraphLog) {
        let log = SharedGraphLog::default();
        (
            Box::new(Self {
                log: Arc::clone(&log),
                fail,
            }),
            log,
        )
    }
}

impl AudioGraphBuilder for RecordingGraphBuilder {
    fn build(
        &mut self,
        _surface: Option<&mut DualBuffer>,
        chain: &[GraphNode],
        _analyser: &AnalyserSettings,
    ) -> Result<Box<dyn AudioGraph>> {
        let mut log = self.log.lock().unwrap();
        log.builds += 1;
        if self.fail {
            return Err(PlaybackError::Graph("AudioContext unavailable".to_string()));
        }
        log.chain = chain.to_vec();
        Ok(Box::new(RecordingGraph {
            log: Arc::clone(&self.log),
        }))
    }
}

pub fn item(id: &str, start_minute: u32) -> Item {
    Item::new(
        id,
        format!("https://cdn.example.com/{id}.mp3"),
        format!("Artist {id}"),
        Utc.with_ymd_and_hms(2024, 6, 1, 20, start_minute, 0).unwrap(),
        1800.0,
    )
}

pub fn waiting(set: Option<Item>, seconds_until_set: f64) -> TargetShowInfo {
    TargetShowInfo::WaitingUntilStart {
        current_set: set,
        next_set: None,
        seconds_until_set,
    }
}

pub fn playing(set: Option<Item>, current_time: f64) -> TargetShowInfo {
    TargetShowInfo::Playing {
        current_set: set,
        next_set: None,
        current_time,
    }
}

/// Commands recorded so far
pub fn commands(log: &SharedLog) -> Vec<Command> {
    log.lock().unwrap().commands.clone()
}

/// Drop recorded commands (e.g. unlock priming)
pub fn clear_commands(log: &SharedLog) {
    log.lock().unwrap().commands.clear();
}

/// Set the handle's reported local elapsed time
pub fn set_position(log: &SharedLog, position: f64) {
    log.lock().unwrap().position = position;
}
