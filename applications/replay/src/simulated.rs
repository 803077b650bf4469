//! Simulated playback surface and audio engine
//!
//! Handles advance a virtual playhead on the tokio clock so drift and stall
//! behavior can be replayed without real media.

use async_trait::async_trait;
use setcast_playback::{
    AnalyserSettings, AudioGraph, AudioGraphBuilder, DualBuffer, GraphNode, PlaybackError,
    PlaybackHandle, Result,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A media handle whose playhead follows the tokio clock
#[derive(Debug)]
pub struct SimulatedHandle {
    name: &'static str,
    source: Option<String>,
    /// Playhead at the moment playback last started or stopped
    position: f64,
    playing_since: Option<Instant>,
    /// Seconds of media per second of clock time
    rate: f64,
    block_autoplay: bool,
    primed: bool,
}

impl SimulatedHandle {
    pub fn new(name: &'static str, rate: f64, block_autoplay: bool) -> Self {
        Self {
            name,
            source: None,
            position: 0.0,
            playing_since: None,
            rate,
            block_autoplay,
            primed: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    fn settle(&mut self) {
        if let Some(since) = self.playing_since.take() {
            self.position += since.elapsed().as_secs_f64() * self.rate;
        }
    }
}

#[async_trait]
impl PlaybackHandle for SimulatedHandle {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn set_source(&mut self, url: &str) {
        debug!(handle = self.name, url, "Loading source");
        self.source = Some(url.to_string());
        self.position = 0.0;
        self.playing_since = None;
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        if self.source.is_none() {
            return Err(PlaybackError::Handle(format!(
                "{}: cannot seek without a source",
                self.name
            )));
        }
        let resume = self.is_playing();
        self.playing_since = None;
        self.position = position.max(0.0);
        if resume {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.block_autoplay && !self.primed {
            warn!(handle = self.name, "Playback refused by autoplay policy");
            return Err(PlaybackError::Handle(
                "play() requires a user gesture".to_string(),
            ));
        }
        if !self.is_playing() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.settle();
    }

    fn current_time(&self) -> f64 {
        match self.playing_since {
            Some(since) => self.position + since.elapsed().as_secs_f64() * self.rate,
            None => self.position,
        }
    }

    async fn prime_for_unlock(&mut self) -> Result<()> {
        // Runs inside the gesture, which lifts the autoplay block.
        self.primed = true;
        let played = self.play();
        self.pause();
        played
    }
}

/// Build a surface of two simulated handles
pub fn simulated_surface(rate: f64, block_autoplay: bool) -> DualBuffer {
    DualBuffer::new(
        Box::new(SimulatedHandle::new("primary", rate, block_autoplay)),
        Box::new(SimulatedHandle::new("secondary", rate, block_autoplay)),
    )
}

/// Audio graph that only records its state through tracing
#[derive(Debug)]
pub struct SimulatedGraph {
    gain: f32,
    running: bool,
}

#[async_trait]
impl AudioGraph for SimulatedGraph {
    fn set_gain(&mut self, gain: f32) {
        debug!(gain, "Gain node updated");
        self.gain = gain;
    }

    async fn resume(&mut self) -> Result<()> {
        if !self.running {
            info!(gain = self.gain, "Audio engine running");
        }
        self.running = true;
        Ok(())
    }

    fn close(&mut self) {
        self.running = false;
        debug!("Audio engine closed");
    }
}

/// Builds [`SimulatedGraph`]s, or fails like a host without an audio engine
#[derive(Debug, Default)]
pub struct SimulatedGraphBuilder {
    fail: bool,
}

impl SimulatedGraphBuilder {
    pub fn new(fail: bool) -> Self {
        Self { fail }
    }
}

impl AudioGraphBuilder for SimulatedGraphBuilder {
    fn build(
        &mut self,
        surface: Option<&mut DualBuffer>,
        chain: &[GraphNode],
        analyser: &AnalyserSettings,
    ) -> Result<Box<dyn AudioGraph>> {
        if self.fail {
            return Err(PlaybackError::Graph(
                "audio engine unavailable".to_string(),
            ));
        }
        info!(
            sources = surface.map_or(0, |_| 2),
            ?chain,
            fft_size = analyser.fft_size,
            "Audio graph built"
        );
        Ok(Box::new(SimulatedGraph {
            gain: 1.0,
            running: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn play_is_blocked_until_primed() {
        let mut handle = SimulatedHandle::new("test", 1.0, true);
        handle.set_source("https://cdn.example.com/a.mp3");

        assert!(handle.play().is_err());
        assert!(!handle.is_playing());

        handle.prime_for_unlock().await.unwrap();
        assert!(handle.is_primed());
        assert!(!handle.is_playing());

        handle.play().unwrap();
        assert!(handle.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn playhead_follows_clock_and_rate() {
        let mut handle = SimulatedHandle::new("test", 2.0, false);
        handle.set_source("https://cdn.example.com/a.mp3");
        handle.seek(10.0).unwrap();
        handle.play().unwrap();

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!((handle.current_time() - 16.0).abs() < 1e-6);

        handle.pause();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!((handle.current_time() - 16.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn new_source_resets_playhead() {
        let mut handle = SimulatedHandle::new("test", 1.0, false);
        handle.set_source("https://cdn.example.com/a.mp3");
        handle.play().unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        handle.set_source("https://cdn.example.com/b.mp3");

        assert_eq!(handle.current_time(), 0.0);
        assert!(!handle.is_playing());
    }

    #[test]
    fn seek_without_source_fails() {
        let mut handle = SimulatedHandle::new("test", 1.0, false);
        assert!(handle.seek(3.0).is_err());
    }

    #[test]
    fn failing_builder_reports_graph_error() {
        let mut builder = SimulatedGraphBuilder::new(true);
        let result = builder.build(None, &[], &AnalyserSettings::default());
        assert!(matches!(result, Err(PlaybackError::Graph(_))));
    }
}
