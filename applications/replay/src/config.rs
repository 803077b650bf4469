/// Replay configuration
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use setcast_playback::ControllerConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,

    /// Script time multiplier (2.0 replays twice as fast)
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Fallback tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Handles refuse `play` until primed by the unlock gesture
    #[serde(default = "default_block_autoplay")]
    pub block_autoplay: bool,

    /// Audio graph construction fails (host without an audio engine)
    #[serde(default)]
    pub fail_graph: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            simulation: default_simulation(),
            speed: default_speed(),
            log_filter: default_log_filter(),
        }
    }
}

impl ReplayConfig {
    /// Load configuration from file and environment
    ///
    /// Without an explicit path, `setcast.toml` in the working directory is
    /// used if present. Environment variables prefixed `SETCAST_` override
    /// file values; nested keys use `__` (`SETCAST_CONTROLLER__STALL_THRESHOLD`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("setcast.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SETCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .context("Failed to read replay configuration")?;

        config
            .try_deserialize()
            .context("Invalid replay configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            bail!("speed must be a positive number, got {}", self.speed);
        }

        let fft_size = self.controller.analyser.fft_size;
        if !fft_size.is_power_of_two() || !(32..=32768).contains(&fft_size) {
            bail!("analyser.fft_size must be a power of two in 32..=32768, got {fft_size}");
        }

        if !(0.0..=1.0).contains(&self.controller.analyser.smoothing) {
            bail!(
                "analyser.smoothing must be within 0.0..=1.0, got {}",
                self.controller.analyser.smoothing
            );
        }

        Ok(())
    }
}

// Default values
fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        block_autoplay: default_block_autoplay(),
        fail_graph: false,
    }
}

fn default_block_autoplay() -> bool {
    true
}

fn default_speed() -> f64 {
    1.0
}

fn default_log_filter() -> String {
    "setcast_playback=info,setcast_replay=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ReplayConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.simulation.block_autoplay);
        assert_eq!(config.controller.stall_threshold, 3);
    }

    #[test]
    fn loads_partial_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "speed = 4.0\n\n[controller]\nstall_threshold = 5\nskip_audio_graph = true\n\n[simulation]\nfail_graph = true"
        )
        .unwrap();

        let config = ReplayConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.speed, 4.0);
        assert_eq!(config.controller.stall_threshold, 5);
        assert!(config.controller.skip_audio_graph);
        assert_eq!(config.controller.initial_volume, 100.0);
        assert!(config.simulation.fail_graph);
        assert!(config.simulation.block_autoplay);
    }

    #[test]
    fn rejects_non_positive_speed() {
        let config = ReplayConfig {
            speed: 0.0,
            ..ReplayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_fft_size() {
        let mut config = ReplayConfig::default();
        config.controller.analyser.fft_size = 1000;
        assert!(config.validate().is_err());
    }
}
