//! Configuration management for Ringwatch

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub general: GeneralConfig,
    pub audio: AudioConfig,
    pub templates: TemplatesConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub node_id: String,
    pub description: String,
    pub max_sessions: u32,
}

/// Signal-analysis parameters. The defaults target the 450 Hz progress tone
/// used on Chinese and many European networks, at the 8 kHz telephony rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub target_freq: f64,
    /// Goertzel analysis window in samples (205 at 8 kHz is about 25.6 ms).
    pub goertzel_window: usize,
    /// Broadband RMS level above which a frame counts as signal at all.
    pub rms_threshold: f64,
    /// Narrow-band (target frequency) energy level above which the signal
    /// counts as tonal.
    pub tone_energy_threshold: f64,
}

/// Cadence templates for the recognized call-progress tones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    pub busy: ToneTemplate,
    pub ringback: ToneTemplate,
    pub congestion: ToneTemplate,
}

/// On/off duration window for one tone cadence, in milliseconds, plus the
/// number of consecutive matching cycles required before the verdict fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneTemplate {
    pub on_min_ms: u64,
    pub on_max_ms: u64,
    pub off_min_ms: u64,
    pub off_max_ms: u64,
    pub min_consecutive: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Overall guard: a session that has not produced a terminal verdict
    /// after this many milliseconds of media times out.
    pub max_detect_time_ms: u64,
    /// Tone segments shorter than this are treated as glitches and ignored.
    pub min_tone_ms: u64,
    pub hangup_on: HangupPolicy,
}

/// Which verdicts should request call termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HangupPolicy {
    pub busy: bool,
    pub ringback: bool,
    pub congestion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "full")]
    Full,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            node_id: "ringwatch-1".to_string(),
            description: "Ringwatch call progress detector".to_string(),
            max_sessions: 500,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            target_freq: 450.0,
            goertzel_window: 205,
            rms_threshold: 500.0,
            tone_energy_threshold: 1000.0,
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            busy: ToneTemplate {
                on_min_ms: 250,
                on_max_ms: 450,
                off_min_ms: 250,
                off_max_ms: 450,
                min_consecutive: 2,
            },
            ringback: ToneTemplate {
                on_min_ms: 900,
                on_max_ms: 1200,
                off_min_ms: 3000,
                off_max_ms: 5000,
                min_consecutive: 1,
            },
            congestion: ToneTemplate {
                on_min_ms: 600,
                on_max_ms: 800,
                off_min_ms: 500,
                off_max_ms: 900,
                min_consecutive: 2,
            },
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_detect_time_ms: 60_000,
            min_tone_ms: 10,
            hangup_on: HangupPolicy {
                busy: true,
                ringback: false,
                congestion: false,
            },
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Compact,
        }
    }
}

impl DetectorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: DetectorConfig = toml::from_str(&contents)
            .map_err(|e| Error::parse(format!("Invalid TOML: {}", e)))?;
        Ok(config)
    }

    pub fn load_from_env() -> Result<Self> {
        let mut settings = config::Config::builder();

        // Load from environment variables with RINGWATCH_ prefix
        settings = settings.add_source(
            config::Environment::with_prefix("RINGWATCH")
                .separator("_")
        );

        let config = settings.build()?;
        let detector_config = config.try_deserialize()?;
        Ok(detector_config)
    }

    /// Reject configurations the engine cannot run with. Called before any
    /// frame is processed.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(Error::invalid_config("Sample rate must be positive"));
        }

        if self.audio.goertzel_window == 0 {
            return Err(Error::invalid_config("Goertzel window must be positive"));
        }

        if self.audio.target_freq <= 0.0 {
            return Err(Error::invalid_config("Target frequency must be positive"));
        }

        if self.audio.target_freq >= self.audio.sample_rate as f64 / 2.0 {
            return Err(Error::invalid_config(
                "Target frequency must be below the Nyquist frequency",
            ));
        }

        if self.audio.rms_threshold < 0.0 || self.audio.tone_energy_threshold < 0.0 {
            return Err(Error::invalid_config("Energy thresholds must be non-negative"));
        }

        if self.detection.max_detect_time_ms == 0 {
            return Err(Error::invalid_config("Max detection time must be positive"));
        }

        for (name, template) in [
            ("busy", &self.templates.busy),
            ("ringback", &self.templates.ringback),
            ("congestion", &self.templates.congestion),
        ] {
            template.validate(name)?;
        }

        Ok(())
    }

    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            audio: AudioConfig::default(),
            templates: TemplatesConfig::default(),
            detection: DetectionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ToneTemplate {
    fn validate(&self, name: &str) -> Result<()> {
        if self.on_min_ms > self.on_max_ms {
            return Err(Error::invalid_config(format!(
                "Template '{}': on-min exceeds on-max", name
            )));
        }
        if self.off_min_ms > self.off_max_ms {
            return Err(Error::invalid_config(format!(
                "Template '{}': off-min exceeds off-max", name
            )));
        }
        if self.min_consecutive == 0 {
            return Err(Error::invalid_config(format!(
                "Template '{}': min-consecutive must be at least 1", name
            )));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = DetectorConfig::default_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_matches_standard_cadences() {
        let config = DetectorConfig::default_config();
        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.audio.goertzel_window, 205);
        assert_eq!(config.templates.busy.on_min_ms, 250);
        assert_eq!(config.templates.busy.on_max_ms, 450);
        assert_eq!(config.templates.ringback.off_min_ms, 3000);
        assert_eq!(config.templates.ringback.min_consecutive, 1);
        assert_eq!(config.detection.max_detect_time_ms, 60_000);
    }

    #[test]
    fn test_default_hangup_policy_is_busy_only() {
        let policy = DetectionConfig::default().hangup_on;
        assert!(policy.busy);
        assert!(!policy.ringback);
        assert!(!policy.congestion);
    }

    #[test]
    fn test_inverted_template_range_rejected() {
        let mut config = DetectorConfig::default_config();
        config.templates.busy.on_min_ms = 500;
        config.templates.busy.on_max_ms = 250;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = DetectorConfig::default_config();
        config.audio.goertzel_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_consecutive_rejected() {
        let mut config = DetectorConfig::default_config();
        config.templates.congestion.min_consecutive = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_freq_above_nyquist_rejected() {
        let mut config = DetectorConfig::default_config();
        config.audio.target_freq = 4000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = DetectorConfig::default_config();
        let toml_content = toml::to_string_pretty(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let loaded = DetectorConfig::load_from_file(file.path()).unwrap();
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.audio.target_freq, config.audio.target_freq);
        assert_eq!(loaded.templates.busy.min_consecutive, 2);
    }
}
