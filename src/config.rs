use crate::defaults;
use crate::error::{Result, VerifactError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub protocol: Protocol,
    pub audio: AudioConfig,
    pub verify: VerifyConfig,
}

/// Which fact protocol the upstream transcript stream speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Protocol {
    /// `Q<n>:` / `A<n>:` numbered fact lines interleaved with plain text.
    #[default]
    NumberedLines,
    /// Inline `§{...}` confidence envelopes instead of numbered lines.
    ConfidenceEnvelope,
}

/// Audio gating configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub vad_threshold: f32,
    pub vad_smoothing: f32,
    pub vad_hold_ms: u32,
    pub keepalive_interval_ms: u32,
}

/// Verification dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerifyConfig {
    pub host: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub pacing_ms: u64,
    pub failure_pacing_ms: u64,
    pub system_prompt: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            frame_size: defaults::FRAME_SIZE,
            vad_threshold: defaults::VAD_THRESHOLD,
            vad_smoothing: defaults::VAD_SMOOTHING,
            vad_hold_ms: defaults::VAD_HOLD_MS,
            keepalive_interval_ms: defaults::KEEPALIVE_INTERVAL_MS,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            host: defaults::API_HOST.to_string(),
            model: defaults::VERIFICATION_MODEL.to_string(),
            max_output_tokens: defaults::MAX_OUTPUT_TOKENS,
            pacing_ms: defaults::VERIFY_PACING_MS,
            failure_pacing_ms: defaults::VERIFY_FAILURE_PACING_MS,
            system_prompt: defaults::VERIFICATION_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML or out-of-range
    /// values. Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    // Re-panic on invalid TOML or other errors
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VERIFACT_MODEL → verify.model
    /// - VERIFACT_HOST → verify.host
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VERIFACT_MODEL")
            && !model.is_empty()
        {
            self.verify.model = model;
        }

        if let Ok(host) = std::env::var("VERIFACT_HOST")
            && !host.is_empty()
        {
            self.verify.host = host;
        }

        self
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.audio.vad_threshold) {
            return Err(VerifactError::ConfigInvalidValue {
                key: "audio.vad_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.audio.vad_smoothing) {
            return Err(VerifactError::ConfigInvalidValue {
                key: "audio.vad_smoothing".to_string(),
                message: "must be at least 0.0 and below 1.0".to_string(),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(VerifactError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.frame_size == 0 {
            return Err(VerifactError::ConfigInvalidValue {
                key: "audio.frame_size".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.verify.max_output_tokens == 0 {
            return Err(VerifactError::ConfigInvalidValue {
                key: "verify.max_output_tokens".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/verifact/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("verifact")
            .join("config.toml")
    }
}
