//! Effect parameter configuration.
//!
//! Every visual knob is a `(min, max)` range; the instantaneous drive
//! value interpolates between the two ends each frame. Defaults are the
//! tuned values the effects were designed around, so an absent or empty
//! config file renders identically to the reference look.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A drive-interpolated parameter range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EffectRange {
    pub min: f32,
    pub max: f32,
}

impl EffectRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Linear interpolation: `drive * max + (1 - drive) * min`.
    pub fn at(&self, drive: f32) -> f32 {
        drive * self.max + (1.0 - drive) * self.min
    }

    /// Inverted interpolation, used for blur: the effect is strongest
    /// when the signal is quiet.
    pub fn at_inverted(&self, drive: f32) -> f32 {
        (1.0 - drive) * self.max + drive * self.min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// Blend weight of the previous frame into the current one.
    pub amount: f32,
    /// Multiplier applied to the previous frame before blending.
    pub decay: f32,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            amount: 0.5,
            decay: 0.95,
        }
    }
}

/// Fraction of the drive timeline that is actually displayed.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrimWindow {
    pub start: f32,
    pub end: f32,
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectConfig {
    pub wave_freq: EffectRange,
    pub wave_amp: EffectRange,
    pub noise_scale: EffectRange,
    pub chroma: EffectRange,
    pub grain: EffectRange,
    pub blur: EffectRange,
    pub vert_disp: EffectRange,
    pub feedback: FeedbackSettings,
    pub trim: TrimWindow,
    /// Whether raw drive samples are normalized before use.
    pub normalize: bool,
    /// Upper bound for the adaptive smoothing window; 0 disables smoothing.
    pub smoothing_window: usize,
    /// Per-track intensity multipliers keyed by track title.
    pub scales: BTreeMap<String, f32>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            wave_freq: EffectRange::new(2.0, 10.0),
            wave_amp: EffectRange::new(0.005, 0.03),
            noise_scale: EffectRange::new(1.0, 5.0),
            chroma: EffectRange::new(0.001, 0.005),
            grain: EffectRange::new(0.01, 0.05),
            blur: EffectRange::new(0.0, 0.001),
            vert_disp: EffectRange::new(0.0, 0.05),
            feedback: FeedbackSettings::default(),
            trim: TrimWindow::default(),
            normalize: true,
            smoothing_window: 10,
            scales: BTreeMap::new(),
        }
    }
}

impl EffectConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: EffectConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Intensity multiplier for a track, 1.0 when no override exists.
    pub fn scale_for(&self, title: &str) -> f32 {
        self.scales.get(title).copied().unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges = [
            ("wave_freq", &self.wave_freq),
            ("wave_amp", &self.wave_amp),
            ("noise_scale", &self.noise_scale),
            ("chroma", &self.chroma),
            ("grain", &self.grain),
            ("blur", &self.blur),
            ("vert_disp", &self.vert_disp),
        ];
        for (name, range) in ranges {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "{name} range must be finite"
                )));
            }
            if range.min > range.max {
                return Err(ConfigError::Invalid(format!(
                    "{name} range is inverted: min {} > max {}",
                    range.min, range.max
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.feedback.amount) {
            return Err(ConfigError::Invalid(format!(
                "feedback amount {} must be within [0, 1]",
                self.feedback.amount
            )));
        }
        if !(0.0..=1.0).contains(&self.feedback.decay) {
            return Err(ConfigError::Invalid(format!(
                "feedback decay {} must be within [0, 1]",
                self.feedback.decay
            )));
        }

        if !(0.0..=1.0).contains(&self.trim.start) || !(0.0..=1.0).contains(&self.trim.end) {
            return Err(ConfigError::Invalid(
                "trim window must lie within [0, 1]".into(),
            ));
        }
        if self.trim.start >= self.trim.end {
            return Err(ConfigError::Invalid(format!(
                "trim start {} must be before trim end {}",
                self.trim.start, self.trim.end
            )));
        }

        for (title, scale) in &self.scales {
            if !scale.is_finite() || *scale < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "scale for track '{title}' must be a non-negative number"
                )));
            }
        }

        Ok(())
    }
}
