use std::path::PathBuf;

use playback::PlayheadSource;
use vizconfig::EffectConfig;

/// MSAA policy for the display (blit) pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Highest sample count the surface format supports.
    #[default]
    Auto,
    Off,
    /// Explicit sample count; falls back if unsupported.
    Samples(u32),
}

/// Where the text mask comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    /// Rasterize with the built-in block font, auto-fitted to the canvas.
    Label(String),
    /// Load a prepared RGBA mask from a PNG file.
    MaskPng(PathBuf),
}

/// Everything the window loop needs to render one track.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub surface_size: (u32, u32),
    pub text: TextSource,
    /// Shaped drive series, already normalized/scaled/smoothed.
    pub drive: Vec<f32>,
    /// Track length in seconds; the clock playhead wraps on it.
    pub duration: f64,
    pub params: EffectConfig,
    pub antialiasing: Antialiasing,
    /// Optional FPS cap; `None` renders at surface present rate.
    pub target_fps: Option<f32>,
    pub playhead: PlayheadSource,
    /// Directory PNG exports are written into.
    pub export_dir: PathBuf,
}
