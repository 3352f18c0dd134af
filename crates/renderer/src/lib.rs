//! Feedback-pipeline renderer for drive-driven typography.
//!
//! The renderer owns the GPU context, two render pipelines (composite and
//! blit), a ping-pong pair of feedback buffers, and the static channel
//! textures (rasterized text mask and the 1-D drive series). Each frame
//! composites the distorted text blended with the decayed previous frame
//! into the write buffer, blits that buffer to the surface, then swaps
//! the pair.

mod compile;
mod gpu;
mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use runtime::{FrameClock, TimeSample};
pub use types::{Antialiasing, RendererConfig, TextSource};

/// Windowed renderer with an explicit lifecycle: construct with a config,
/// `run` until the user quits, resources drop with the value.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Runs the winit event loop to completion on the calling thread.
    pub fn run(self) -> Result<()> {
        window::run(self.config)
    }
}
