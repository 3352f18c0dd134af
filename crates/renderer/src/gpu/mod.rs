mod channels;
mod context;
mod feedback;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::{FrameParams, GpuState};
