use bytemuck::{Pod, Zeroable};
use vizconfig::EffectConfig;

use crate::runtime::TimeSample;

/// std140 mirror of the `EffectParams` uniform block in the composite
/// shader. Field order and packing must match the GLSL declaration; each
/// parameter pair rides in a vec4 to sidestep std140 vec2 padding rules.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub(crate) struct EffectUniforms {
    /// width, height, aspect, unused.
    pub resolution: [f32; 4],
    pub time: f32,
    pub time_delta: f32,
    pub frame: i32,
    /// Playhead-sampled drive value.
    pub drive: f32,
    /// trim start, trim end, feedback amount, feedback decay.
    pub trim_feedback: [f32; 4],
    /// wave freq min/max, wave amp min/max.
    pub wave: [f32; 4],
    /// noise scale min/max, chroma min/max.
    pub noise_chroma: [f32; 4],
    /// grain min/max, blur min/max.
    pub grain_blur: [f32; 4],
    /// vertical displacement min/max, playhead progress, unused.
    pub vert_progress: [f32; 4],
}

// Every field is a plain f32/i32 lane and the vec4 rows keep the size a
// multiple of the alignment, so there are no padding bytes. The derive
// macro cannot see that through the explicit align attribute.
unsafe impl Zeroable for EffectUniforms {}
unsafe impl Pod for EffectUniforms {}

impl EffectUniforms {
    pub(crate) fn new(
        params: &EffectConfig,
        width: u32,
        height: u32,
        sample: TimeSample,
        drive: f32,
        progress: f32,
    ) -> Self {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        Self {
            resolution: [width, height, width / height, 0.0],
            time: sample.seconds,
            time_delta: sample.delta,
            frame: sample.frame_index as i32,
            drive,
            trim_feedback: [
                params.trim.start,
                params.trim.end,
                params.feedback.amount,
                params.feedback.decay,
            ],
            wave: [
                params.wave_freq.min,
                params.wave_freq.max,
                params.wave_amp.min,
                params.wave_amp.max,
            ],
            noise_chroma: [
                params.noise_scale.min,
                params.noise_scale.max,
                params.chroma.min,
                params.chroma.max,
            ],
            grain_blur: [
                params.grain.min,
                params.grain.max,
                params.blur.min,
                params.blur.max,
            ],
            vert_progress: [params.vert_disp.min, params.vert_disp.max, progress, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_struct_is_std140_sized() {
        // Seven vec4-sized rows, no trailing padding for Pod to hide.
        assert_eq!(std::mem::size_of::<EffectUniforms>(), 7 * 16);
        assert_eq!(std::mem::align_of::<EffectUniforms>(), 16);
    }

    #[test]
    fn uniforms_pack_config_ranges_in_shader_order() {
        let params = EffectConfig::default();
        let sample = TimeSample {
            seconds: 1.5,
            delta: 0.016,
            frame_index: 42,
        };
        let uniforms = EffectUniforms::new(&params, 800, 600, sample, 0.6, 0.25);

        assert_eq!(uniforms.resolution[0], 800.0);
        assert_eq!(uniforms.frame, 42);
        assert_eq!(uniforms.drive, 0.6);
        assert_eq!(uniforms.trim_feedback, [0.0, 1.0, 0.5, 0.95]);
        assert_eq!(uniforms.wave, [2.0, 10.0, 0.005, 0.03]);
        assert_eq!(uniforms.noise_chroma, [1.0, 5.0, 0.001, 0.005]);
        assert_eq!(uniforms.grain_blur, [0.01, 0.05, 0.0, 0.001]);
        assert_eq!(uniforms.vert_progress[2], 0.25);
    }

    #[test]
    fn zero_surface_dimensions_do_not_divide_by_zero() {
        let params = EffectConfig::default();
        let sample = TimeSample {
            seconds: 0.0,
            delta: 0.0,
            frame_index: 0,
        };
        let uniforms = EffectUniforms::new(&params, 0, 0, sample, 0.0, 0.0);
        assert!(uniforms.resolution[2].is_finite());
    }
}
