use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

pub(crate) fn compile_effect_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("effect composite fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(EFFECT_FRAGMENT_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

pub(crate) fn compile_blit_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("blit fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(BLIT_FRAGMENT_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Minimal full-screen triangle vertex shader shared by both passes.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Composite pass: distorts the text mask by the drive signal and blends
/// in the decayed previous frame.
///
/// The uniform block layout must match `EffectUniforms` in
/// `gpu/uniforms.rs`. Set 1 carries the static channels (text mask and
/// 1-D drive series); set 2 carries the feedback read buffer so the bind
/// group can swap each frame without rebuilding the static one.
///
/// `v_uv` has +y up (NDC convention); texture coordinates have +y down,
/// so `st` flips once and every sample below uses framebuffer-aligned
/// coordinates. The scalar drive (`ubo._drive`) is the playhead-sampled
/// value and steers the whole-frame motion; `local_drive` samples the
/// series by screen x within the trim window and steers per-column
/// distortion.
const EFFECT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform EffectParams {
    vec4 _resolution;      // width, height, aspect, unused
    float _time;
    float _time_delta;
    int _frame;
    float _drive;
    vec4 _trim_feedback;   // trim start, trim end, feedback amount, decay
    vec4 _wave;            // freq min, freq max, amp min, amp max
    vec4 _noise_chroma;    // noise min, noise max, chroma min, chroma max
    vec4 _grain_blur;      // grain min, grain max, blur min, blur max
    vec4 _vert_progress;   // vert disp min, vert disp max, progress, unused
} ubo;

layout(set = 1, binding = 0) uniform texture2D text_texture;
layout(set = 1, binding = 1) uniform sampler text_sampler;
layout(set = 1, binding = 2) uniform texture2D drive_texture;
layout(set = 1, binding = 3) uniform sampler drive_sampler;
layout(set = 2, binding = 0) uniform texture2D feedback_texture;
layout(set = 2, binding = 1) uniform sampler feedback_sampler;

#define textChannel sampler2D(text_texture, text_sampler)
#define driveChannel sampler2D(drive_texture, drive_sampler)
#define feedbackChannel sampler2D(feedback_texture, feedback_sampler)

vec3 permute(vec3 x) { return mod(((x * 34.0) + 1.0) * x, 289.0); }

float snoise(vec2 v) {
    const vec4 C = vec4(0.211324865405187, 0.366025403784439,
                       -0.577350269189626, 0.024390243902439);
    vec2 i  = floor(v + dot(v, C.yy));
    vec2 x0 = v - i + dot(i, C.xx);
    vec2 i1 = (x0.x > x0.y) ? vec2(1.0, 0.0) : vec2(0.0, 1.0);
    vec4 x12 = x0.xyxy + C.xxzz;
    x12.xy -= i1;
    i = mod(i, 289.0);
    vec3 p = permute(permute(i.y + vec3(0.0, i1.y, 1.0))
                            + i.x + vec3(0.0, i1.x, 1.0));
    vec3 m = max(0.5 - vec3(dot(x0, x0), dot(x12.xy, x12.xy),
                            dot(x12.zw, x12.zw)), 0.0);
    m = m * m;
    m = m * m;
    vec3 x = 2.0 * fract(p * C.www) - 1.0;
    vec3 h = abs(x) - 0.5;
    vec3 ox = floor(x + 0.5);
    vec3 a0 = x - ox;
    m *= 1.79284291400159 - 0.85373472095314 * (a0 * a0 + h * h);
    vec3 g;
    g.x  = a0.x  * x0.x  + h.x  * x0.y;
    g.yz = a0.yz * x12.xz + h.yz * x12.yw;
    return 130.0 * dot(m, g);
}

float localDrive(float x) {
    float t = mix(ubo._trim_feedback.x, ubo._trim_feedback.y, x);
    return texture(driveChannel, vec2(t, 0.5)).r;
}

void main() {
    vec2 st = vec2(v_uv.x, 1.0 - v_uv.y);
    vec2 uv = st;

    float local_drive = localDrive(st.x);
    float drive = ubo._drive;
    float time = ubo._time;

    // Wave displacement: whole-frame horizontal sway.
    float wave_freq = ubo._wave.x + drive * (ubo._wave.y - ubo._wave.x);
    float wave_amp = drive * ubo._wave.w + (1.0 - drive) * ubo._wave.z;
    float wave = sin(uv.y * wave_freq + time * (1.0 + drive * 3.0)) * wave_amp;
    uv.x += wave;

    // Noise displacement.
    float noise_scale = ubo._noise_chroma.x + drive * (ubo._noise_chroma.y - ubo._noise_chroma.x);
    float noise_amp = drive * 0.02 + (1.0 - drive) * 0.002;
    vec2 noise_disp = vec2(
        snoise(uv * noise_scale + time * 0.5),
        snoise(uv * noise_scale + time * 0.5 + 100.0)
    ) * noise_amp;
    uv += noise_disp;

    // Chromatic aberration.
    float chroma = local_drive * ubo._noise_chroma.w + (1.0 - local_drive) * ubo._noise_chroma.z;
    float dynamic_offset = sin(time * 2.0) * local_drive * 0.005;
    float chroma_x = chroma + dynamic_offset;
    float chroma_y = chroma * 0.5;
    vec2 r_offset = vec2(-chroma_x, -chroma_y);
    vec2 b_offset = vec2(chroma_x, chroma_y);

    // Vertical displacement spread and blur radius. Blur is inverse
    // quadratic: it peaks when the signal is quiet.
    float vert_disp = local_drive * ubo._vert_progress.y + (1.0 - local_drive) * ubo._vert_progress.x;
    float blur_amount = (1.0 - local_drive) * ubo._grain_blur.w + local_drive * ubo._grain_blur.z;

    vec3 color_r = vec3(0.0);
    vec3 color_g = vec3(0.0);
    vec3 color_b = vec3(0.0);
    float alpha_accum = 0.0;
    float total_weight = 0.0;

    const int BLUR_SAMPLES = 3;
    const int VERT_SAMPLES = 4;

    for (int i = -BLUR_SAMPLES; i <= BLUR_SAMPLES; i++) {
        float h_offset = float(i) * blur_amount / float(BLUR_SAMPLES);
        float h_weight = 1.0 - abs(float(i)) / float(BLUR_SAMPLES + 1);

        for (int j = -VERT_SAMPLES; j <= VERT_SAMPLES; j++) {
            float v_offset = float(j) * vert_disp / float(VERT_SAMPLES);
            float v_weight = 1.0 - abs(float(j)) / float(VERT_SAMPLES + 1);
            v_weight = v_weight * v_weight;

            float weight = h_weight * v_weight;
            vec2 sample_offset = vec2(h_offset, v_offset);

            vec4 tap_r = texture(textChannel, uv + r_offset + sample_offset);
            vec4 tap_g = texture(textChannel, uv + sample_offset);
            vec4 tap_b = texture(textChannel, uv + b_offset + sample_offset);

            color_r += tap_r.rgb * weight;
            color_g += tap_g.rgb * weight;
            color_b += tap_b.rgb * weight;
            alpha_accum += max(tap_r.a, max(tap_g.a, tap_b.a)) * weight;
            total_weight += weight;
        }
    }

    color_r /= total_weight;
    color_g /= total_weight;
    color_b /= total_weight;
    float alpha = alpha_accum / total_weight;

    vec3 current = vec3(color_r.r, color_g.g, color_b.b);

    // Feedback blend: decayed previous frame with a subtle drift.
    vec2 feedback_uv = st + vec2(
        sin(time * 0.3) * 0.002,
        cos(time * 0.2) * 0.001
    ) * local_drive;
    vec4 feedback = texture(feedbackChannel, feedback_uv);
    feedback.rgb *= ubo._trim_feedback.w;

    float feedback_amount = ubo._trim_feedback.z;
    vec3 color = mix(current, feedback.rgb, feedback_amount);
    // The live text always shows through the trails.
    color = max(color, current * 0.3);

    // Grain.
    float grain_intensity = local_drive * ubo._grain_blur.y + (1.0 - local_drive) * ubo._grain_blur.x;
    color += snoise(st * 500.0 + time * 10.0) * grain_intensity;

    // Color grading.
    float brightness = local_drive * 0.1 + (1.0 - local_drive) * 0.05;
    color += brightness;

    float contrast = local_drive * 0.2 + (1.0 - local_drive) * -0.05;
    color = (color - 0.5) * (1.0 + contrast) + 0.5;

    float gray = dot(color, vec3(0.299, 0.587, 0.114));
    float saturation = local_drive * 0.3 + (1.0 - local_drive) * -0.2;
    color = mix(vec3(gray), color, 1.0 + saturation);

    color = clamp(color, 0.0, 1.0);
    outColor = vec4(color, max(alpha, feedback.a * feedback_amount));
}
";

/// Display pass: samples the freshly composited buffer to the surface.
const BLIT_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 0) uniform texture2D source_texture;
layout(set = 0, binding = 1) uniform sampler source_sampler;

void main() {
    vec2 st = vec2(v_uv.x, 1.0 - v_uv.y);
    outColor = texture(sampler2D(source_texture, source_sampler), st);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_shader_declares_every_channel() {
        for binding in [
            "text_texture",
            "drive_texture",
            "feedback_texture",
        ] {
            assert!(EFFECT_FRAGMENT_GLSL.contains(binding), "missing {binding}");
        }
    }

    #[test]
    fn effect_shader_uniform_block_matches_field_order() {
        let block_start = EFFECT_FRAGMENT_GLSL
            .find("uniform EffectParams")
            .expect("uniform block present");
        let block = &EFFECT_FRAGMENT_GLSL[block_start..];
        let order = [
            "_resolution",
            "_time",
            "_time_delta",
            "_frame",
            "_drive",
            "_trim_feedback",
            "_wave",
            "_noise_chroma",
            "_grain_blur",
            "_vert_progress",
        ];
        let mut cursor = 0;
        for field in order {
            let position = block[cursor..]
                .find(field)
                .unwrap_or_else(|| panic!("field {field} out of order"));
            cursor += position;
        }
    }

    #[test]
    fn vertex_shader_covers_the_screen_with_one_triangle() {
        assert!(VERTEX_SHADER_GLSL.contains("positions[3]"));
        assert!(VERTEX_SHADER_GLSL.contains("v_uv = pos * 0.5"));
    }
}
