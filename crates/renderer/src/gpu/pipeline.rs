use anyhow::{Context, Result};

use crate::compile::{compile_blit_shader, compile_effect_shader, compile_vertex_shader};

use super::channels::StaticChannels;
use super::feedback::{FeedbackPair, FEEDBACK_FORMAT};

/// Layouts and the shared vertex module, built once at startup.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub channel_layout: wgpu::BindGroupLayout,
    pub sampled_layout: wgpu::BindGroupLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub(crate) fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Text mask + drive series, two texture/sampler pairs.
        let channel_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("static channel layout"),
            entries: &sampled_texture_entries(2),
        });

        // One texture/sampler pair: the feedback read buffer in the
        // composite pass, the composited frame in the blit pass.
        let sampled_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sampled texture layout"),
            entries: &sampled_texture_entries(1),
        });

        let vertex_module = compile_vertex_shader(device)?;

        Ok(Self {
            uniform_layout,
            channel_layout,
            sampled_layout,
            vertex_module,
        })
    }

    pub(crate) fn bind_static_channels(
        &self,
        device: &wgpu::Device,
        channels: &StaticChannels,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("static channel bind group"),
            layout: &self.channel_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&channels.text.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&channels.text.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&channels.drive.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&channels.drive.sampler),
                },
            ],
        })
    }

    /// One bind group per feedback target so the composite pass can swap
    /// its read source without rebuilding anything.
    pub(crate) fn bind_feedback_views(
        &self,
        device: &wgpu::Device,
        pair: &FeedbackPair,
        sampler: &wgpu::Sampler,
    ) -> [wgpu::BindGroup; 2] {
        [0, 1].map(|index| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("feedback bind group #{index}")),
                layout: &self.sampled_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&pair.targets[index].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        })
    }
}

/// The two render pipelines of a frame: composite into the write buffer,
/// then blit it to the surface.
pub(crate) struct RenderPipelines {
    pub effect: wgpu::RenderPipeline,
    pub blit: wgpu::RenderPipeline,
}

impl RenderPipelines {
    pub(crate) fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self> {
        let effect_module =
            compile_effect_shader(device).context("failed to compile composite shader")?;
        let blit_module = compile_blit_shader(device).context("failed to compile blit shader")?;

        let effect_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effect pipeline layout"),
            bind_group_layouts: &[
                &layouts.uniform_layout,
                &layouts.channel_layout,
                &layouts.sampled_layout,
            ],
            push_constant_ranges: &[],
        });
        // The composite pass always renders offscreen at one sample; MSAA
        // applies only to the display blit.
        let effect = create_pipeline(
            device,
            "effect pipeline",
            &effect_layout,
            &layouts.vertex_module,
            &effect_module,
            FEEDBACK_FORMAT,
            1,
        );

        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit pipeline layout"),
            bind_group_layouts: &[&layouts.sampled_layout],
            push_constant_ranges: &[],
        });
        let blit = create_pipeline(
            device,
            "blit pipeline",
            &blit_layout,
            &layouts.vertex_module,
            &blit_module,
            surface_format,
            sample_count,
        );

        Ok(Self { effect, blit })
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn sampled_texture_entries(pairs: u32) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(pairs as usize * 2);
    for index in 0..pairs {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}
