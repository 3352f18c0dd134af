use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use winit::dpi::PhysicalSize;

use vizconfig::EffectConfig;

use crate::runtime::TimeSample;
use crate::types::{Antialiasing, TextSource};

use super::channels::StaticChannels;
use super::context::GpuContext;
use super::feedback::FeedbackPair;
use super::pipeline::{PipelineLayouts, RenderPipelines};
use super::uniforms::EffectUniforms;

/// Per-frame inputs gathered by the window loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameParams {
    pub sample: TimeSample,
    /// Playhead-sampled drive value in [0, 1].
    pub drive: f32,
    /// Timeline progress in [0, 1].
    pub progress: f32,
}

/// All GPU resources for one window. Creation is fallible and explicit;
/// teardown happens on drop.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    pipelines: RenderPipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    _channels: StaticChannels,
    channel_bind_group: wgpu::BindGroup,
    feedback: FeedbackPair,
    feedback_sampler: wgpu::Sampler,
    feedback_bind_groups: [wgpu::BindGroup; 2],
    msaa_target: Option<wgpu::TextureView>,
    params: EffectConfig,
    clear_pending: bool,
    frames_rendered: u64,
    stats_window_start: Instant,
    stats_window_frames: u32,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        text: &TextSource,
        drive: &[f32],
        params: &EffectConfig,
        antialiasing: Antialiasing,
    ) -> Result<Self>
    where
        T: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle,
    {
        let context = GpuContext::new(target, size, antialiasing)?;
        let layouts = PipelineLayouts::new(&context.device)?;
        let pipelines = RenderPipelines::new(
            &context.device,
            &layouts,
            context.surface_format,
            context.sample_count,
        )?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect uniforms"),
            size: std::mem::size_of::<EffectUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let channels = StaticChannels::create(
            &context.device,
            &context.queue,
            text,
            (context.size.width, context.size.height),
            drive,
        )?;
        let channel_bind_group = layouts.bind_static_channels(&context.device, &channels);

        let feedback_sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("feedback sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let feedback = FeedbackPair::new(&context.device, context.size.width, context.size.height);
        let feedback_bind_groups =
            layouts.bind_feedback_views(&context.device, &feedback, &feedback_sampler);

        let msaa_target = create_msaa_target(&context);

        Ok(Self {
            context,
            layouts,
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            _channels: channels,
            channel_bind_group,
            feedback,
            feedback_sampler,
            feedback_bind_groups,
            msaa_target,
            params: params.clone(),
            // Both feedback buffers start undefined; clear before the
            // first composite pass samples them.
            clear_pending: true,
            frames_rendered: 0,
            stats_window_start: Instant::now(),
            stats_window_frames: 0,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Recreates the surface configuration and both feedback buffers.
    /// The trails reset to black; resizing never stretches old frames.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.feedback =
            FeedbackPair::new(&self.context.device, new_size.width, new_size.height);
        self.feedback_bind_groups = self.layouts.bind_feedback_views(
            &self.context.device,
            &self.feedback,
            &self.feedback_sampler,
        );
        self.msaa_target = create_msaa_target(&self.context);
        self.clear_pending = true;
        tracing::debug!(width = new_size.width, height = new_size.height, "resized surface");
    }

    /// Drops accumulated trails at the start of the next frame.
    pub(crate) fn clear_feedback(&mut self) {
        self.clear_pending = true;
    }

    /// Renders one frame: composite into the write buffer, blit it to
    /// the surface, swap the pair, present.
    pub(crate) fn render(&mut self, frame: FrameParams) -> Result<(), wgpu::SurfaceError> {
        let surface_texture = self.context.surface.get_current_texture()?;
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = EffectUniforms::new(
            &self.params,
            self.context.size.width,
            self.context.size.height,
            frame.sample,
            frame.drive,
            frame.progress,
        );
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        if self.clear_pending {
            self.feedback.clear(&mut encoder);
            self.clear_pending = false;
        }

        // Composite pass: sample the read buffer, render the write buffer.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.feedback.write_view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.effect);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.channel_bind_group, &[]);
            pass.set_bind_group(
                2,
                &self.feedback_bind_groups[self.feedback.index.read_index()],
                &[],
            );
            pass.draw(0..3, 0..1);
        }

        // Display pass: blit the freshly written buffer to the surface.
        {
            let (attachment_view, resolve_target) = match &self.msaa_target {
                Some(msaa_view) => (msaa_view, Some(&surface_view)),
                None => (&surface_view, None),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("display pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.blit);
            pass.set_bind_group(
                0,
                &self.feedback_bind_groups[self.feedback.index.write_index()],
                &[],
            );
            pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        self.feedback.swap();
        surface_texture.present();

        self.frames_rendered += 1;
        self.stats_window_frames += 1;
        let window_elapsed = self.stats_window_start.elapsed();
        if window_elapsed.as_secs() >= 5 {
            let fps = self.stats_window_frames as f64 / window_elapsed.as_secs_f64();
            tracing::debug!(
                fps = format!("{fps:.1}"),
                total_frames = self.frames_rendered,
                "render stats"
            );
            self.stats_window_start = Instant::now();
            self.stats_window_frames = 0;
        }

        Ok(())
    }

    /// Reads the last composited frame back and writes it as a PNG named
    /// after the frame counter. Must be called after at least one frame.
    pub(crate) fn export_png(&self, directory: &Path) -> Result<PathBuf> {
        if self.frames_rendered == 0 {
            return Err(anyhow!("no frame has been rendered yet"));
        }

        let texture = self.feedback.last_written_texture();
        let width = self.context.size.width;
        let height = self.context.size.height;
        let bytes_per_pixel = 4u32;
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("export readback"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("export encoder"),
                });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(Some(encoder.finish()));

        let (sender, receiver) = crossbeam_channel::bounded(1);
        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.context
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("device poll failed during export: {err:?}"))?;
        receiver
            .recv()
            .context("export readback channel closed")?
            .map_err(|err| anyhow!("failed to map export buffer: {err:?}"))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in mapped.chunks_exact(padded_bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
        drop(mapped);
        buffer.unmap();

        let image = image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("export buffer has unexpected length"))?;
        std::fs::create_dir_all(directory).with_context(|| {
            format!("failed to create export directory {}", directory.display())
        })?;
        let path = directory.join(format!("typestorm-{:06}.png", self.frames_rendered));
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "exported frame");
        Ok(path)
    }
}

/// Multisampled intermediate for the display pass when MSAA is active.
fn create_msaa_target(context: &GpuContext) -> Option<wgpu::TextureView> {
    if context.sample_count <= 1 {
        return None;
    }
    let texture = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("msaa target"),
        size: wgpu::Extent3d {
            width: context.size.width.max(1),
            height: context.size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: context.sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: context.surface_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}
