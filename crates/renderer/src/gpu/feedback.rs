/// Pixel format of the offscreen feedback targets. `COPY_SRC` is kept on
/// so the export path can read the last composited frame back.
pub(crate) const FEEDBACK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Which of the two buffers is currently the read source. Kept separate
/// from the GPU resources so the swap convention is testable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PingPong {
    read: usize,
}

impl PingPong {
    pub(crate) fn new() -> Self {
        Self { read: 0 }
    }

    pub(crate) fn read_index(&self) -> usize {
        self.read
    }

    pub(crate) fn write_index(&self) -> usize {
        1 - self.read
    }

    /// The buffer written this pass becomes next pass's read source.
    pub(crate) fn swap(&mut self) {
        self.read = 1 - self.read;
    }
}

pub(crate) struct FeedbackTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// The ping-pong pair. Within one frame exactly one target is sampled
/// and the other rendered to; resizing recreates both rather than
/// resizing in place, which also resets the accumulated trails.
pub(crate) struct FeedbackPair {
    pub targets: [FeedbackTarget; 2],
    pub index: PingPong,
}

impl FeedbackPair {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let targets = [
            create_target(device, width, height, 0),
            create_target(device, width, height, 1),
        ];
        Self {
            targets,
            index: PingPong::new(),
        }
    }

    pub(crate) fn write_view(&self) -> &wgpu::TextureView {
        &self.targets[self.index.write_index()].view
    }

    /// Texture holding the most recently composited frame. Valid only
    /// after a swap, when the freshly written buffer has become the read
    /// source.
    pub(crate) fn last_written_texture(&self) -> &wgpu::Texture {
        &self.targets[self.index.read_index()].texture
    }

    pub(crate) fn swap(&mut self) {
        self.index.swap();
    }

    /// Clears both buffers to black, dropping all accumulated trails.
    pub(crate) fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        for target in &self.targets {
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("feedback clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
    }
}

fn create_target(device: &wgpu::Device, width: u32, height: u32, index: usize) -> FeedbackTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("feedback target #{index}")),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FEEDBACK_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    FeedbackTarget { texture, view }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_and_write_are_always_distinct() {
        let mut index = PingPong::new();
        for _ in 0..16 {
            assert_ne!(index.read_index(), index.write_index());
            index.swap();
        }
    }

    #[test]
    fn written_buffer_becomes_next_read_source() {
        let mut index = PingPong::new();
        for _ in 0..16 {
            let written = index.write_index();
            index.swap();
            assert_eq!(index.read_index(), written);
        }
    }
}
