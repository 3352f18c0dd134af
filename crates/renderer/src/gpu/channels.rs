use std::path::Path;

use anyhow::{Context, Result};
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::types::TextSource;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Glyph cell plus one column of spacing.
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Fraction of the canvas width the label may occupy.
const FIT_WIDTH: f32 = 0.9;
/// Cap on label height relative to the canvas.
const FIT_HEIGHT: f32 = 0.7;

/// A texture with its view and sampler, bound as one shader channel.
pub(crate) struct ChannelTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// The static channels of the composite pass: the text mask and the 1-D
/// drive series. Neither changes after startup.
pub(crate) struct StaticChannels {
    pub text: ChannelTexture,
    pub drive: ChannelTexture,
}

impl StaticChannels {
    pub(crate) fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        text: &TextSource,
        surface_size: (u32, u32),
        drive: &[f32],
    ) -> Result<Self> {
        let text = match text {
            TextSource::Label(label) => {
                let (width, height) = surface_size;
                let pixels = rasterize_label(label, width, height);
                create_text_texture(device, queue, &pixels, width, height)
            }
            TextSource::MaskPng(path) => load_mask_texture(device, queue, path)?,
        };
        let drive = create_drive_texture(device, queue, drive);
        Ok(Self { text, drive })
    }
}

fn create_text_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> ChannelTexture {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("text mask"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        pixels,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = linear_clamp_sampler(device, "text sampler");
    ChannelTexture {
        _texture: texture,
        view,
        sampler,
    }
}

fn load_mask_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
) -> Result<ChannelTexture> {
    let image = image::open(path)
        .with_context(|| format!("failed to load text mask at {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    tracing::debug!(path = %path.display(), width, height, "loaded text mask");
    Ok(create_text_texture(device, queue, image.as_raw(), width, height))
}

/// Uploads the shaped drive series as a width = len, height = 1 single
/// channel texture, sampled by timeline x in the composite pass.
fn create_drive_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    samples: &[f32],
) -> ChannelTexture {
    let data: Vec<u8> = if samples.is_empty() {
        vec![0]
    } else {
        samples
            .iter()
            .map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("drive series"),
            size: wgpu::Extent3d {
                width: data.len() as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = linear_clamp_sampler(device, "drive sampler");
    ChannelTexture {
        _texture: texture,
        view,
        sampler,
    }
}

fn linear_clamp_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Rasterizes a label into an opaque-black RGBA canvas with white glyphs
/// from the built-in 5x7 block font. The label is scaled to fit 90% of
/// the canvas width, capped at 70% of its height, and centered.
pub(crate) fn rasterize_label(text: &str, width: u32, height: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
    // Opaque black background so alpha reads 1.0 everywhere, matching
    // the composite pass's expectations.
    for pixel in pixels.chunks_exact_mut(4) {
        pixel[3] = 255;
    }

    let glyphs: Vec<Option<[u8; GLYPH_HEIGHT as usize]>> =
        text.chars().map(glyph_rows).collect();
    if glyphs.is_empty() || width == 0 || height == 0 {
        return pixels;
    }

    let cells_wide = (glyphs.len() as u32) * GLYPH_ADVANCE - 1;
    let scale_x = (width as f32 * FIT_WIDTH / cells_wide as f32).floor();
    let scale_y = (height as f32 * FIT_HEIGHT / GLYPH_HEIGHT as f32).floor();
    let scale = scale_x.min(scale_y).max(1.0) as u32;

    let label_width = cells_wide * scale;
    let label_height = GLYPH_HEIGHT * scale;
    let origin_x = (width.saturating_sub(label_width)) / 2;
    let origin_y = (height.saturating_sub(label_height)) / 2;

    for (slot, rows) in glyphs.iter().enumerate() {
        let Some(rows) = rows else {
            continue;
        };
        let glyph_x = origin_x + (slot as u32) * GLYPH_ADVANCE * scale;
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
                    continue;
                }
                fill_block(
                    &mut pixels,
                    width,
                    height,
                    glyph_x + column * scale,
                    origin_y + (row as u32) * scale,
                    scale,
                );
            }
        }
    }

    pixels
}

fn fill_block(pixels: &mut [u8], width: u32, height: u32, x: u32, y: u32, scale: u32) {
    for dy in 0..scale {
        let py = y + dy;
        if py >= height {
            break;
        }
        for dx in 0..scale {
            let px = x + dx;
            if px >= width {
                break;
            }
            let offset = ((py as usize) * (width as usize) + (px as usize)) * 4;
            pixels[offset..offset + 4].copy_from_slice(&[255, 255, 255, 255]);
        }
    }
}

/// Row bitmaps for the built-in font, 5 bits per row, top row first.
/// Lowercase maps onto uppercase; unknown characters render as a blank
/// advance.
fn glyph_rows(ch: char) -> Option<[u8; 7]> {
    let ch = ch.to_ascii_uppercase();
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        '\'' => [0b00100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000],
        ':' => [0b00000, 0b00110, 0b00110, 0b00000, 0b00110, 0b00110, 0b00000],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_pixel_count(pixels: &[u8]) -> usize {
        pixels
            .chunks_exact(4)
            .filter(|pixel| pixel[0] == 255 && pixel[1] == 255 && pixel[2] == 255)
            .count()
    }

    #[test]
    fn label_canvas_has_expected_size_and_opaque_alpha() {
        let pixels = rasterize_label("HI", 320, 240);
        assert_eq!(pixels.len(), 320 * 240 * 4);
        assert!(pixels.chunks_exact(4).all(|pixel| pixel[3] == 255));
    }

    #[test]
    fn label_produces_white_glyph_pixels() {
        let pixels = rasterize_label("TYPESTORM", 640, 480);
        assert!(white_pixel_count(&pixels) > 0);
    }

    #[test]
    fn empty_label_renders_a_black_canvas() {
        let pixels = rasterize_label("", 64, 64);
        assert_eq!(white_pixel_count(&pixels), 0);
    }

    #[test]
    fn label_height_stays_under_the_cap() {
        let pixels = rasterize_label("A", 1000, 100);
        let width = 1000usize;
        let mut min_row = usize::MAX;
        let mut max_row = 0usize;
        for (index, pixel) in pixels.chunks_exact(4).enumerate() {
            if pixel[0] == 255 && pixel[1] == 255 {
                let row = index / width;
                min_row = min_row.min(row);
                max_row = max_row.max(row);
            }
        }
        assert!(max_row - min_row + 1 <= 70, "label exceeds 70% of height");
    }

    #[test]
    fn label_is_horizontally_centered() {
        let width = 300usize;
        let pixels = rasterize_label("O", width as u32, 100);
        let mut min_col = usize::MAX;
        let mut max_col = 0usize;
        for (index, pixel) in pixels.chunks_exact(4).enumerate() {
            if pixel[0] == 255 {
                let col = index % width;
                min_col = min_col.min(col);
                max_col = max_col.max(col);
            }
        }
        let left = min_col;
        let right = width - 1 - max_col;
        assert!(left.abs_diff(right) <= 6, "left {left} right {right}");
    }

    #[test]
    fn lowercase_maps_onto_uppercase_glyphs() {
        assert_eq!(glyph_rows('q'), glyph_rows('Q'));
    }

    #[test]
    fn unknown_characters_advance_blank() {
        assert!(glyph_rows('%').is_none());
        let with_unknown = rasterize_label("A%A", 320, 240);
        let without = rasterize_label("A A", 320, 240);
        assert_eq!(
            white_pixel_count(&with_unknown),
            white_pixel_count(&without)
        );
    }

    #[test]
    fn every_letter_and_digit_has_a_glyph() {
        for ch in ('A'..='Z').chain('0'..='9') {
            assert!(glyph_rows(ch).is_some(), "missing glyph for {ch}");
        }
    }
}
