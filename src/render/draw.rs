// Per-tick drawing.
//
// Free functions over `&mut RenderState` rather than methods on a mutable
// object: every call site makes it obvious that GPU state is being touched,
// and everything here must run on the render context.

use std::borrow::Cow;

use tracing::debug;

use crate::diagnostics::fps::FpsCounter;
use crate::error::{PipelineError, Result};
use crate::frame::handoff::FrameSlot;
use crate::frame::CanonicalFrame;
use crate::render::matrix::{aspect_scale, texture_transform};
use crate::render::state::{FrameUniforms, RenderSettings, RenderState, TexturePath};

/// wgpu requires texture-copy rows aligned to this many bytes.
const COPY_ALIGNMENT: u32 = 256;

fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Pad tightly-packed rows out to the copy alignment. Borrows when the
/// stride already conforms.
fn pad_rows(data: &[u8], stride: u32, height: u32) -> (u32, Cow<'_, [u8]>) {
    let aligned = align_up(stride, COPY_ALIGNMENT);
    if aligned == stride {
        return (stride, Cow::Borrowed(data));
    }
    let mut padded = Vec::with_capacity((aligned * height) as usize);
    for row in 0..height as usize {
        let start = row * stride as usize;
        let end = (start + stride as usize).min(data.len());
        if start < data.len() {
            padded.extend_from_slice(&data[start..end]);
        }
        padded.resize((row + 1) * aligned as usize, 0);
    }
    (aligned, Cow::Owned(padded))
}

/// Reconfigure the surface after a resize. Only the viewport/aspect
/// computation is affected; buffer layouts never change here.
pub fn resize(state: &mut RenderState, width: u32, height: u32) {
    state.config.width = width.max(1);
    state.config.height = height.max(1);
    state.surface.configure(&state.device, &state.config);
    debug!("surface resized to {}x{}", width, height);
}

/// Recreate the frame texture and bind group when upload dimensions change.
fn ensure_texture(state: &mut RenderState, width: u32, height: u32) {
    if state.frame_width == width && state.frame_height == height && state.texture.is_some() {
        return;
    }

    let texture = state.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("frame-texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: state.path.format(),
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = state.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame-bind-group"),
        layout: &state.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: state.uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&state.sampler),
            },
        ],
    });

    state.texture = Some(texture);
    state.bind_group = Some(bind_group);
    state.frame_width = width;
    state.frame_height = height;
    debug!("frame texture recreated at {}x{}", width, height);
}

/// Upload a canonical frame into the active texture.
fn upload_frame(state: &mut RenderState, frame: &CanonicalFrame) {
    let (width, height) = (frame.upload_width, frame.upload_height);
    ensure_texture(state, width, height);

    let bytes: Cow<'_, [u8]> = match state.path {
        TexturePath::R8 => Cow::Borrowed(frame.data.as_slice()),
        TexturePath::Rgba8 => {
            // Expand gray to four channels; the shader still reads `.r`.
            let scratch = &mut state.rgba_scratch;
            scratch.clear();
            scratch.reserve(frame.data.len() * 4);
            for &g in &frame.data {
                scratch.extend_from_slice(&[g, g, g, 255]);
            }
            Cow::Borrowed(&state.rgba_scratch[..])
        }
    };

    let stride = width * state.path.bytes_per_pixel();
    let (bytes_per_row, data) = pad_rows(&bytes, stride, height);

    if let Some(texture) = state.texture.as_ref() {
        state.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Render one tick: consume the newest frame (if any), upload, draw, present.
///
/// No frame, or a frame with degenerate dimensions, clears the surface and
/// returns without drawing or ticking the estimator (transient-skip).
pub fn render_tick(
    state: &mut RenderState,
    slot: &FrameSlot,
    settings: &RenderSettings,
    fps: &mut FpsCounter,
) -> Result<()> {
    let frame = slot.peek_latest();
    let drawable = frame
        .as_ref()
        .is_some_and(|f| f.upload_width > 0 && f.upload_height > 0);

    if let Some(frame) = frame.as_ref().filter(|_| drawable) {
        upload_frame(state, frame);

        // Flip mode is read exactly once per tick so a host toggle cannot
        // tear between the matrix and the draw.
        let flip = settings.vertical_flip();
        let xform = texture_transform(frame.rotation_degrees, flip);
        let (sx, sy) = aspect_scale(
            frame.upload_width,
            frame.upload_height,
            state.config.width,
            state.config.height,
        );
        let uniforms = FrameUniforms {
            tex_xform: xform.to_uniform(),
            scale: [sx, sy],
            _pad: [0.0, 0.0],
        };
        state
            .queue
            .write_buffer(&state.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    let output = state
        .surface
        .get_current_texture()
        .map_err(|e| PipelineError::SurfaceLost(e.to_string()))?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("frame-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
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
            multiview_mask: None,
        });

        if drawable {
            if let Some(bind_group) = state.bind_group.as_ref() {
                pass.set_pipeline(&state.pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
                pass.draw(0..4, 0..1);
            }
        }
    }

    state.queue.submit(std::iter::once(encoder.finish()));
    output.present();

    if drawable {
        fps.tick();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_multiples() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }

    #[test]
    fn pad_rows_borrows_when_aligned() {
        let data = vec![7u8; 256 * 2];
        let (stride, padded) = pad_rows(&data, 256, 2);
        assert_eq!(stride, 256);
        assert!(matches!(padded, Cow::Borrowed(_)));
    }

    #[test]
    fn pad_rows_zero_fills_to_alignment() {
        let data = vec![7u8; 10 * 2];
        let (stride, padded) = pad_rows(&data, 10, 2);
        assert_eq!(stride, 256);
        assert_eq!(padded.len(), 512);
        assert_eq!(&padded[..10], &data[..10]);
        assert!(padded[10..256].iter().all(|&b| b == 0));
        assert_eq!(&padded[256..266], &data[10..20]);
    }

    #[test]
    fn pad_rows_handles_truncated_source() {
        // Final row shorter than the stride: copy what exists, zero the rest.
        let data = vec![9u8; 15];
        let (stride, padded) = pad_rows(&data, 10, 2);
        assert_eq!(stride, 256);
        assert_eq!(padded.len(), 512);
        assert_eq!(&padded[256..261], &[9, 9, 9, 9, 9]);
        assert!(padded[261..].iter().all(|&b| b == 0));
    }
}
