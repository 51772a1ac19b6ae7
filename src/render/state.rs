// One-time GPU setup.
//
// All handles in RenderState belong to the render context; they are created
// here once, mutated per tick by the free functions in `draw`, and released
// when the state is dropped on surface teardown. A failure anywhere in this
// file is setup-fatal: a pipeline that cannot build cannot render.

use std::sync::atomic::{AtomicBool, Ordering};

use wgpu::util::DeviceExt;

use crate::error::{PipelineError, Result};

/// Shader: unit quad scaled in the vertex stage, texture coordinates
/// transformed by a 3x3 matrix in the fragment stage, sampled gray value
/// replicated into all colour channels. One shader serves both the R8 and
/// the expanded RGBA path since only `.r` is read.
const SHADER_SRC: &str = r#"
struct FrameUniforms {
    tex_xform: mat3x3<f32>,
    scale: vec2<f32>,
    _pad: vec2<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: FrameUniforms;
@group(0) @binding(1) var frame_texture: texture_2d<f32>;
@group(0) @binding(2) var frame_sampler: sampler;

struct VertexInput {
    @location(0) pos: vec2<f32>,
    @location(1) tex: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) tex: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.position = vec4<f32>(input.pos * uniforms.scale, 0.0, 1.0);
    output.tex = input.tex;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let t = uniforms.tex_xform * vec3<f32>(input.tex, 1.0);
    let g = textureSample(frame_texture, frame_sampler, t.xy).r;
    return vec4<f32>(g, g, g, 1.0);
}
"#;

/// Uniform block matching `FrameUniforms` in the shader (std140: mat3x3 is
/// three vec4-aligned columns).
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FrameUniforms {
    pub tex_xform: [[f32; 4]; 3],
    pub scale: [f32; 2],
    pub _pad: [f32; 2],
}

/// One vertex of the fixed unit quad.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    tex: [f32; 2],
}

/// Two triangles as a strip covering the unit quad; never changes.
const QUAD: [Vertex; 4] = [
    Vertex { pos: [-1.0, -1.0], tex: [0.0, 0.0] },
    Vertex { pos: [1.0, -1.0], tex: [1.0, 0.0] },
    Vertex { pos: [-1.0, 1.0], tex: [0.0, 1.0] },
    Vertex { pos: [1.0, 1.0], tex: [1.0, 1.0] },
];

const VERTEX_ATTRS: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

/// How gray frames travel to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexturePath {
    /// Single-channel upload, one byte per pixel.
    R8,
    /// Expanded four-channel upload for backends without usable R8
    /// textures; visually identical to the R8 path.
    Rgba8,
}

impl TexturePath {
    pub(crate) fn format(self) -> wgpu::TextureFormat {
        match self {
            TexturePath::R8 => wgpu::TextureFormat::R8Unorm,
            TexturePath::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    pub(crate) fn bytes_per_pixel(self) -> u32 {
        match self {
            TexturePath::R8 => 1,
            TexturePath::Rgba8 => 4,
        }
    }
}

/// Render-time configuration mutated by the host and read once per tick.
#[derive(Default)]
pub struct RenderSettings {
    vertical_flip: AtomicBool,
}

impl RenderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vertical_flip(&self, flip: bool) {
        self.vertical_flip.store(flip, Ordering::Relaxed);
    }

    pub fn vertical_flip(&self) -> bool {
        self.vertical_flip.load(Ordering::Relaxed)
    }
}

/// Persistent GPU objects for the frame renderer.
///
/// Owned exclusively by the render context; the drawing entry points in
/// [`crate::render::draw`] take this by mutable reference instead of hiding
/// the mutation behind methods, so thread affinity stays explicit.
pub struct RenderState {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) surface: wgpu::Surface<'static>,
    pub(crate) config: wgpu::SurfaceConfiguration,

    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) sampler: wgpu::Sampler,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) vertex_buffer: wgpu::Buffer,

    // Recreated whenever the uploaded frame dimensions change.
    pub(crate) texture: Option<wgpu::Texture>,
    pub(crate) bind_group: Option<wgpu::BindGroup>,
    pub(crate) frame_width: u32,
    pub(crate) frame_height: u32,

    pub(crate) path: TexturePath,
    pub(crate) rgba_scratch: Vec<u8>,
}

impl RenderState {
    /// Build all GPU resources against a caller-provided surface.
    ///
    /// The instance must be the one that created the surface. Failures here
    /// are unrecoverable initialisation errors.
    pub async fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| PipelineError::RenderInit(format!("no suitable adapter: {e}")))?;

        tracing::info!("using GPU adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| PipelineError::RenderInit(format!("device request failed: {e}")))?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let path = select_texture_path(&adapter);
        tracing::info!(?path, "frame texture upload path selected");

        // NEAREST filtering: the frame is a permutation of source pixels and
        // linear interpolation across rotated rows produces artifacts.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("frame-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("frame-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SRC.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("frame-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("frame-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRS,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame-quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        tracing::info!("renderer initialised ({}x{})", config.width, config.height);

        Ok(Self {
            device,
            queue,
            surface,
            config,
            pipeline,
            bind_group_layout,
            sampler,
            uniform_buffer,
            vertex_buffer,
            texture: None,
            bind_group: None,
            frame_width: 0,
            frame_height: 0,
            path,
            rgba_scratch: Vec::new(),
        })
    }

    /// Blocking wrapper for hosts without an async runtime.
    pub fn new_blocking(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        pollster::block_on(Self::new(instance, surface, width, height))
    }
}

/// Prefer single-channel textures; fall back to expanded RGBA when the
/// adapter cannot bind and filter R8.
fn select_texture_path(adapter: &wgpu::Adapter) -> TexturePath {
    let features = adapter.get_texture_format_features(wgpu::TextureFormat::R8Unorm);
    let needed = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
    if features.allowed_usages.contains(needed)
        && features
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
    {
        TexturePath::R8
    } else {
        TexturePath::Rgba8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_is_sixty_four_bytes() {
        // Must match the WGSL struct layout exactly.
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 64);
    }

    #[test]
    fn quad_covers_unit_square() {
        assert_eq!(QUAD.len(), 4);
        assert_eq!(QUAD[0].pos, [-1.0, -1.0]);
        assert_eq!(QUAD[3].pos, [1.0, 1.0]);
        assert_eq!(QUAD[0].tex, [0.0, 0.0]);
        assert_eq!(QUAD[3].tex, [1.0, 1.0]);
    }

    #[test]
    fn texture_paths_describe_their_formats() {
        assert_eq!(TexturePath::R8.bytes_per_pixel(), 1);
        assert_eq!(TexturePath::Rgba8.bytes_per_pixel(), 4);
        assert_eq!(TexturePath::R8.format(), wgpu::TextureFormat::R8Unorm);
        assert_eq!(TexturePath::Rgba8.format(), wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn settings_default_to_no_flip() {
        let settings = RenderSettings::new();
        assert!(!settings.vertical_flip());
        settings.set_vertical_flip(true);
        assert!(settings.vertical_flip());
    }
}
