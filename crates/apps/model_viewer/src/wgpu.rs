use ::wgpu::util::DeviceExt;
use gpu::{RenderCommand, RenderFrame};
use scene::World;
use scene::components::{Material, MaterialKind, Mesh, ShadowFlags};
use std::borrow::Cow;

use crate::session::DrawContext;

#[derive(Debug, thiserror::Error)]
pub enum GpuInitError {
    #[error("surface error: {0}")]
    Surface(#[from] ::wgpu::CreateSurfaceError),
    #[error("adapter error: {0}")]
    Adapter(#[from] ::wgpu::RequestAdapterError),
    #[error("device error: {0}")]
    Device(#[from] ::wgpu::RequestDeviceError),
    #[error("surface reports no texture formats")]
    NoSurfaceFormat,
}

/// Side of the square sun depth map, in texels.
const SHADOW_MAP_SIZE: u32 = 1024;
/// Depth offset applied before the shadow comparison.
const SHADOW_DEPTH_BIAS: f32 = 0.0015;
const SHADOW_FORMAT: ::wgpu::TextureFormat = ::wgpu::TextureFormat::Depth32Float;

const MODEL_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    // x: shadows enabled, y: depth bias, z: shadow map texel size.
    shadow: vec4<f32>,
    ambient: vec4<f32>,
    sun_dir: vec4<f32>,
    sun_color: vec4<f32>,
    sky_color: vec4<f32>,
    ground_color: vec4<f32>,
    // w: range, 0 for unbounded.
    point_position: vec4<f32>,
    point_color: vec4<f32>,
};

struct Object {
    model: mat4x4<f32>,
    base_color: vec4<f32>,
    emissive: vec4<f32>,
    // x: 0 lit, 1 emissive, 2 shadow catcher. y: catcher radius.
    // z: 1 when the object receives shadows.
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(0) @binding(1)
var shadow_map: texture_depth_2d;

@group(0) @binding(2)
var shadow_sampler: sampler_comparison;

@group(1) @binding(0)
var<uniform> object: Object;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) local_pos: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    let world = object.model * vec4<f32>(position, 1.0);
    var out: VsOut;
    out.pos = globals.view_proj * world;
    out.world_pos = world.xyz;
    // Uniform scale only, so the model matrix leaves directions alone.
    out.normal = normal;
    out.local_pos = position;
    return out;
}

// Fraction of sunlight reaching `world_pos`: 1 lit, 0 fully shadowed.
fn sun_visibility(world_pos: vec3<f32>) -> f32 {
    if (globals.shadow.x < 0.5) {
        return 1.0;
    }
    let clip = globals.light_view_proj * vec4<f32>(world_pos, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0) {
        return 1.0;
    }
    let depth = ndc.z - globals.shadow.y;
    var sum = 0.0;
    for (var y = -1; y <= 1; y = y + 1) {
        for (var x = -1; x <= 1; x = x + 1) {
            let offset = vec2<f32>(f32(x), f32(y)) * globals.shadow.z;
            sum = sum + textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, depth);
        }
    }
    return sum / 9.0;
}

@fragment
fn fs_main(frag: VsOut) -> @location(0) vec4<f32> {
    let mode = object.params.x;
    var visibility = 1.0;
    if (object.params.z > 0.5) {
        visibility = sun_visibility(frag.world_pos);
    }
    if (mode > 1.5) {
        // Only the shadowed part of the catcher is drawn; the rim fades out.
        let r = length(frag.local_pos.xz) / max(object.params.y, 0.0001);
        let rim = 1.0 - smoothstep(0.8, 1.0, r);
        let a = object.base_color.a * (1.0 - visibility) * rim;
        return vec4<f32>(0.0, 0.0, 0.0, a);
    }
    if (mode > 0.5) {
        return vec4<f32>(object.emissive.rgb, 1.0);
    }

    let n = normalize(frag.normal);
    let hemi = mix(globals.ground_color.rgb, globals.sky_color.rgb, n.y * 0.5 + 0.5);
    let sun = max(dot(n, -globals.sun_dir.xyz), 0.0) * globals.sun_color.rgb * visibility;

    let to_light = globals.point_position.xyz - frag.world_pos;
    let dist = length(to_light);
    let range = globals.point_position.w;
    var atten = 1.0;
    if (range > 0.0) {
        let falloff = clamp(1.0 - dist / range, 0.0, 1.0);
        atten = falloff * falloff;
    }
    let glow = max(dot(n, to_light / max(dist, 0.0001)), 0.0) * atten * globals.point_color.rgb;

    let lit = globals.ambient.rgb + hemi + sun + glow;
    let rgb = object.base_color.rgb * lit + object.emissive.rgb;
    let a = object.base_color.a;
    return vec4<f32>(rgb * a, a);
}
"#;

const SHADOW_SHADER: &str = r#"
struct ShadowGlobals {
    light_view_proj: mat4x4<f32>,
};

struct Object {
    model: mat4x4<f32>,
    base_color: vec4<f32>,
    emissive: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> shadow_globals: ShadowGlobals;

@group(1) @binding(0)
var<uniform> object: Object;

@vertex
fn vs_shadow(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return shadow_globals.light_view_proj * object.model * vec4<f32>(position, 1.0);
}
"#;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    shadow: [f32; 4],
    ambient: [f32; 4],
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
    point_position: [f32; 4],
    point_color: [f32; 4],
}

fn vec4(v: [f32; 3], w: f32) -> [f32; 4] {
    [v[0], v[1], v[2], w]
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

impl Globals {
    fn new(frame: &RenderFrame) -> Self {
        let lighting = &frame.lighting;
        let (light_view_proj, enabled) = match &frame.shadow {
            Some(shadow) => (shadow.to_cols_array_2d(), 1.0),
            None => (IDENTITY, 0.0),
        };
        Self {
            view_proj: frame.view_proj,
            light_view_proj,
            shadow: [
                enabled,
                SHADOW_DEPTH_BIAS,
                1.0 / SHADOW_MAP_SIZE as f32,
                0.0,
            ],
            ambient: vec4(lighting.ambient, 0.0),
            sun_dir: vec4(lighting.sun_dir, 0.0),
            sun_color: vec4(lighting.sun_color, 0.0),
            sky_color: vec4(lighting.sky_color, 0.0),
            ground_color: vec4(lighting.ground_color, 0.0),
            point_position: vec4(lighting.point_position, lighting.point_range),
            point_color: vec4(lighting.point_color, 0.0),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    base_color: [f32; 4],
    emissive: [f32; 4],
    params: [f32; 4],
}

impl ObjectUniform {
    fn new(
        model: [[f32; 4]; 4],
        material: &Material,
        shadows: ShadowFlags,
        catcher_radius: f32,
    ) -> Self {
        let (mode, base_color) = match material.kind {
            MaterialKind::Standard => (0.0, material.base_color),
            MaterialKind::Emissive => (1.0, material.base_color),
            MaterialKind::ShadowCatcher { opacity } => (2.0, [0.0, 0.0, 0.0, opacity]),
        };
        Self {
            model,
            base_color,
            emissive: vec4(material.emissive, 0.0),
            params: [
                mode,
                catcher_radius,
                if shadows.receive { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

struct GpuMesh {
    vertex_buffer: ::wgpu::Buffer,
    index_buffer: ::wgpu::Buffer,
    index_count: u32,
    /// Horizontal half extent, used to fade shadow catchers.
    radius: f32,
}

struct ObjectSlot {
    buffer: ::wgpu::Buffer,
    bind_group: ::wgpu::BindGroup,
}

pub struct WgpuContext {
    surface: ::wgpu::Surface<'static>,
    device: ::wgpu::Device,
    queue: ::wgpu::Queue,
    config: ::wgpu::SurfaceConfiguration,
    _canvas: web_sys::HtmlCanvasElement,
    opaque_pipeline: ::wgpu::RenderPipeline,
    translucent_pipeline: ::wgpu::RenderPipeline,
    shadow_pipeline: ::wgpu::RenderPipeline,
    globals_buffer: ::wgpu::Buffer,
    globals_bind_group: ::wgpu::BindGroup,
    shadow_globals_buffer: ::wgpu::Buffer,
    shadow_globals_bind_group: ::wgpu::BindGroup,
    shadow_view: ::wgpu::TextureView,
    object_layout: ::wgpu::BindGroupLayout,
    depth_view: ::wgpu::TextureView,
    meshes: Vec<GpuMesh>,
    slots: Vec<ObjectSlot>,
    uploaded_revision: Option<u64>,
    // Owned per viewer and dropped with it.
    _instance: ::wgpu::Instance,
}

fn create_depth_view(
    device: &::wgpu::Device,
    config: &::wgpu::SurfaceConfiguration,
) -> ::wgpu::TextureView {
    let tex = device.create_texture(&::wgpu::TextureDescriptor {
        label: Some("viewer-depth"),
        size: ::wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: ::wgpu::TextureDimension::D2,
        format: ::wgpu::TextureFormat::Depth24Plus,
        usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&::wgpu::TextureViewDescriptor::default())
}

fn create_shadow_map(device: &::wgpu::Device) -> ::wgpu::TextureView {
    let tex = device.create_texture(&::wgpu::TextureDescriptor {
        label: Some("viewer-shadow-map"),
        size: ::wgpu::Extent3d {
            width: SHADOW_MAP_SIZE,
            height: SHADOW_MAP_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: ::wgpu::TextureDimension::D2,
        format: SHADOW_FORMAT,
        usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT | ::wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    tex.create_view(&::wgpu::TextureViewDescriptor::default())
}

/// Globals uniform plus the sun depth map and its comparison sampler.
fn globals_layout(device: &::wgpu::Device) -> ::wgpu::BindGroupLayout {
    device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
        label: Some("viewer-globals-bgl"),
        entries: &[
            ::wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: ::wgpu::BindingType::Buffer {
                    ty: ::wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            ::wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: ::wgpu::ShaderStages::FRAGMENT,
                ty: ::wgpu::BindingType::Texture {
                    sample_type: ::wgpu::TextureSampleType::Depth,
                    view_dimension: ::wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            ::wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: ::wgpu::ShaderStages::FRAGMENT,
                ty: ::wgpu::BindingType::Sampler(::wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
    })
}

fn uniform_layout(device: &::wgpu::Device, label: &str) -> ::wgpu::BindGroupLayout {
    device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[::wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: ::wgpu::BindingType::Buffer {
                ty: ::wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn create_pipeline(
    device: &::wgpu::Device,
    layout: &::wgpu::PipelineLayout,
    shader: &::wgpu::ShaderModule,
    format: ::wgpu::TextureFormat,
    translucent: bool,
) -> ::wgpu::RenderPipeline {
    let (label, blend, depth_write_enabled) = if translucent {
        (
            "viewer-translucent-pipeline",
            ::wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            false,
        )
    } else {
        ("viewer-opaque-pipeline", ::wgpu::BlendState::REPLACE, true)
    };
    device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: ::wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[::wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
                step_mode: ::wgpu::VertexStepMode::Vertex,
                attributes: &[
                    ::wgpu::VertexAttribute {
                        format: ::wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    },
                    ::wgpu::VertexAttribute {
                        format: ::wgpu::VertexFormat::Float32x3,
                        offset: 12,
                        shader_location: 1,
                    },
                ],
            }],
        },
        fragment: Some(::wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(::wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: ::wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: ::wgpu::PrimitiveState {
            topology: ::wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: ::wgpu::FrontFace::Ccw,
            // Imported models do not guarantee a winding order.
            cull_mode: None,
            polygon_mode: ::wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(::wgpu::DepthStencilState {
            format: ::wgpu::TextureFormat::Depth24Plus,
            depth_write_enabled,
            depth_compare: ::wgpu::CompareFunction::LessEqual,
            stencil: ::wgpu::StencilState::default(),
            bias: ::wgpu::DepthBiasState::default(),
        }),
        multisample: ::wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn create_shadow_pipeline(
    device: &::wgpu::Device,
    layout: &::wgpu::PipelineLayout,
    shader: &::wgpu::ShaderModule,
) -> ::wgpu::RenderPipeline {
    device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
        label: Some("viewer-shadow-pipeline"),
        layout: Some(layout),
        vertex: ::wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_shadow"),
            compilation_options: Default::default(),
            buffers: &[::wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
                step_mode: ::wgpu::VertexStepMode::Vertex,
                attributes: &[::wgpu::VertexAttribute {
                    format: ::wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                }],
            }],
        },
        fragment: None,
        primitive: ::wgpu::PrimitiveState {
            topology: ::wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: ::wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: ::wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(::wgpu::DepthStencilState {
            format: SHADOW_FORMAT,
            depth_write_enabled: true,
            depth_compare: ::wgpu::CompareFunction::LessEqual,
            stencil: ::wgpu::StencilState::default(),
            bias: ::wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        multisample: ::wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn upload_mesh(device: &::wgpu::Device, mesh: &Mesh) -> GpuMesh {
    let vertices: Vec<Vertex> = mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, position)| Vertex {
            position: *position,
            normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
        })
        .collect();
    let vertex_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
        label: Some("viewer-mesh-vertices"),
        contents: bytemuck::cast_slice(&vertices),
        usage: ::wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
        label: Some("viewer-mesh-indices"),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: ::wgpu::BufferUsages::INDEX,
    });
    let size = mesh.bounds().size();
    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
        radius: (size.x.max(size.z) * 0.5) as f32,
    }
}

impl WgpuContext {
    pub async fn new(canvas: web_sys::HtmlCanvasElement) -> Result<Self, GpuInitError> {
        let width = canvas.width();
        let height = canvas.height();

        let instance = ::wgpu::Instance::new(&::wgpu::InstanceDescriptor {
            backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("viewer-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(GpuInitError::NoSurfaceFormat)?;
        // Transparent canvas: the page shows through around the model.
        let alpha_mode = if caps
            .alpha_modes
            .contains(&::wgpu::CompositeAlphaMode::PreMultiplied)
        {
            ::wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(::wgpu::CompositeAlphaMode::Auto)
        };

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("viewer-model-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(MODEL_SHADER)),
        });

        let shadow_shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("viewer-shadow-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADOW_SHADER)),
        });

        let globals_layout = globals_layout(&device);
        let shadow_globals_layout = uniform_layout(&device, "viewer-shadow-globals-bgl");
        let object_layout = uniform_layout(&device, "viewer-object-bgl");

        let shadow_view = create_shadow_map(&device);
        let shadow_sampler = device.create_sampler(&::wgpu::SamplerDescriptor {
            label: Some("viewer-shadow-sampler"),
            address_mode_u: ::wgpu::AddressMode::ClampToEdge,
            address_mode_v: ::wgpu::AddressMode::ClampToEdge,
            address_mode_w: ::wgpu::AddressMode::ClampToEdge,
            mag_filter: ::wgpu::FilterMode::Linear,
            min_filter: ::wgpu::FilterMode::Linear,
            compare: Some(::wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let globals_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("viewer-globals"),
            contents: bytemuck::bytes_of(&Globals::new(&RenderFrame::default())),
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("viewer-globals-bg"),
            layout: &globals_layout,
            entries: &[
                ::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                ::wgpu::BindGroupEntry {
                    binding: 1,
                    resource: ::wgpu::BindingResource::TextureView(&shadow_view),
                },
                ::wgpu::BindGroupEntry {
                    binding: 2,
                    resource: ::wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let shadow_globals_buffer = device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("viewer-shadow-globals"),
            contents: bytemuck::bytes_of(&IDENTITY),
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
        });
        let shadow_globals_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("viewer-shadow-globals-bg"),
            layout: &shadow_globals_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_globals_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("viewer-pipeline-layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            immediate_size: 0,
        });
        let opaque_pipeline = create_pipeline(&device, &pipeline_layout, &shader, format, false);
        let translucent_pipeline =
            create_pipeline(&device, &pipeline_layout, &shader, format, true);
        let shadow_pipeline_layout =
            device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
                label: Some("viewer-shadow-pipeline-layout"),
                bind_group_layouts: &[&shadow_globals_layout, &object_layout],
                immediate_size: 0,
            });
        let shadow_pipeline = create_shadow_pipeline(&device, &shadow_pipeline_layout, &shadow_shader);

        log::info!("gpu ready: {:?}, {width}x{height}", adapter.get_info().backend);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            _canvas: canvas,
            opaque_pipeline,
            translucent_pipeline,
            shadow_pipeline,
            globals_buffer,
            globals_bind_group,
            shadow_globals_buffer,
            shadow_globals_bind_group,
            shadow_view,
            object_layout,
            depth_view,
            meshes: Vec::new(),
            slots: Vec::new(),
            uploaded_revision: None,
            _instance: instance,
        })
    }

    fn sync_meshes(&mut self, world: &World) {
        if self.uploaded_revision == Some(world.revision()) {
            return;
        }
        self.meshes = world
            .meshes()
            .iter()
            .map(|mesh| upload_mesh(&self.device, mesh))
            .collect();
        self.uploaded_revision = Some(world.revision());
        log::debug!("uploaded {} meshes", self.meshes.len());
    }

    fn ensure_slots(&mut self, count: usize) {
        while self.slots.len() < count {
            let buffer = self.device.create_buffer(&::wgpu::BufferDescriptor {
                label: Some("viewer-object"),
                size: std::mem::size_of::<ObjectUniform>() as u64,
                usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&::wgpu::BindGroupDescriptor {
                label: Some("viewer-object-bg"),
                layout: &self.object_layout,
                entries: &[::wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.slots.push(ObjectSlot { buffer, bind_group });
        }
    }
}

impl DrawContext for WgpuContext {
    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
    }

    fn draw(&mut self, world: &World, frame: &RenderFrame) {
        self.sync_meshes(world);
        self.ensure_slots(frame.commands.len());

        let globals = Globals::new(frame);
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.queue.write_buffer(
            &self.shadow_globals_buffer,
            0,
            bytemuck::bytes_of(&globals.light_view_proj),
        );
        for (slot, command) in self.slots.iter().zip(&frame.commands) {
            let RenderCommand::DrawMesh {
                mesh,
                transform,
                material,
                shadows,
            } = command;
            let radius = self
                .meshes
                .get(mesh.0 as usize)
                .map_or(0.0, |m| m.radius);
            let object =
                ObjectUniform::new(transform.to_cols_array_2d(), material, *shadows, radius);
            self.queue
                .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&object));
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(err) => {
                log::warn!("surface acquire failed: {err}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&::wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });
        {
            // Cleared every frame so a stale map is never sampled.
            let mut spass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("viewer-shadow-pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(1.0),
                        store: ::wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            if frame.shadow.is_some() {
                spass.set_pipeline(&self.shadow_pipeline);
                spass.set_bind_group(0, &self.shadow_globals_bind_group, &[]);
                for (slot, command) in self.slots.iter().zip(&frame.commands) {
                    let RenderCommand::DrawMesh { mesh, shadows, .. } = command;
                    if !shadows.cast {
                        continue;
                    }
                    let Some(gpu_mesh) = self.meshes.get(mesh.0 as usize) else {
                        continue;
                    };
                    if gpu_mesh.index_count == 0 {
                        continue;
                    }
                    spass.set_bind_group(1, &slot.bind_group, &[]);
                    spass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
                    spass.set_index_buffer(
                        gpu_mesh.index_buffer.slice(..),
                        ::wgpu::IndexFormat::Uint32,
                    );
                    spass.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
                }
            }
        }
        {
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("viewer-model-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(::wgpu::Color::TRANSPARENT),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(1.0),
                        store: ::wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            rpass.set_bind_group(0, &self.globals_bind_group, &[]);
            for (slot, command) in self.slots.iter().zip(&frame.commands) {
                let RenderCommand::DrawMesh { mesh, material, .. } = command;
                let Some(gpu_mesh) = self.meshes.get(mesh.0 as usize) else {
                    continue;
                };
                if gpu_mesh.index_count == 0 {
                    continue;
                }
                let pipeline = if material.is_translucent() {
                    &self.translucent_pipeline
                } else {
                    &self.opaque_pipeline
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(1, &slot.bind_group, &[]);
                rpass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
                rpass.set_index_buffer(gpu_mesh.index_buffer.slice(..), ::wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn release(&mut self) {
        self.meshes.clear();
        self.slots.clear();
        self.uploaded_revision = None;
        log::debug!("gpu resources released");
    }
}
