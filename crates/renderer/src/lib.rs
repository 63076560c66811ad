//! Renderer: wgpu device/surface, the asset cache and OBJ models drawn with
//! Lambert shading.
//! wgpu = 26.x, winit = 0.30.x

pub mod assets;
pub mod material;
pub mod mesh;
pub mod model;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::TextureResolver;
use bytemuck::{Pod, Zeroable};
use corelib::{
    Mat4, Vec3,
    bounds::Aabb,
    camera::Camera,
    ecs::{ModelId, Renderable, World},
    transform::Transform,
    vec3,
};
use wgpu::{
    BindGroup, Buffer, BufferUsages, CommandEncoderDescriptor, Device, DeviceDescriptor, Extent3d,
    Features, Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::assets::Assets;
use crate::model::ObjModel;

pub(crate) const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const FOV_Y_DEG: f32 = 45.0;

/// Per-frame camera and light (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

/// Object-to-world matrix and its normal matrix.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

impl ObjectUniform {
    pub(crate) fn from_model(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: Transform::normal_matrix(model).to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct MaterialUniform {
    pub(crate) base_color: [f32; 4],
}

/// What to load and how to animate it.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub models: Vec<PathBuf>,
    /// Directories searched for textures before the OBJ file's own directory.
    pub asset_roots: Vec<PathBuf>,
    pub backends: wgpu::Backends,
    /// Spin around +Y in radians per second.
    pub rotate_speed: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            asset_roots: Vec::new(),
            backends: wgpu::Backends::all(),
            rotate_speed: 0.5,
        }
    }
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Scene
    #[allow(dead_code)]
    assets: Assets,
    models: Vec<ObjModel>,
    world: World,
    camera: Camera,
    rotate_speed: f32,

    // Frame uniforms
    frame_buf: Buffer,
    frame_bg: BindGroup,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to `window` and load every configured model.
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        let instance = Instance::new(&InstanceDescriptor {
            backends: scene.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("objscene Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        let assets = Assets::new(
            device.clone(),
            queue.clone(),
            surface_format,
            TextureResolver::new(scene.asset_roots.clone()),
        );

        let frame_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame UBO"),
            contents: bytemuck::bytes_of(&FrameUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                light_dir: [0.0, 0.0, -1.0, 0.0],
            }),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let frame_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BG"),
            layout: &assets.layouts().frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buf.as_entire_binding(),
            }],
        });

        // ==== Models ====
        let mut world = World::new();
        let mut models = Vec::with_capacity(scene.models.len());
        let mut radius: f32 = 0.0;
        for path in &scene.models {
            let model = ObjModel::create(&assets, path)?;
            let bounds = model.bounds();
            let center = bounds.map(|b| b.center()).unwrap_or(Vec3::ZERO);
            radius = radius.max(bounds.map(|b| b.radius()).unwrap_or(0.0));

            let id = ModelId(models.len() as u32);
            world.spawn(Transform::centered_on(center), Some(Renderable { model: id }));
            log::info!(
                "Loaded '{}' ({} triangles) as {:?}",
                model.name,
                model.triangle_count(),
                id
            );
            models.push(model);
        }

        let aspect = width as f32 / height as f32;
        let camera = if radius > 0.0 {
            // Models spin about their centre, so frame the sphere they sweep.
            let reach = Aabb::new(Vec3::splat(-radius), Vec3::splat(radius));
            Camera::framing(&reach, FOV_Y_DEG.to_radians(), aspect)
        } else {
            Camera::new_perspective(
                vec3(0.0, 0.0, 4.0),
                Vec3::ZERO,
                Vec3::Y,
                FOV_Y_DEG.to_radians(),
                0.1,
                100.0,
                aspect,
            )
        };

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            assets,
            models,
            world,
            camera,
            rotate_speed: scene.rotate_speed,
            frame_buf,
            frame_bg,
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
        self.camera = self
            .camera
            .with_aspect(self.width as f32 / self.height as f32);
    }

    /// Advance animation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.world
            .system_rotate_all(dt, [0.0, self.rotate_speed, 0.0]);
    }

    /// Render one frame: upload uniforms, clear, draw every renderable model.
    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let light = vec3(-0.4, -1.0, -0.6).normalize();
        let frame_uniform = FrameUniform {
            view_proj: self.camera.proj_view().to_cols_array_2d(),
            light_dir: light.extend(0.0).to_array(),
        };
        self.queue
            .write_buffer(&self.frame_buf, 0, bytemuck::bytes_of(&frame_uniform));

        let mut draws: Vec<&ObjModel> = Vec::new();
        for (transform, renderable) in self.world.iter_renderables() {
            if let Some(model) = self.models.get(renderable.model.0 as usize) {
                model.set_transform(&self.queue, transform);
                draws.push(model);
            }
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_bind_group(0, &self.frame_bg, &[]);
            for model in draws {
                model.draw(&mut rpass);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
