//! Shared GPU asset cache: textures by resolved path, one pipeline per shader.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use asset::{ShaderKind, TextureData, TextureResolver};
use parking_lot::Mutex;
use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState,
    BufferBindingType, ColorTargetState, ColorWrites, DepthBiasState, DepthStencilState, Device,
    Extent3d, FragmentState, PipelineLayoutDescriptor, Queue, RenderPipeline,
    RenderPipelineDescriptor, Sampler, SamplerBindingType, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType,
    TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension, VertexState,
};

use crate::mesh::GpuVertex;
use crate::{DEPTH_FORMAT, FrameUniform, MaterialUniform, ObjectUniform};

const PLACEHOLDER_SIZE: u32 = 64;

/// A decoded, uploaded 2D texture.
pub struct GpuTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub view: TextureView,
}

/// A compiled render pipeline for one [`ShaderKind`].
pub struct ShaderProgram {
    pub kind: ShaderKind,
    pub pipeline: RenderPipeline,
}

impl ShaderProgram {
    #[inline]
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
    }
}

/// Bind group layouts every pipeline is built against.
pub struct Layouts {
    pub frame: BindGroupLayout,
    pub object: BindGroupLayout,
    pub material: BindGroupLayout,
    pub material_textured: BindGroupLayout,
}

impl Layouts {
    fn new(device: &Device) -> Self {
        let frame = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Frame BGL"),
            entries: &[uniform_entry::<FrameUniform>(
                0,
                ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            )],
        });
        let object = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Object BGL"),
            entries: &[uniform_entry::<ObjectUniform>(0, ShaderStages::VERTEX)],
        });
        let material = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[uniform_entry::<MaterialUniform>(0, ShaderStages::FRAGMENT)],
        });
        let material_textured = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material Textured BGL"),
            entries: &[
                uniform_entry::<MaterialUniform>(0, ShaderStages::FRAGMENT),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        Self {
            frame,
            object,
            material,
            material_textured,
        }
    }

    pub fn material_for(&self, kind: ShaderKind) -> &BindGroupLayout {
        if kind.is_textured() {
            &self.material_textured
        } else {
            &self.material
        }
    }
}

fn uniform_entry<T>(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

fn fits_texture_limit(data: &TextureData, max_dimension: u32) -> bool {
    data.is_valid() && data.width <= max_dimension && data.height <= max_dimension
}

fn shader_source(kind: ShaderKind) -> &'static str {
    match kind {
        ShaderKind::Lambert => include_str!("shaders/lambert.wgsl"),
        ShaderKind::LambertTexture => include_str!("shaders/lambert_texture.wgsl"),
    }
}

/// Texture and shader caches shared by every loaded model.
pub struct Assets {
    device: Device,
    queue: Queue,
    color_format: TextureFormat,
    resolver: TextureResolver,
    layouts: Layouts,
    sampler: Sampler,
    textures: Mutex<HashMap<PathBuf, Arc<GpuTexture>>>,
    programs: Mutex<HashMap<ShaderKind, Arc<ShaderProgram>>>,
    placeholder: Mutex<Option<Arc<GpuTexture>>>,
}

impl Assets {
    pub fn new(
        device: Device,
        queue: Queue,
        color_format: TextureFormat,
        resolver: TextureResolver,
    ) -> Self {
        let layouts = Layouts::new(&device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Diffuse Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            device,
            queue,
            color_format,
            resolver,
            layouts,
            sampler,
            textures: Mutex::new(HashMap::new()),
            programs: Mutex::new(HashMap::new()),
            placeholder: Mutex::new(None),
        }
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    #[inline]
    pub fn layouts(&self) -> &Layouts {
        &self.layouts
    }

    #[inline]
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Texture looked up by name through the asset roots. `None` when the
    /// file cannot be found or decoded.
    pub fn texture2d(&self, name: impl AsRef<Path>) -> Option<Arc<GpuTexture>> {
        let name = name.as_ref();
        let path = self.resolver.resolve(name)?;
        self.texture_at(path)
    }

    /// Texture of a material: by name, then next to the OBJ file.
    pub fn material_texture(&self, name: &str, base_dir: &Path) -> Option<Arc<GpuTexture>> {
        let path = self.resolver.resolve_material(name, base_dir)?;
        self.texture2d(path)
    }

    fn texture_at(&self, path: PathBuf) -> Option<Arc<GpuTexture>> {
        if let Some(tex) = self.textures.lock().get(&path) {
            return Some(tex.clone());
        }

        let data = match TextureData::load(&path) {
            Ok(data) => data,
            Err(e) => {
                log::error!("{e:#}");
                return None;
            }
        };
        let max = self.device.limits().max_texture_dimension_2d;
        if !fits_texture_limit(&data, max) {
            log::error!(
                "Texture {:?} is {}x{}, device allows at most {}",
                path,
                data.width,
                data.height,
                max
            );
            return None;
        }
        let tex = Arc::new(self.upload(&path.display().to_string(), &data));
        self.textures.lock().insert(path, tex.clone());
        Some(tex)
    }

    /// Checkerboard bound in place of textures that failed to resolve.
    pub fn placeholder_texture(&self) -> Arc<GpuTexture> {
        self.placeholder
            .lock()
            .get_or_insert_with(|| {
                Arc::new(self.upload(
                    "placeholder",
                    &TextureData::create_test_texture(PLACEHOLDER_SIZE),
                ))
            })
            .clone()
    }

    fn upload(&self, label: &str, data: &TextureData) -> GpuTexture {
        let size = Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.bytes_per_row()),
                rows_per_image: Some(data.height),
            },
            size,
        );
        let view = texture.create_view(&TextureViewDescriptor::default());
        GpuTexture {
            label: label.to_owned(),
            width: data.width,
            height: data.height,
            texture,
            view,
        }
    }

    /// Program registered under `kind`; compiled on first use.
    pub fn glsl_prog(&self, kind: ShaderKind) -> Arc<ShaderProgram> {
        let mut programs = self.programs.lock();
        programs
            .entry(kind)
            .or_insert_with(|| {
                log::info!("Compiling shader '{}'", kind.name());
                Arc::new(self.create_program(kind))
            })
            .clone()
    }

    fn create_program(&self, kind: ShaderKind) -> ShaderProgram {
        let shader = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(kind.name()),
            source: ShaderSource::Wgsl(shader_source(kind).into()),
        });
        let layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(kind.name()),
            bind_group_layouts: &[
                &self.layouts.frame,
                &self.layouts.object,
                self.layouts.material_for(kind),
            ],
            push_constant_ranges: &[],
        });
        let pipeline = self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(kind.name()),
            layout: Some(&layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: self.color_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // OBJ exporters disagree on winding, so both faces are drawn.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        ShaderProgram { kind, pipeline }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_shader_kind_has_wgsl_entry_points() {
        for kind in ShaderKind::ALL {
            let src = shader_source(kind);
            assert!(src.contains("fn vs_main"), "{}", kind.name());
            assert!(src.contains("fn fs_main"), "{}", kind.name());
        }
        assert!(shader_source(ShaderKind::LambertTexture).contains("textureSample"));
        assert!(!shader_source(ShaderKind::Lambert).contains("texture_2d"));
    }

    #[test]
    fn oversized_textures_are_rejected() {
        let limit = wgpu::Limits::downlevel_webgl2_defaults().max_texture_dimension_2d;
        let tex = TextureData::create_test_texture(16);
        assert!(fits_texture_limit(&tex, limit));
        assert!(fits_texture_limit(&tex, 16));
        assert!(!fits_texture_limit(&tex, 15));

        let wide = TextureData::new_rgba8(limit + 1, 1, vec![0; (limit as usize + 1) * 4]);
        assert!(!fits_texture_limit(&wide, limit));
    }
}
