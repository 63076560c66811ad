//! GPU materials: a shader program plus the material's bind group.

use std::path::Path;
use std::sync::Arc;

use asset::MaterialDesc;
use wgpu::{BindGroup, BufferUsages, util::DeviceExt};

use crate::MaterialUniform;
use crate::assets::{Assets, GpuTexture, ShaderProgram};

pub struct GpuMaterial {
    pub desc: MaterialDesc,
    pub program: Arc<ShaderProgram>,
    pub diffuse_texture: Option<Arc<GpuTexture>>,
    #[allow(dead_code)]
    uniform_buf: wgpu::Buffer,
    bind_group: BindGroup,
}

impl GpuMaterial {
    /// Picks `lambert texture` when the material names a diffuse map and
    /// `lambert` otherwise. A texture that cannot be found is replaced by the
    /// checkerboard placeholder so the textured program still has something
    /// to sample.
    pub fn create(assets: &Assets, desc: &MaterialDesc, base_dir: &Path) -> Self {
        let kind = desc.shader_kind();
        let program = assets.glsl_prog(kind);

        let diffuse_texture = desc.diffuse_texture_name().map(|name| {
            assets.material_texture(name, base_dir).unwrap_or_else(|| {
                log::warn!(
                    "Texture '{}' of material '{}' not found; using placeholder",
                    name,
                    desc.name
                );
                assets.placeholder_texture()
            })
        });

        let uniform = MaterialUniform {
            base_color: desc.base_color(),
        };
        let device = assets.device();
        let uniform_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material UBO"),
            contents: bytemuck::bytes_of(&uniform),
            usage: BufferUsages::UNIFORM,
        });

        let layout = assets.layouts().material_for(kind);
        let bind_group = match &diffuse_texture {
            Some(tex) => device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material BG"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&tex.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(assets.sampler()),
                    },
                ],
            }),
            None => device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material BG"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buf.as_entire_binding(),
                }],
            }),
        };

        log::debug!(
            "Material '{}': shader '{}', texture {:?}",
            desc.name,
            kind.name(),
            diffuse_texture.as_ref().map(|t| t.label.as_str())
        );

        Self {
            desc: desc.clone(),
            program,
            diffuse_texture,
            uniform_buf,
            bind_group,
        }
    }

    /// Bind the shader, then the material (diffuse texture in slot 0 when present).
    pub fn pre_draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.program.bind(pass);
        pass.set_bind_group(2, &self.bind_group, &[]);
    }

    /// Nothing to unbind: the next material's `pre_draw` replaces group 2.
    pub fn post_draw(&self, _pass: &mut wgpu::RenderPass<'_>) {}
}
