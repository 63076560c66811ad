//! A loaded OBJ file: its materials plus one mesh child per shape.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use asset::load_obj_document;
use corelib::{Mat4, bounds::Aabb, transform::Transform};
use wgpu::{BindGroup, BufferUsages, Queue, util::DeviceExt};

use crate::ObjectUniform;
use crate::assets::Assets;
use crate::material::GpuMaterial;
use crate::mesh::MeshObj;

pub struct ObjModel {
    pub name: String,
    pub path: PathBuf,
    materials: Vec<GpuMaterial>,
    children: Vec<MeshObj>,
    bounds: Option<Aabb>,
    object_buf: wgpu::Buffer,
    object_bg: BindGroup,
}

impl ObjModel {
    /// Load `path`, create every material (file materials and the default
    /// one), then one [`MeshObj`] per shape.
    pub fn create(assets: &Assets, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let doc = load_obj_document(path).with_context(|| format!("Loading model {}", path.display()))?;

        let materials: Vec<GpuMaterial> = doc
            .materials
            .iter()
            .map(|desc| GpuMaterial::create(assets, desc, &doc.base_dir))
            .collect();

        let device = assets.device();
        let children: Vec<MeshObj> = doc
            .shapes
            .iter()
            .map(|shape| MeshObj::create(device, &shape.name, &shape.mesh, shape.material))
            .collect();

        let object_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Object UBO"),
            contents: bytemuck::bytes_of(&ObjectUniform::from_model(Mat4::IDENTITY)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let object_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object BG"),
            layout: &assets.layouts().object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: object_buf.as_entire_binding(),
            }],
        });

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::info!(
            "Model '{}': {} meshes, {} materials",
            name,
            children.len(),
            materials.len()
        );

        Ok(Self {
            name,
            path: path.to_path_buf(),
            materials,
            children,
            bounds: doc.bounds(),
            object_buf,
            object_bg,
        })
    }

    #[inline]
    pub fn children(&self) -> &[MeshObj] {
        &self.children
    }

    #[inline]
    pub fn materials(&self) -> &[GpuMaterial] {
        &self.materials
    }

    #[inline]
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn triangle_count(&self) -> u32 {
        self.children
            .iter()
            .filter_map(|c| c.mesh.as_ref())
            .map(|m| m.index_count() / 3)
            .sum()
    }

    /// Upload the object-to-world matrix used by the next `draw`.
    pub fn set_transform(&self, queue: &Queue, transform: &Transform) {
        let uniform = ObjectUniform::from_model(transform.pivot_matrix());
        queue.write_buffer(&self.object_buf, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.object_bg, &[]);
        for child in &self.children {
            child.draw(pass, &self.materials);
        }
    }
}
