//! GPU meshes: interleaved vertex buffer + u32 index buffer per OBJ shape.

use asset::MeshData;
use bytemuck::{Pod, Zeroable};
use corelib::bounds::Aabb;
use wgpu::{BufferUsages, Device, VertexBufferLayout, VertexStepMode, util::DeviceExt};

use crate::material::GpuMaterial;

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Vertex: position + normal + uv + colour.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl GpuVertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x3
        ],
    };

    /// Interleave the streams of `mesh`. Absent texcoords become `[0, 0]`,
    /// absent colours white.
    pub fn interleave(mesh: &MeshData) -> Vec<GpuVertex> {
        (0..mesh.vertex_count())
            .map(|i| GpuVertex {
                position: mesh.positions[i],
                normal: mesh.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                uv: mesh.texcoords.get(i).copied().unwrap_or([0.0, 0.0]),
                color: mesh.colors.get(i).copied().unwrap_or(WHITE),
            })
            .collect()
    }
}

/// Uploaded vertex/index buffers.
pub struct GpuMesh {
    vertex_buf: wgpu::Buffer,
    index_buf: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    /// Upload `mesh`; `None` when it has nothing drawable.
    pub fn upload(device: &Device, label: &str, mesh: &MeshData) -> Option<Self> {
        if !mesh.is_valid() {
            log::warn!("Mesh '{}' has no drawable triangles; skipping upload", label);
            return None;
        }
        let vertices = GpuVertex::interleave(mesh);
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} VB")),
            contents: bytemuck::cast_slice(&vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} IB")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });
        Some(Self {
            vertex_buf,
            index_buf,
            index_count: mesh.indices.len() as u32,
        })
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        pass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// One child of an [`ObjModel`](crate::model::ObjModel): a shape's mesh and
/// the material it is drawn with.
pub struct MeshObj {
    pub name: String,
    pub mesh: Option<GpuMesh>,
    /// Index into the owning model's materials.
    pub material: usize,
    pub bounds: Option<Aabb>,
}

impl MeshObj {
    pub fn create(device: &Device, name: &str, mesh: &MeshData, material: usize) -> Self {
        Self {
            name: name.to_owned(),
            mesh: GpuMesh::upload(device, name, mesh),
            material,
            bounds: mesh.bounds(),
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, materials: &[GpuMaterial]) {
        let Some(mesh) = &self.mesh else {
            return;
        };
        let Some(material) = materials.get(self.material) else {
            log::warn!("Mesh '{}' has no material {}", self.name, self.material);
            return;
        };

        material.pre_draw(pass);
        mesh.draw(pass);
        material.post_draw(pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::MeshFormat;

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(GpuVertex::LAYOUT.array_stride, 44);
        assert_eq!(GpuVertex::LAYOUT.attributes.len(), 4);
        assert_eq!(GpuVertex::LAYOUT.attributes[3].offset, 32);
    }

    #[test]
    fn interleave_fills_missing_streams() {
        let mut mesh = MeshData::new(MeshFormat::new().positions().normals().colors());
        mesh.append_positions(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        mesh.append_normals(&[[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        mesh.append_colors(&[[0.5, 0.5, 0.5], [0.1, 0.2, 0.3]]);

        let v = GpuVertex::interleave(&mesh);
        assert_eq!(v.len(), 2);
        assert_eq!(v[1].position, [4.0, 5.0, 6.0]);
        assert_eq!(v[1].normal, [1.0, 0.0, 0.0]);
        assert_eq!(v[1].uv, [0.0, 0.0]);
        assert_eq!(v[1].color, [0.1, 0.2, 0.3]);

        mesh.colors.clear();
        assert_eq!(GpuVertex::interleave(&mesh)[0].color, WHITE);
    }
}
