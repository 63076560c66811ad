//! CPU-side triangle mesh with separate attribute streams.

use corelib::{Vec2, Vec3, bounds::Aabb};

/// Which attribute streams a mesh carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshFormat {
    pub positions: bool,
    pub normals: bool,
    pub texcoords: bool,
    pub colors: bool,
    pub tangents: bool,
}

impl MeshFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(mut self) -> Self {
        self.positions = true;
        self
    }

    pub fn normals(mut self) -> Self {
        self.normals = true;
        self
    }

    pub fn texcoords(mut self) -> Self {
        self.texcoords = true;
        self
    }

    pub fn colors(mut self) -> Self {
        self.colors = true;
        self
    }
}

/// Indexed triangle list. Every non-empty stream has one entry per vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub format: MeshFormat,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(format: MeshFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn append_positions(&mut self, positions: &[[f32; 3]]) {
        self.positions.extend_from_slice(positions);
    }

    pub fn append_normals(&mut self, normals: &[[f32; 3]]) {
        self.normals.extend_from_slice(normals);
    }

    pub fn append_texcoords0(&mut self, texcoords: &[[f32; 2]]) {
        self.texcoords.extend_from_slice(texcoords);
    }

    pub fn append_colors(&mut self, colors: &[[f32; 3]]) {
        self.colors.extend_from_slice(colors);
    }

    pub fn append_indices(&mut self, indices: &[u32]) {
        self.indices.extend_from_slice(indices);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Non-empty, whole triangles, every optional stream either empty or
    /// per-vertex, and all indices in range.
    pub fn is_valid(&self) -> bool {
        let n = self.positions.len();
        let stream_ok = |len: usize| len == 0 || len == n;
        n > 0
            && !self.indices.is_empty()
            && self.indices.len() % 3 == 0
            && stream_ok(self.normals.len())
            && stream_ok(self.texcoords.len())
            && stream_ok(self.colors.len())
            && stream_ok(self.tangents.len())
            && self.indices.iter().all(|&i| (i as usize) < n)
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().map(|&p| Vec3::from(p)))
    }

    fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let n = self.positions.len();
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .filter(move |t| t.iter().all(|&i| i < n))
    }

    /// Area-weighted face normals accumulated per vertex.
    pub fn recalculate_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for [a, b, c] in self.triangles() {
            let pa = Vec3::from(self.positions[a]);
            let pb = Vec3::from(self.positions[b]);
            let pc = Vec3::from(self.positions[c]);
            let n = (pb - pa).cross(pc - pa);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }

        self.normals = acc
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Z).to_array())
            .collect();
        self.format.normals = true;
    }

    /// Per-vertex tangents from UV gradients, orthogonalized against the
    /// normals. Needs per-vertex texcoords and normals; returns `false` and
    /// leaves the tangent stream empty otherwise.
    pub fn recalculate_tangents(&mut self) -> bool {
        let n = self.positions.len();
        if n == 0 || self.texcoords.len() != n || self.normals.len() != n {
            self.tangents.clear();
            self.format.tangents = false;
            return false;
        }

        let mut acc = vec![Vec3::ZERO; n];
        for [a, b, c] in self.triangles() {
            let p0 = Vec3::from(self.positions[a]);
            let e1 = Vec3::from(self.positions[b]) - p0;
            let e2 = Vec3::from(self.positions[c]) - p0;
            let uv0 = Vec2::from(self.texcoords[a]);
            let d1 = Vec2::from(self.texcoords[b]) - uv0;
            let d2 = Vec2::from(self.texcoords[c]) - uv0;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let t = (e1 * d2.y - e2 * d1.y) / det;
            acc[a] += t;
            acc[b] += t;
            acc[c] += t;
        }

        self.tangents = acc
            .into_iter()
            .zip(&self.normals)
            .map(|(t, &nrm)| {
                let nrm = Vec3::from(nrm);
                (t - nrm * nrm.dot(t))
                    .try_normalize()
                    .unwrap_or_else(|| nrm.any_orthonormal_vector())
                    .to_array()
            })
            .collect();
        self.format.tangents = true;
        true
    }
}
