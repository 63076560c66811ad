//! Wavefront OBJ documents: shapes reassembled into triangle meshes plus
//! their MTL materials.

use std::path::{Path, PathBuf};

use corelib::bounds::Aabb;

use crate::{
    error::ObjError,
    material::MaterialDesc,
    mesh::{MeshData, MeshFormat},
};

/// Attribute counts summed over the shapes of a document. The parser keeps
/// a separate attribute array per shape, so a `v` line used by two shapes
/// counts twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjStats {
    pub vertices: usize,
    pub normals: usize,
    pub texcoords: usize,
    pub materials: usize,
    pub shapes: usize,
}

/// One OBJ shape (`o`/`g` group) as an indexed triangle mesh.
#[derive(Clone, Debug)]
pub struct ShapeMesh {
    pub name: String,
    pub mesh: MeshData,
    /// Index into [`ObjDocument::materials`].
    pub material: usize,
}

#[derive(Clone, Debug)]
pub struct ObjDocument {
    pub path: PathBuf,
    /// Directory that material libraries and textures are resolved against.
    pub base_dir: PathBuf,
    pub stats: ObjStats,
    /// File materials followed by the default material.
    pub materials: Vec<MaterialDesc>,
    pub shapes: Vec<ShapeMesh>,
}

impl ObjDocument {
    /// Index of the default material appended after the file's materials.
    #[inline]
    pub fn default_material(&self) -> usize {
        self.materials.len() - 1
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.shapes
            .iter()
            .filter_map(|s| s.mesh.bounds())
            .reduce(|a, b| a.union(&b))
    }
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: false,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load an OBJ file and the MTL libraries it references.
pub fn load_obj_document(path: impl AsRef<Path>) -> Result<ObjDocument, ObjError> {
    let path = path.as_ref();
    if !path.exists() {
        log::error!("File doesn't exist: {}", path.display());
        return Err(ObjError::NotFound(path.to_path_buf()));
    }

    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let loaded = tobj::load_obj(path, &load_options());
    build_document(path.to_path_buf(), base_dir, loaded)
}

/// Parse OBJ source held in memory. Any `mtllib` statement is served from
/// `mtl`; without it the library counts as missing.
pub fn load_obj_document_from_str(
    obj: &str,
    mtl: Option<&str>,
    base_dir: impl Into<PathBuf>,
) -> Result<ObjDocument, ObjError> {
    let loaded = tobj::load_obj_buf(&mut obj.as_bytes(), &load_options(), |_| match mtl {
        Some(src) => tobj::load_mtl_buf(&mut src.as_bytes()),
        None => Err(tobj::LoadError::OpenFileFailed),
    });
    build_document(PathBuf::from("<memory>"), base_dir.into(), loaded)
}

fn build_document(
    path: PathBuf,
    base_dir: PathBuf,
    loaded: tobj::LoadResult,
) -> Result<ObjDocument, ObjError> {
    let (models, file_materials) = match loaded {
        Ok(loaded) => loaded,
        Err(source) => {
            log::error!("Failed to load {}: {}", path.display(), source);
            return Err(ObjError::Parse { path, source });
        }
    };

    let file_materials = file_materials.unwrap_or_else(|e| {
        log::error!("Failed to load materials for {}: {}", path.display(), e);
        Vec::new()
    });

    let stats = ObjStats {
        vertices: models.iter().map(|m| m.mesh.positions.len() / 3).sum(),
        normals: models.iter().map(|m| m.mesh.normals.len() / 3).sum(),
        texcoords: models.iter().map(|m| m.mesh.texcoords.len() / 2).sum(),
        materials: file_materials.len(),
        shapes: models.len(),
    };
    log::info!("# of vertices  {}", stats.vertices);
    log::info!("# of normals   {}", stats.normals);
    log::info!("# of texcoords {}", stats.texcoords);
    log::info!("# of materials {}", stats.materials);
    log::info!("# of shapes    {}", stats.shapes);

    let mut materials: Vec<MaterialDesc> = file_materials.iter().map(MaterialDesc::from).collect();
    materials.push(MaterialDesc::default());
    let default_material = materials.len() - 1;

    let shapes = models
        .iter()
        .map(|model| {
            let mesh = assemble_mesh(model)?;
            let material = match model.mesh.material_id {
                None => 0,
                Some(id) if id < file_materials.len() => id,
                Some(id) => {
                    log::warn!(
                        "Shape '{}' references unknown material {}; using default",
                        model.name,
                        id
                    );
                    default_material
                }
            };
            Ok(ShapeMesh {
                name: model.name.clone(),
                mesh,
                material,
            })
        })
        .collect::<Result<Vec<_>, ObjError>>()?;

    Ok(ObjDocument {
        path,
        base_dir,
        stats,
        materials,
        shapes,
    })
}

/// Reads item `index` of a flat stream with `N` floats per item.
fn fetch<const N: usize>(
    data: &[f32],
    index: u32,
    shape: &str,
    stream: &'static str,
) -> Result<[f32; N], ObjError> {
    let index = index as usize;
    let start = index * N;
    data.get(start..start + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| ObjError::IndexOutOfRange {
            shape: shape.to_owned(),
            stream,
            index,
            len: data.len() / N,
        })
}

/// Whether an optional stream has one index per triangle corner.
fn has_stream(name: &str, stream: &'static str, data: &[f32], indices: &[u32], corners: usize) -> bool {
    if data.is_empty() {
        return false;
    }
    if indices.len() != corners {
        log::warn!(
            "Shape '{}': {} indices cover {} of {} corners; ignoring {}",
            name,
            stream,
            indices.len(),
            corners,
            stream
        );
        return false;
    }
    true
}

/// Expand one shape into per-corner attribute streams with sequential
/// indices. Vertices are not deduplicated.
fn assemble_mesh(model: &tobj::Model) -> Result<MeshData, ObjError> {
    let src = &model.mesh;
    let name = model.name.as_str();
    let corners = src.indices.len();

    // Groups holding only lines or points, or no elements at all.
    if corners == 0 {
        log::debug!("Shape '{}' has no faces", name);
        return Ok(MeshData::new(MeshFormat::new().positions().normals()));
    }
    if src.positions.is_empty() {
        return Err(ObjError::MissingPositions(model.name.clone()));
    }

    let with_normals = has_stream(name, "normal", &src.normals, &src.normal_indices, corners);
    let with_texcoords = has_stream(name, "texcoord", &src.texcoords, &src.texcoord_indices, corners);
    // Vertex colours share the position index.
    let with_colors = !src.vertex_color.is_empty();

    let mut positions = Vec::with_capacity(corners);
    let mut normals = Vec::with_capacity(if with_normals { corners } else { 0 });
    let mut texcoords = Vec::with_capacity(if with_texcoords { corners } else { 0 });
    let mut colors = Vec::with_capacity(if with_colors { corners } else { 0 });

    for (k, &vi) in src.indices.iter().enumerate() {
        positions.push(fetch::<3>(&src.positions, vi, name, "position")?);
        if with_normals {
            normals.push(fetch::<3>(&src.normals, src.normal_indices[k], name, "normal")?);
        }
        if with_texcoords {
            texcoords.push(fetch::<2>(&src.texcoords, src.texcoord_indices[k], name, "texcoord")?);
        }
        if with_colors {
            colors.push(fetch::<3>(&src.vertex_color, vi, name, "color")?);
        }
    }
    let indices: Vec<u32> = (0..corners as u32).collect();

    let mut format = MeshFormat::new().positions().normals();
    if with_texcoords {
        format = format.texcoords();
    }
    if with_colors {
        format = format.colors();
    }

    let mut mesh = MeshData::new(format);
    mesh.append_positions(&positions);
    if with_normals {
        mesh.append_normals(&normals);
    }
    if with_texcoords {
        mesh.append_texcoords0(&texcoords);
    }
    if with_colors {
        mesh.append_colors(&colors);
    }
    mesh.append_indices(&indices);

    if !with_normals {
        mesh.recalculate_normals();
        mesh.recalculate_tangents();
    }

    log::debug!(
        "Shape '{}': {} triangles, normals={}, texcoords={}, colors={}",
        name,
        mesh.triangle_count(),
        with_normals,
        with_texcoords,
        with_colors
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::ShaderKind;
    use approx::assert_abs_diff_eq;
    use std::fs;

    const CUBE_FACE_MTL: &str = r#"
newmtl red
Kd 1.0 0.0 0.0

newmtl brick
Kd 1.0 1.0 1.0
map_Kd textures/brick.png
"#;

    const TWO_SHAPES: &str = r#"
mtllib scene.mtl
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
o quad
usemtl brick
f 1/1/1 2/2/1 3/3/1 4/4/1
o tri
usemtl red
f 1/1/1 2/2/1 3/3/1
"#;

    #[test]
    fn quad_is_triangulated_and_expanded_per_corner() {
        let doc = load_obj_document_from_str(TWO_SHAPES, Some(CUBE_FACE_MTL), "/models").unwrap();
        assert_eq!(doc.shapes.len(), 2);

        let quad = &doc.shapes[0];
        assert_eq!(quad.name, "quad");
        assert_eq!(quad.mesh.triangle_count(), 2);
        // No deduplication: one vertex per corner, indices are sequential.
        assert_eq!(quad.mesh.vertex_count(), 6);
        assert_eq!(quad.mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert!(quad.mesh.format.normals && quad.mesh.format.texcoords);
        assert!(!quad.mesh.format.colors);
        assert!(quad.mesh.is_valid());
        for n in &quad.mesh.normals {
            assert_eq!(*n, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn materials_bind_by_usemtl_and_default_is_appended() {
        let doc = load_obj_document_from_str(TWO_SHAPES, Some(CUBE_FACE_MTL), "/models").unwrap();
        assert_eq!(doc.stats.materials, 2);
        assert_eq!(doc.materials.len(), 3);
        assert_eq!(doc.default_material(), 2);
        assert_eq!(doc.materials[2], MaterialDesc::default());

        let quad_mat = &doc.materials[doc.shapes[0].material];
        assert_eq!(quad_mat.name, "brick");
        assert_eq!(quad_mat.shader_kind(), ShaderKind::LambertTexture);
        assert_eq!(quad_mat.diffuse_texture_name(), Some("textures/brick.png"));

        let tri_mat = &doc.materials[doc.shapes[1].material];
        assert_eq!(tri_mat.name, "red");
        assert_eq!(tri_mat.shader_kind(), ShaderKind::Lambert);
    }

    #[test]
    fn missing_normals_are_recalculated() {
        let src = r#"
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
f 1/1 2/2 3/3
"#;
        let doc = load_obj_document_from_str(src, None, ".").unwrap();
        let mesh = &doc.shapes[0].mesh;
        assert!(mesh.format.normals);
        assert_eq!(mesh.normals.len(), 3);
        for n in &mesh.normals {
            assert_abs_diff_eq!(n[2], 1.0, epsilon = 1e-6);
        }
        // Texcoords are present, so tangents were derived too.
        assert_eq!(mesh.tangents.len(), 3);
    }

    #[test]
    fn shape_without_usemtl_takes_first_material() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let doc = load_obj_document_from_str(src, None, ".").unwrap();
        assert_eq!(doc.materials.len(), 1);
        assert_eq!(doc.shapes[0].material, 0);
        assert_eq!(doc.shapes[0].material, doc.default_material());
        assert!(doc.shapes[0].mesh.tangents.is_empty());
    }

    #[test]
    fn vertex_colors_follow_position_index() {
        let src = r#"
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 0 1 0 0 0 1
f 3 2 1
"#;
        let doc = load_obj_document_from_str(src, None, ".").unwrap();
        let mesh = &doc.shapes[0].mesh;
        assert!(mesh.format.colors);
        assert_eq!(mesh.colors, vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
    }

    #[test]
    fn unreadable_mtllib_falls_back_to_default_material() {
        let doc = load_obj_document_from_str(TWO_SHAPES, None, ".").unwrap();
        assert_eq!(doc.stats.materials, 0);
        assert_eq!(doc.materials.len(), 1);
        assert!(doc.shapes.iter().all(|s| s.material == doc.default_material()));
    }

    #[test]
    fn stats_count_shared_vertices_once_per_shape() {
        let doc = load_obj_document_from_str(TWO_SHAPES, Some(CUBE_FACE_MTL), ".").unwrap();
        assert_eq!(doc.stats.shapes, 2);
        assert_eq!(doc.stats.vertices, 4 + 3);
        assert_eq!(doc.stats.normals, 2);
    }

    #[test]
    fn faceless_groups_load_as_empty_meshes() {
        let trailing = "v 0 0 0\nv 1 0 0\nv 0 1 0\no tri\nf 1 2 3\no trailing\n";
        let doc = load_obj_document_from_str(trailing, None, ".").unwrap();
        let names: Vec<&str> = doc.shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["tri", "trailing"]);
        assert_eq!(doc.shapes[0].mesh.triangle_count(), 1);
        assert!(!doc.shapes[1].mesh.is_valid());
        assert_eq!(doc.shapes[1].mesh.vertex_count(), 0);

        let wire = "v 0 0 0\nv 1 0 0\nv 0 1 0\no wire\nl 1 2\no tri\nf 1 2 3\n";
        let doc = load_obj_document_from_str(wire, None, ".").unwrap();
        let wire_shape = doc.shapes.iter().find(|s| s.name == "wire").unwrap();
        assert!(wire_shape.mesh.indices.is_empty());
        assert!(doc.shapes.iter().any(|s| s.name == "tri" && s.mesh.is_valid()));
        // Bounds come from the drawable shape only.
        assert_eq!(doc.bounds().unwrap().max.to_array(), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_document_loads() {
        let doc = load_obj_document_from_str("", None, ".").unwrap();
        assert!(doc.shapes.iter().all(|s| s.mesh.indices.is_empty()));
        assert_eq!(doc.materials.len(), 1);
        assert!(doc.bounds().is_none());
    }

    #[test]
    fn malformed_face_is_a_parse_error() {
        let err = load_obj_document_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 x\n", None, ".")
            .unwrap_err();
        assert!(matches!(err, ObjError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn faces_without_positions_are_rejected() {
        let mesh = tobj::Mesh {
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let model = tobj::Model::new(mesh, "ghost".to_owned());
        let err = assemble_mesh(&model).unwrap_err();
        assert!(matches!(err, ObjError::MissingPositions(ref name) if name == "ghost"));
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let mesh = tobj::Mesh {
            positions: vec![0.0; 6],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let model = tobj::Model::new(mesh, "short".to_owned());
        let err = assemble_mesh(&model).unwrap_err();
        assert!(matches!(
            err,
            ObjError::IndexOutOfRange { stream: "position", index: 2, len: 2, .. }
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_obj_document("/no/such/model.obj").unwrap_err();
        assert!(matches!(err, ObjError::NotFound(_)));
        assert!(err.to_string().starts_with("File doesn't exist"));
    }

    #[test]
    fn loads_from_disk_with_sibling_mtl() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scene.mtl"), CUBE_FACE_MTL).unwrap();
        let path = dir.path().join("scene.obj");
        fs::write(&path, TWO_SHAPES).unwrap();

        let doc = load_obj_document(&path).unwrap();
        assert_eq!(doc.base_dir, dir.path());
        assert_eq!(doc.stats.shapes, 2);
        assert_eq!(doc.stats.materials, 2);
        assert_eq!(doc.materials[doc.shapes[0].material].name, "brick");

        let bounds = doc.bounds().unwrap();
        assert_eq!(bounds.min.to_array(), [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max.to_array(), [1.0, 1.0, 0.0]);
    }
}
