//! Asset loading (CPU side): OBJ documents, mesh streams, materials, textures.

pub mod error;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod texture;

pub use error::ObjError;
pub use material::{MaterialDesc, ShaderKind};
pub use mesh::{MeshData, MeshFormat};
pub use obj::{ObjDocument, ObjStats, ShapeMesh, load_obj_document, load_obj_document_from_str};
pub use texture::{TextureData, TextureResolver};
