use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning an OBJ file into meshes.
#[derive(Debug, Error)]
pub enum ObjError {
    #[error("File doesn't exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("shape '{0}' has no positions")]
    MissingPositions(String),

    #[error("shape '{shape}': {stream} index {index} out of range (len={len})")]
    IndexOutOfRange {
        shape: String,
        stream: &'static str,
        index: usize,
        len: usize,
    },
}
