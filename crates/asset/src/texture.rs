//! Texture decoding and lookup of texture files referenced by materials.

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Create a new texture with given dimensions and RGBA8 format.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width * height * 4) as usize,
            "Data size doesn't match RGBA8 format"
        );
        Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        }
    }

    /// Decode an image file (PNG or JPEG) into RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading texture from {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {:?} {}x{}", path, width, height);

        Ok(Self::new_rgba8(width, height, data))
    }

    /// Checkerboard stand-in for textures that could not be found.
    pub fn create_test_texture(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                if ((x / 8) + (y / 8)) % 2 == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[255, 0, 255, 255]);
                }
            }
        }

        Self::new_rgba8(size, size, data)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * self.bytes_per_pixel()
    }

    pub fn is_valid(&self) -> bool {
        let expected_size = (self.width * self.height * self.bytes_per_pixel()) as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

/// Finds texture files by name: as given, then under each asset root.
#[derive(Clone, Debug, Default)]
pub struct TextureResolver {
    roots: Vec<PathBuf>,
}

impl TextureResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn resolve(&self, name: impl AsRef<Path>) -> Option<PathBuf> {
        let name = name.as_ref();
        if name.as_os_str().is_empty() {
            return None;
        }
        if name.is_file() {
            return Some(name.to_path_buf());
        }
        if name.is_absolute() {
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Texture of a material: `name` as given or under a root, then next to
    /// the model in `base_dir`.
    pub fn resolve_material(&self, name: &str, base_dir: &Path) -> Option<PathBuf> {
        self.resolve(name).or_else(|| {
            if name.is_empty() {
                return None;
            }
            self.resolve(base_dir.join(name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_texture_is_valid_checkerboard() {
        let tex = TextureData::create_test_texture(16);
        assert!(tex.is_valid());
        assert_eq!(tex.bytes_per_row(), 64);
        assert_eq!(&tex.data[0..4], &[255, 255, 255, 255]);
        // Pixel (8, 0) lies in the second checker cell.
        assert_eq!(&tex.data[32..36], &[255, 0, 255, 255]);
    }

    #[test]
    fn load_decodes_png_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbImage::from_pixel(2, 3, image::Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();

        let tex = TextureData::load(&path).unwrap();
        assert_eq!((tex.width, tex.height), (2, 3));
        assert!(tex.is_valid());
        assert_eq!(&tex.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TextureData::load("/definitely/not/here.png").unwrap_err();
        assert!(err.to_string().contains("Failed to open image"));
    }

    #[test]
    fn resolver_checks_roots_then_literal_paths() {
        let assets = tempfile::tempdir().unwrap();
        let model_dir = tempfile::tempdir().unwrap();
        fs::write(assets.path().join("wood.png"), b"x").unwrap();
        fs::write(model_dir.path().join("wood.png"), b"x").unwrap();
        fs::write(model_dir.path().join("only_local.png"), b"x").unwrap();

        let resolver = TextureResolver::new(vec![assets.path().to_path_buf()]);
        assert_eq!(resolver.resolve("wood.png"), Some(assets.path().join("wood.png")));
        assert_eq!(resolver.resolve("only_local.png"), None);
        assert_eq!(
            resolver.resolve(model_dir.path().join("only_local.png")),
            Some(model_dir.path().join("only_local.png"))
        );
        assert_eq!(resolver.resolve(model_dir.path().join("missing.png")), None);
    }

    #[test]
    fn resolver_ignores_empty_names() {
        let resolver = TextureResolver::default();
        assert_eq!(resolver.resolve(""), None);
        assert_eq!(resolver.resolve_material("", Path::new("/tmp")), None);
    }

    #[test]
    fn material_textures_prefer_asset_roots_over_model_dir() {
        let assets = tempfile::tempdir().unwrap();
        let model_dir = tempfile::tempdir().unwrap();
        fs::create_dir(model_dir.path().join("textures")).unwrap();
        fs::write(assets.path().join("wood.png"), b"x").unwrap();
        fs::write(model_dir.path().join("wood.png"), b"x").unwrap();
        fs::write(model_dir.path().join("textures/brick.png"), b"x").unwrap();

        let resolver = TextureResolver::new(vec![assets.path().to_path_buf()]);
        assert_eq!(
            resolver.resolve_material("wood.png", model_dir.path()),
            Some(assets.path().join("wood.png"))
        );
        assert_eq!(
            resolver.resolve_material("textures/brick.png", model_dir.path()),
            Some(model_dir.path().join("textures/brick.png"))
        );
        assert_eq!(resolver.resolve_material("stone.png", model_dir.path()), None);

        // With no roots the model directory is the only fallback.
        let bare = TextureResolver::default();
        assert_eq!(
            bare.resolve_material("wood.png", model_dir.path()),
            Some(model_dir.path().join("wood.png"))
        );
    }
}
