//! Material properties read from MTL libraries and the shader they select.

/// Shading programs a material can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Lambert,
    LambertTexture,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 2] = [ShaderKind::Lambert, ShaderKind::LambertTexture];

    /// Name the asset manager registers the program under.
    pub const fn name(self) -> &'static str {
        match self {
            ShaderKind::Lambert => "lambert",
            ShaderKind::LambertTexture => "lambert texture",
        }
    }

    #[inline]
    pub const fn is_textured(self) -> bool {
        matches!(self, ShaderKind::LambertTexture)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    /// Opacity, 1.0 is opaque.
    pub dissolve: f32,
    /// `map_Kd` as written in the MTL file.
    pub diffuse_texture: Option<String>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: [0.0; 3],
            diffuse: [1.0; 3],
            specular: [0.0; 3],
            shininess: 1.0,
            dissolve: 1.0,
            diffuse_texture: None,
        }
    }
}

impl From<&tobj::Material> for MaterialDesc {
    fn from(m: &tobj::Material) -> Self {
        let fallback = MaterialDesc::default();
        Self {
            name: m.name.clone(),
            ambient: m.ambient.unwrap_or(fallback.ambient),
            diffuse: m.diffuse.unwrap_or(fallback.diffuse),
            specular: m.specular.unwrap_or(fallback.specular),
            shininess: m.shininess.unwrap_or(fallback.shininess),
            dissolve: m.dissolve.unwrap_or(fallback.dissolve),
            diffuse_texture: m.diffuse_texture.clone(),
        }
    }
}

impl MaterialDesc {
    /// Diffuse texture name, if one is set and non-empty.
    pub fn diffuse_texture_name(&self) -> Option<&str> {
        self.diffuse_texture
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn shader_kind(&self) -> ShaderKind {
        if self.diffuse_texture_name().is_some() {
            ShaderKind::LambertTexture
        } else {
            ShaderKind::Lambert
        }
    }

    /// Diffuse colour with dissolve as alpha.
    pub fn base_color(&self) -> [f32; 4] {
        let [r, g, b] = self.diffuse;
        [r, g, b, self.dissolve.clamp(0.0, 1.0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_follows_texture_presence() {
        let mut desc = MaterialDesc::default();
        assert_eq!(desc.shader_kind(), ShaderKind::Lambert);

        desc.diffuse_texture = Some(String::new());
        assert_eq!(desc.shader_kind(), ShaderKind::Lambert);

        desc.diffuse_texture = Some("bricks.png".into());
        assert_eq!(desc.shader_kind(), ShaderKind::LambertTexture);
        assert_eq!(desc.shader_kind().name(), "lambert texture");
    }

    #[test]
    fn missing_mtl_fields_use_defaults() {
        let raw = tobj::Material {
            name: "red".into(),
            diffuse: Some([1.0, 0.0, 0.0]),
            dissolve: Some(0.5),
            ..Default::default()
        };
        let desc = MaterialDesc::from(&raw);
        assert_eq!(desc.name, "red");
        assert_eq!(desc.base_color(), [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(desc.specular, [0.0; 3]);
        assert_eq!(desc.diffuse_texture, None);
    }
}
