//! CPU-side surface material definitions.
//!
//! A [`Material`] exposes its textures as named parameters, which is the
//! only surface the merge pipeline needs: the atlas stage reads the
//! parameters named by [`BASE_COLOR_PARAM`] and [`NORMAL_MAP_PARAM`] and
//! writes composited pages back under the same names.

use std::sync::Arc;

use crate::mesh::MAX_TEXCOORDS;
use crate::texture::CpuTexture;

/// Texture parameter sampled through the primary UV channel.
pub const BASE_COLOR_PARAM: &str = "base_color";

/// Normal map texture parameter (linear, not sRGB).
pub const NORMAL_MAP_PARAM: &str = "normal_map";

/// CPU-side material: named texture parameters plus per-channel UV density.
#[derive(Debug, Clone, Default)]
pub struct Material {
    /// Material name.
    pub name: Option<String>,
    textures: Vec<(String, Arc<CpuTexture>)>,
    uv_densities: [f32; MAX_TEXCOORDS],
}

impl Material {
    /// Creates a material with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the material name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a named texture parameter.
    #[must_use]
    pub fn with_texture(mut self, name: impl Into<String>, texture: Arc<CpuTexture>) -> Self {
        self.textures.push((name.into(), texture));
        self
    }

    /// Set the per-UV-channel texel densities.
    #[must_use]
    pub fn with_uv_densities(mut self, densities: [f32; MAX_TEXCOORDS]) -> Self {
        self.uv_densities = densities;
        self
    }

    /// Look up a texture parameter by name.
    pub fn texture_parameter(&self, name: &str) -> Option<&Arc<CpuTexture>> {
        self.textures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Replace a texture parameter, adding it if absent.
    pub fn set_texture_parameter(&mut self, name: &str, texture: Arc<CpuTexture>) {
        match self.textures.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = texture,
            None => self.textures.push((name.to_string(), texture)),
        }
    }

    /// Per-UV-channel texel densities.
    pub fn uv_densities(&self) -> &[f32; MAX_TEXCOORDS] {
        &self.uv_densities
    }

    /// Raise each channel's density to at least the matching channel of
    /// `other`.
    pub fn merge_uv_densities(&mut self, other: &[f32; MAX_TEXCOORDS]) {
        for (own, new) in self.uv_densities.iter_mut().zip(other) {
            *own = own.max(*new);
        }
    }
}
