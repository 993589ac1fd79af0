//! # skelmerge
//!
//! Merges multiple independently-authored skinned mesh assets, each with
//! its own joint hierarchy, materials, and per-LOD geometry, into a single
//! [`mesh::SkinnedMesh`] suitable for one-draw-call rendering.
//!
//! The pipeline packs source textures into shared atlases ([`atlas`]),
//! unifies the joint hierarchies and remaps every vertex's bone influences
//! under a per-draw-call bone budget ([`merge`]), and concatenates per-LOD
//! vertex/index buffers while preserving skinning, UV mapping, colors, and
//! duplicate-vertex metadata.
//!
//! ```ignore
//! use skelmerge::merge::{MeshMerge, SourcePart};
//! use skelmerge::texture::CpuCompositor;
//!
//! let parts = vec![SourcePart::new(body), SourcePart::new(head)];
//! let merged = MeshMerge::new(parts, base_material)
//!     .merge(&mut CpuCompositor::new())?;
//! ```

pub mod atlas;
pub mod material;
pub mod math;
pub mod merge;
pub mod mesh;
pub mod skeleton;
pub mod texture;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
