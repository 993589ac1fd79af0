//! Skinned mesh data structures.
//!
//! This module provides:
//! - [`SkinnedMesh`] - A complete skinned mesh asset
//! - [`LodModel`] - Per-LOD render data (sections, buffers, bone lists)
//! - [`RenderSection`] - A contiguous run of geometry with one bone map
//! - [`SkinnedVertex`] / [`SkinWeights`] - Vertex buffer element types
//! - [`IndexData`] / [`IndexFormat`] - 16- or 32-bit index buffers
//! - [`DuplicatedVertices`] - Per-section duplicate-vertex acceleration data

mod types;

pub use types::{
    DupVertexSpan, DuplicatedVertices, IndexData, IndexFormat, LodModel, RenderSection,
    SkinWeights, SkinnedMesh, SkinnedVertex, MAX_INFLUENCES, MAX_TEXCOORDS,
};
