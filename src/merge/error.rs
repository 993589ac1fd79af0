//! Merge failure types.

use thiserror::Error;

/// Errors that abort a merge with no partial output.
///
/// Degraded-but-successful conditions (unmapped joints, skipped textures,
/// missing override names) are not errors; internal contract violations
/// panic instead of being reported.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// The source list is empty or contains no mesh with LOD data, so no
    /// common LOD count exists.
    #[error("source mesh list is empty or has no LOD data")]
    NoSourceMeshes,

    /// No source supplies a material, so there is nothing to atlas.
    #[error("source meshes supply no materials to atlas")]
    NoSourceMaterials,
}
