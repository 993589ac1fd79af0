//! Skinned mesh merging.
//!
//! [`MeshMerge`] combines a list of [`SourcePart`]s into a single
//! [`SkinnedMesh`] with one unified joint hierarchy, a merged material
//! whose textures live in shared atlases, merged attachment points, and
//! per-LOD vertex/index buffers laid out for one-draw-call rendering.
//!
//! The pipeline runs four stages in order: material/atlas merge, joint
//! hierarchy merge, per-LOD section grouping and buffer building, and
//! attachment-point merge. Everything is synchronous; only texture
//! compositing is deferred behind [`TextureCompositor::flush`].

mod attachments;
mod error;
mod lod;
mod materials;
mod sections;
mod skeleton;

pub use error::MergeError;
pub use sections::{GroupingPolicy, MaterialIdGrouping, PermissiveGrouping, SectionCandidate};

use std::sync::Arc;

use crate::atlas::UvTransform;
use crate::material::Material;
use crate::math::{Aabb, Transform, Vec2};
use crate::mesh::SkinnedMesh;
use crate::texture::TextureCompositor;

/// Maximum number of distinct joints one draw call's shader can address.
pub const MAX_GPU_SKIN_BONES: usize = 256;

/// One source mesh contribution to a merge.
#[derive(Debug, Clone)]
pub struct SourcePart {
    /// The source mesh.
    pub mesh: Arc<SkinnedMesh>,
    /// Joint of the unified hierarchy this part plugs into rigidly, if any.
    pub attach_joint: Option<String>,
    /// Affine transform applied to the part's vertices.
    pub transform: Transform,
}

impl SourcePart {
    /// Part with no attach joint and an identity transform.
    pub fn new(mesh: Arc<SkinnedMesh>) -> Self {
        Self {
            mesh,
            attach_joint: None,
            transform: Transform::identity(),
        }
    }

    /// Bind the part rigidly to a named joint of the unified hierarchy.
    #[must_use]
    pub fn with_attach_joint(mut self, joint: impl Into<String>) -> Self {
        self.attach_joint = Some(joint.into());
        self
    }

    /// Set the vertex transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// How a pose override propagates through the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// Override the named joint only.
    BoneOnly,
    /// Override every descendant of the named joint, not the joint itself.
    ChildrenOnly,
    /// Override the named joint and every descendant.
    Both,
}

/// One joint override entry.
#[derive(Debug, Clone)]
pub struct JointOverride {
    /// Joint name in the override source.
    pub joint: String,
    /// Propagation mode.
    pub mode: OverrideMode,
}

/// Bind-pose and attachment overrides taken from one source mesh.
#[derive(Debug, Clone)]
pub struct PoseOverride {
    /// Mesh whose bind pose supplies the override transforms.
    pub mesh: Arc<SkinnedMesh>,
    /// Joints to override.
    pub entries: Vec<JointOverride>,
}

/// Whether merged buffers must stay CPU-readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferAccess {
    /// Buffers may live in GPU-only memory.
    #[default]
    GpuOnly,
    /// Buffers must remain readable on the CPU after upload.
    CpuAndGpu,
}

/// How the unified joint hierarchy is built from the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyPolicy {
    /// The first non-empty source hierarchy is used verbatim.
    #[default]
    FirstSource,
    /// Subsequent sources' unique joints are appended, reparented by name;
    /// joints whose parent cannot be resolved are skipped.
    Union,
}

/// External material ids for one source's sections.
///
/// Sections with the same id merge into the same output material entry;
/// `None` entries fall back to the shared merged material.
#[derive(Debug, Clone, Default)]
pub struct SectionMaterialMapping {
    /// One id per section of the source, indexed by section.
    pub section_ids: Vec<Option<i32>>,
}

/// Merge configuration.
#[derive(Debug, Clone)]
pub struct MergeSettings {
    /// Number of finest LODs dropped before merging.
    pub strip_top_lods: usize,
    /// Buffer access mode for the merged LODs.
    pub buffer_access: BufferAccess,
    /// Per-draw-call bone budget for merged sections.
    pub bone_budget: usize,
    /// Joint hierarchy construction policy.
    pub hierarchy: HierarchyPolicy,
    /// Atlas page size in pixels.
    pub atlas_size: Vec2,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            strip_top_lods: 0,
            buffer_access: BufferAccess::GpuOnly,
            bone_budget: MAX_GPU_SKIN_BONES,
            hierarchy: HierarchyPolicy::FirstSource,
            atlas_size: Vec2::new(1024.0, 1024.0),
        }
    }
}

/// Per-merge intermediate state, owned by the orchestrator for the
/// duration of one [`MeshMerge::merge`] call.
struct MergeContext {
    /// Per-source, per-material UV remap transforms into atlas space.
    uv_transforms_per_mesh: Vec<Vec<UvTransform>>,
    /// Per-source joint remap tables into the unified hierarchy.
    remap_tables: Vec<Vec<u16>>,
    /// Per-source vertex transforms, rebased onto attach joints.
    part_transforms: Vec<Transform>,
    /// The shared merged material.
    merged_material: Material,
    /// Output material list, grown as sections resolve their ids.
    out_materials: Vec<Material>,
    /// Material id of each `out_materials` entry.
    material_ids: Vec<Option<i32>>,
    /// True if any source carries vertex colors.
    has_vertex_colors: bool,
}

/// Merges a list of source parts into one skinned mesh.
///
/// # Example
///
/// ```ignore
/// let merged = MeshMerge::new(parts, base_material)
///     .with_settings(MergeSettings::default())
///     .merge(&mut CpuCompositor::new())?;
/// ```
pub struct MeshMerge {
    parts: Vec<SourcePart>,
    base_material: Material,
    settings: MergeSettings,
    section_material_ids: Vec<SectionMaterialMapping>,
    pose_overrides: Vec<PoseOverride>,
    grouping: Box<dyn GroupingPolicy>,
}

impl MeshMerge {
    /// Create a merge over `parts`, using `base_material` as the template
    /// for the merged material.
    pub fn new(parts: Vec<SourcePart>, base_material: Material) -> Self {
        Self {
            parts,
            base_material,
            settings: MergeSettings::default(),
            section_material_ids: Vec::new(),
            pose_overrides: Vec::new(),
            grouping: Box::new(PermissiveGrouping),
        }
    }

    /// Set the merge configuration.
    #[must_use]
    pub fn with_settings(mut self, settings: MergeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Supply external section material ids. The mapping is honored only
    /// when its length equals the source list's.
    #[must_use]
    pub fn with_section_material_ids(mut self, mappings: Vec<SectionMaterialMapping>) -> Self {
        self.section_material_ids = mappings;
        self
    }

    /// Supply bind-pose and attachment overrides.
    #[must_use]
    pub fn with_pose_overrides(mut self, overrides: Vec<PoseOverride>) -> Self {
        self.pose_overrides = overrides;
        self
    }

    /// Replace the section grouping policy (defaults to
    /// [`PermissiveGrouping`]).
    #[must_use]
    pub fn with_grouping_policy(mut self, policy: Box<dyn GroupingPolicy>) -> Self {
        self.grouping = policy;
        self
    }

    /// Run the merge.
    ///
    /// Fails only when no common LOD count exists or no source supplies a
    /// material; all other degraded conditions are logged and survived.
    pub fn merge(
        &self,
        compositor: &mut dyn TextureCompositor,
    ) -> Result<SkinnedMesh, MergeError> {
        let Some(lod_count) = self.calculate_lod_count() else {
            log::warn!("mesh merge: invalid source mesh list");
            return Err(MergeError::NoSourceMeshes);
        };

        // Stage 1: materials and texture atlases.
        let (merged_material, uv_transforms_per_mesh) = materials::merge_materials(
            &self.parts,
            &self.base_material,
            self.settings.atlas_size,
            compositor,
        )?;

        // Stage 2: unified joint hierarchy, remap tables, overrides.
        let mut unified = skeleton::build_unified_skeleton(&self.parts, self.settings.hierarchy);
        skeleton::apply_pose_overrides(&mut unified, &self.pose_overrides);
        let component_space = unified.component_space_transforms();
        let (remap_tables, part_transforms) =
            skeleton::build_remap_tables(&self.parts, &unified, &component_space);

        let mut ctx = MergeContext {
            uv_transforms_per_mesh,
            remap_tables,
            part_transforms,
            merged_material,
            out_materials: Vec::new(),
            material_ids: Vec::new(),
            has_vertex_colors: self.parts.iter().any(|p| p.mesh.has_vertex_colors),
        };

        // Stage 3: per-LOD section grouping and buffer building.
        let mut lods = Vec::with_capacity(lod_count);
        for lod_idx in 0..lod_count {
            let source_lod = lod_idx + self.settings.strip_top_lods;
            let groups = sections::group_sections(
                &self.parts,
                &ctx.remap_tables,
                &ctx.uv_transforms_per_mesh,
                &ctx.part_transforms,
                &self.section_material_ids,
                self.grouping.as_ref(),
                self.settings.bone_budget,
                source_lod,
            );
            lods.push(lod::build_lod_model(
                &self.parts,
                &groups,
                &mut ctx,
                &unified,
                source_lod,
                self.settings.buffer_access,
            ));
        }

        // Stage 4: attachment points.
        let mut attachments = attachments::build_attachments(&self.parts, &unified);
        attachments::apply_attachment_overrides(&mut attachments, &self.pose_overrides);

        // Final bookkeeping: bounds union, inverse bind matrices.
        let mut bounds: Option<Aabb> = None;
        for part in &self.parts {
            if part.mesh.lods.is_empty() {
                continue;
            }
            bounds = Some(match bounds {
                None => part.mesh.bounds,
                Some(b) => b.union(&part.mesh.bounds),
            });
        }

        let inverse_bind_matrices = unified.inverse_bind_matrices();
        Ok(SkinnedMesh {
            name: None,
            skeleton: unified,
            materials: std::mem::take(&mut ctx.out_materials),
            lods,
            attachments,
            bounds: bounds.unwrap_or_default(),
            has_vertex_colors: ctx.has_vertex_colors,
            inverse_bind_matrices,
        })
    }

    /// Common LOD count: the minimum across usable sources, reduced by the
    /// stripped-LOD count but never below 1. `None` if no source has LODs.
    fn calculate_lod_count(&self) -> Option<usize> {
        let min = self
            .parts
            .iter()
            .filter(|p| !p.mesh.lods.is_empty())
            .map(|p| p.mesh.lod_count())
            .min()?;
        Some(min.saturating_sub(self.settings.strip_top_lods).max(1))
    }
}
