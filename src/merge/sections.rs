//! Section grouping under the per-draw-call bone budget.
//!
//! Source sections are folded into merge groups whose merged bone maps stay
//! within the configured budget. Whether two sections are allowed to fold
//! at all is a [`GroupingPolicy`] decision; the budget check is not.

use crate::atlas::UvTransform;
use crate::math::Transform;

use super::{SectionMaterialMapping, SourcePart};

/// A source section scheduled into a merge group.
#[derive(Debug, Clone)]
pub(super) struct MergeSectionInfo {
    /// Index of the owning source part.
    pub mesh_index: usize,
    /// Source LOD the section was taken from (clamped).
    pub lod_index: usize,
    /// Section index within that LOD.
    pub section_index: usize,
    /// Effective source material index (per-LOD material map applied).
    pub material_index: usize,
    /// Per-channel UV remap transforms into atlas space.
    pub uv_transforms: Vec<UvTransform>,
    /// Vertex transform of the owning part.
    pub transform: Transform,
    /// Maps the section's local bone-map indices to positions in the
    /// group's merged bone map.
    pub bone_map_to_merged: Vec<u16>,
}

/// A group of source sections that will emit one merged render section.
#[derive(Debug, Clone)]
pub(super) struct SectionGroup {
    /// External material id, if one was supplied.
    pub material_id: Option<i32>,
    /// Merged bone map in first-seen order, unique, within budget.
    pub merged_bone_map: Vec<u16>,
    /// Contributing sections in input order.
    pub merge_sections: Vec<MergeSectionInfo>,
}

/// A candidate section presented to a [`GroupingPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct SectionCandidate {
    /// Index of the owning source part.
    pub mesh_index: usize,
    /// Section index within the source LOD.
    pub section_index: usize,
    /// Effective source material index.
    pub material_index: usize,
    /// External material id, if one was supplied.
    pub material_id: Option<i32>,
}

/// Decides whether a candidate section may fold into an existing group.
///
/// The bone-budget check always applies on top of this decision.
pub trait GroupingPolicy {
    /// True if `candidate` may fold into a group carrying
    /// `group_material_id`.
    fn can_fold(&self, candidate: &SectionCandidate, group_material_id: Option<i32>) -> bool;
}

/// Folds sections regardless of material identity once the bone budget
/// allows; every group renders with the shared merged material anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveGrouping;

impl GroupingPolicy for PermissiveGrouping {
    fn can_fold(&self, _candidate: &SectionCandidate, _group_material_id: Option<i32>) -> bool {
        true
    }
}

/// Folds only sections whose external material ids match.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialIdGrouping;

impl GroupingPolicy for MaterialIdGrouping {
    fn can_fold(&self, candidate: &SectionCandidate, group_material_id: Option<i32>) -> bool {
        candidate.material_id == group_material_id
    }
}

/// Merge `bone_map` into `merged`, preserving first-seen order, and return
/// the translation table from `bone_map` positions to `merged` positions.
pub(super) fn merge_bone_map(merged: &mut Vec<u16>, bone_map: &[u16]) -> Vec<u16> {
    let mut table = Vec::with_capacity(bone_map.len());
    for &bone in bone_map {
        let position = match merged.iter().position(|&b| b == bone) {
            Some(found) => found,
            None => {
                merged.push(bone);
                merged.len() - 1
            }
        };
        table.push(position as u16);
    }
    table
}

/// Partition every source section of `lod_index` into merge groups.
#[allow(clippy::too_many_arguments)]
pub(super) fn group_sections(
    parts: &[SourcePart],
    remap_tables: &[Vec<u16>],
    uv_transforms_per_mesh: &[Vec<UvTransform>],
    part_transforms: &[Transform],
    section_material_ids: &[SectionMaterialMapping],
    policy: &dyn GroupingPolicy,
    bone_budget: usize,
    lod_index: usize,
) -> Vec<SectionGroup> {
    let mut groups: Vec<SectionGroup> = Vec::new();

    for (mesh_index, part) in parts.iter().enumerate() {
        let mesh = &part.mesh;
        if mesh.lods.is_empty() {
            continue;
        }
        let source_lod = lod_index.min(mesh.lod_count() - 1);
        let lod = mesh.lod(source_lod);

        for (section_index, section) in lod.sections.iter().enumerate() {
            // the external id list is honored only when it covers the
            // whole source list
            let material_id = if section_material_ids.len() == parts.len() {
                section_material_ids[mesh_index]
                    .section_ids
                    .get(section_index)
                    .copied()
                    .flatten()
            } else {
                None
            };

            let remap = &remap_tables[mesh_index];
            let dest_bone_map: Vec<u16> = section
                .bone_map
                .iter()
                .map(|&bone| remap[bone as usize])
                .collect();

            let material_index =
                lod.remapped_material_index(section, source_lod, mesh.materials.len());
            let candidate = SectionCandidate {
                mesh_index,
                section_index,
                material_index,
                material_id,
            };

            let merge_section = |bone_map_to_merged: Vec<u16>| MergeSectionInfo {
                mesh_index,
                lod_index: source_lod,
                section_index,
                material_index,
                uv_transforms: uv_transforms_per_mesh[mesh_index].clone(),
                transform: part_transforms[mesh_index],
                bone_map_to_merged,
            };

            let mut folded = false;
            for group in groups.iter_mut() {
                if !policy.can_fold(&candidate, group.material_id) {
                    continue;
                }
                let mut tentative = group.merged_bone_map.clone();
                let table = merge_bone_map(&mut tentative, &dest_bone_map);
                if tentative.len() <= bone_budget {
                    group.merged_bone_map = tentative;
                    group.merge_sections.push(merge_section(table));
                    folded = true;
                    break;
                }
            }

            if !folded {
                // identity translation: the group's map is the section's map
                let identity = (0..dest_bone_map.len() as u16).collect();
                groups.push(SectionGroup {
                    material_id,
                    merged_bone_map: dest_bone_map,
                    merge_sections: vec![merge_section(identity)],
                });
            }
        }
    }

    groups
}
