//! LOD model materialization.
//!
//! Builds one [`LodModel`] per output LOD by emitting every committed
//! section group as a [`RenderSection`] and concatenating the contributing
//! sections' vertex, skin-weight, color, and index data, with bone indices
//! rewritten into merged bone maps and UVs remapped into atlas space.

use std::collections::BTreeSet;

use crate::mesh::{
    DupVertexSpan, DuplicatedVertices, IndexData, LodModel, RenderSection, SkinnedVertex,
    MAX_INFLUENCES,
};
use crate::skeleton::Skeleton;

use super::sections::SectionGroup;
use super::{BufferAccess, MergeContext, SourcePart};

/// Materialize one merged LOD from the grouped sections.
pub(super) fn build_lod_model(
    parts: &[SourcePart],
    groups: &[SectionGroup],
    ctx: &mut MergeContext,
    unified: &Skeleton,
    lod_index: usize,
    buffer_access: BufferAccess,
) -> LodModel {
    let mut lod = LodModel::new();
    lod.needs_cpu_access = buffer_access == BufferAccess::CpuAndGpu;
    lod.screen_size = f32::MAX;
    lod.hysteresis = f32::MAX;

    // Destination vertex configuration, resolved once per LOD: the widest
    // source UV channel count and influence width win.
    let mut uv_count = 1u32;
    let mut has_extra_influences = false;
    for part in parts {
        if part.mesh.lods.is_empty() {
            continue;
        }
        let source_lod = part.mesh.lod(lod_index.min(part.mesh.lod_count() - 1));
        uv_count = uv_count.max(source_lod.uv_count);
        has_extra_influences |= source_lod.has_extra_influences;
    }
    lod.uv_count = uv_count;
    lod.has_extra_influences = has_extra_influences;

    let mut vertices: Vec<SkinnedVertex> = Vec::new();
    let mut skin_weights = Vec::new();
    let mut colors: Vec<[u8; 4]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut max_index = 0u32;
    let mut active_bones: Vec<u16> = Vec::new();
    let mut required_bones: BTreeSet<u16> = BTreeSet::new();

    for group in groups {
        for &bone in &group.merged_bone_map {
            if !active_bones.contains(&bone) {
                active_bones.push(bone);
            }
        }

        let mut section = RenderSection {
            material_index: resolve_material_index(ctx, group.material_id),
            bone_map: group.merged_bone_map.clone(),
            base_vertex: vertices.len() as u32,
            base_index: indices.len() as u32,
            ..Default::default()
        };
        let mut duplicated: Option<DuplicatedVertices> = None;

        for merge_section in &group.merge_sections {
            let mesh = &parts[merge_section.mesh_index].mesh;
            let src_lod = mesh.lod(merge_section.lod_index);
            let src_section = &src_lod.sections[merge_section.section_index];

            ctx.out_materials[section.material_index]
                .merge_uv_densities(mesh.materials[merge_section.material_index].uv_densities());

            // most conservative LOD switching across contributors
            lod.screen_size = lod.screen_size.min(src_lod.screen_size);
            lod.hysteresis = lod.hysteresis.min(src_lod.hysteresis);

            let remap = &ctx.remap_tables[merge_section.mesh_index];
            for &bone in &src_lod.required_bones {
                required_bones.insert(remap[bone as usize]);
            }

            // vertex copy
            let current_base = vertices.len() as u32;
            let vertex_end = (src_section.base_vertex + src_section.num_vertices)
                .min(src_lod.vertices.len() as u32);

            for vertex_index in src_section.base_vertex..vertex_end {
                let source = &src_lod.vertices[vertex_index as usize];
                let mut vertex = SkinnedVertex {
                    position: merge_section.transform.transform_point(source.position),
                    tangent: source.tangent,
                    normal: source.normal,
                    ..Default::default()
                };
                for channel in 0..src_lod.uv_count.min(uv_count) as usize {
                    let uv = source.uvs[channel];
                    vertex.uvs[channel] = match merge_section.uv_transforms.get(channel) {
                        Some(uv_remap) => uv_remap.apply(uv),
                        None => uv,
                    };
                }
                vertices.push(vertex);

                let mut weights = src_lod.skin_weights[vertex_index as usize];
                for slot in 0..MAX_INFLUENCES {
                    if weights.weights[slot] > 0 {
                        let local = weights.bones[slot] as usize;
                        weights.bones[slot] = merge_section.bone_map_to_merged[local] as u8;
                    }
                }
                skin_weights.push(weights);

                if ctx.has_vertex_colors {
                    // sources without colors contribute opaque white
                    let color = src_lod
                        .colors
                        .as_ref()
                        .and_then(|c| c.get(vertex_index as usize))
                        .copied()
                        .unwrap_or([255, 255, 255, 255]);
                    colors.push(color);
                }
            }
            section.num_vertices += src_section.num_vertices;

            // index copy, rebased into the merged vertex buffer
            section.num_triangles += src_section.num_triangles;
            let index_end = (src_section.base_index + src_section.num_triangles * 3)
                .min(src_lod.indices.len() as u32);
            for index_index in src_section.base_index..index_end {
                let source_index = src_lod.indices.get(index_index as usize);
                debug_assert!(source_index >= src_section.base_vertex);
                let dest_index = source_index - src_section.base_vertex + current_base;
                indices.push(dest_index);
                max_index = max_index.max(dest_index);
            }

            merge_duplicated_vertices(
                &mut duplicated,
                src_section,
                current_base - section.base_vertex,
                current_base,
            );
        }

        if let Some(dup) = &mut duplicated {
            dup.spans
                .resize(section.num_vertices as usize, DupVertexSpan::default());
        }
        section.duplicated_vertices = duplicated;
        lod.sections.push(section);
    }

    unified.ensure_parents_and_sort(&mut active_bones);
    lod.active_bones = active_bones;
    lod.required_bones = required_bones.into_iter().collect();
    lod.colors = ctx.has_vertex_colors.then_some(colors);
    lod.indices = IndexData::from_indices(indices, max_index);
    lod.vertices = vertices;
    lod.skin_weights = skin_weights;
    lod
}

/// Resolve a group's output material index through the per-merge id list,
/// appending a clone of the merged material for unseen ids.
fn resolve_material_index(ctx: &mut MergeContext, material_id: Option<i32>) -> usize {
    assert_eq!(
        ctx.out_materials.len(),
        ctx.material_ids.len(),
        "material list and id list diverged"
    );
    if let Some(found) = ctx.material_ids.iter().position(|id| *id == material_id) {
        return found;
    }
    ctx.out_materials.push(ctx.merged_material.clone());
    ctx.material_ids.push(material_id);
    ctx.out_materials.len() - 1
}

/// Concatenate one source section's duplicate-vertex data onto the merged
/// section's, rebasing entries into the merged vertex buffer and spans
/// past the entries already accumulated. Contributors without data leave a
/// gap of zero-length spans, filled by the resize calls.
fn merge_duplicated_vertices(
    duplicated: &mut Option<DuplicatedVertices>,
    src_section: &RenderSection,
    section_vertex_offset: u32,
    current_base: u32,
) {
    let Some(source) = &src_section.duplicated_vertices else {
        return;
    };
    let dup = duplicated.get_or_insert_with(DuplicatedVertices::default);
    dup.spans
        .resize(section_vertex_offset as usize, DupVertexSpan::default());
    let entry_offset = dup.vertex_indices.len() as u32;
    for &entry in &source.vertex_indices {
        debug_assert!(entry >= src_section.base_vertex);
        dup.vertex_indices
            .push(entry - src_section.base_vertex + current_base);
    }
    for span in &source.spans {
        dup.spans.push(DupVertexSpan {
            start: span.start + entry_offset,
            len: span.len,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicated_vertices_rebase_entries_and_spans() {
        let src_section = RenderSection {
            base_vertex: 10,
            num_vertices: 2,
            duplicated_vertices: Some(DuplicatedVertices {
                vertex_indices: vec![10, 11],
                spans: vec![
                    DupVertexSpan { start: 0, len: 2 },
                    DupVertexSpan { start: 0, len: 2 },
                ],
            }),
            ..Default::default()
        };

        // the merged section already holds 3 vertices from a contributor
        // without duplicate data
        let mut merged = None;
        merge_duplicated_vertices(&mut merged, &src_section, 3, 103);
        let merged = merged.unwrap();
        assert_eq!(merged.vertex_indices, vec![103, 104]);
        assert_eq!(merged.spans.len(), 5);
        assert_eq!(merged.spans[2], DupVertexSpan::default());
        assert_eq!(merged.spans[3], DupVertexSpan { start: 0, len: 2 });
    }

    #[test]
    fn second_contribution_offsets_span_starts() {
        let first = RenderSection {
            base_vertex: 0,
            num_vertices: 1,
            duplicated_vertices: Some(DuplicatedVertices {
                vertex_indices: vec![0],
                spans: vec![DupVertexSpan { start: 0, len: 1 }],
            }),
            ..Default::default()
        };
        let second = RenderSection {
            base_vertex: 4,
            num_vertices: 1,
            duplicated_vertices: Some(DuplicatedVertices {
                vertex_indices: vec![4, 5],
                spans: vec![DupVertexSpan { start: 0, len: 2 }],
            }),
            ..Default::default()
        };

        let mut merged = None;
        merge_duplicated_vertices(&mut merged, &first, 0, 0);
        merge_duplicated_vertices(&mut merged, &second, 1, 1);
        let merged = merged.unwrap();
        assert_eq!(merged.vertex_indices, vec![0, 1, 2]);
        assert_eq!(merged.spans[1], DupVertexSpan { start: 1, len: 2 });
    }
}
