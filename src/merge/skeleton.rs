//! Joint hierarchy merging and per-source bone remapping.

use crate::math::Transform;
use crate::skeleton::Skeleton;

use super::{HierarchyPolicy, OverrideMode, PoseOverride, SourcePart};

/// How many source ancestor levels the remap fallback inspects before
/// giving up and mapping to the root.
const REMAP_ANCESTOR_LEVELS: usize = 3;

/// Build the unified joint hierarchy.
///
/// With [`HierarchyPolicy::FirstSource`] the first non-empty source
/// hierarchy is taken verbatim, skeleton-level attachment points included.
/// With [`HierarchyPolicy::Union`], later sources' unique joints are
/// appended in source order, reparented by name; a joint whose parent name
/// is absent from the unified hierarchy is skipped. Appending keeps the
/// topological invariant because a source parent always precedes its
/// children.
pub(super) fn build_unified_skeleton(
    parts: &[SourcePart],
    policy: HierarchyPolicy,
) -> Skeleton {
    let mut unified = Skeleton::new();
    for part in parts {
        let source = &part.mesh.skeleton;
        if source.is_empty() {
            continue;
        }
        if unified.is_empty() {
            unified = source.clone();
            continue;
        }
        if policy == HierarchyPolicy::Union {
            for joint in source.joints().iter().skip(1) {
                if unified.find_joint(&joint.name).is_some() {
                    continue;
                }
                let parent_name = joint
                    .parent
                    .map(|p| source.joint(p).name.as_str())
                    .expect("non-root source joint has no parent");
                let Some(parent_index) = unified.find_joint(parent_name) else {
                    continue;
                };
                unified.add_joint(joint.name.clone(), Some(parent_index), joint.local);
            }
        }
    }
    unified
}

/// Build the per-source bone remap tables and the per-source vertex
/// transforms rebased onto attach joints.
///
/// The mapping is total: attach-joint binding wins, then exact name match,
/// then a bounded ancestor walk, then the root.
pub(super) fn build_remap_tables(
    parts: &[SourcePart],
    unified: &Skeleton,
    unified_component_space: &[Transform],
) -> (Vec<Vec<u16>>, Vec<Transform>) {
    let mut tables = Vec::with_capacity(parts.len());
    let mut transforms = Vec::with_capacity(parts.len());

    for part in parts {
        let source = &part.mesh.skeleton;
        let attach_index = part
            .attach_joint
            .as_deref()
            .and_then(|name| unified.find_joint(name));

        // A part plugged into an attach joint keeps its authored offset but
        // is carried from its own root space into the joint's space.
        let mut part_transform = part.transform;
        if let Some(attach) = attach_index {
            let source_root_inverse = source
                .component_space_transforms()
                .first()
                .map(|t| t.inverse())
                .unwrap_or_default();
            let binding = unified_component_space[attach];
            part_transform = &(&binding * &source_root_inverse) * &part_transform;
        }

        let mut table = Vec::with_capacity(source.len());
        for joint_index in 0..source.len() {
            let dest = attach_index
                .or_else(|| map_source_joint(source, unified, joint_index))
                .unwrap_or_else(|| {
                    log::debug!(
                        "mesh merge: joint {:?} has no match in the unified hierarchy, \
                         falling back to root",
                        source.joint(joint_index).name
                    );
                    0
                });
            table.push(dest as u16);
        }
        tables.push(table);
        transforms.push(part_transform);
    }

    (tables, transforms)
}

/// Exact name match, then up to [`REMAP_ANCESTOR_LEVELS`] ancestor names.
fn map_source_joint(source: &Skeleton, unified: &Skeleton, joint_index: usize) -> Option<usize> {
    if let Some(found) = unified.find_joint(&source.joint(joint_index).name) {
        return Some(found);
    }
    let mut ancestor = source.parent(joint_index);
    for _ in 0..REMAP_ANCESTOR_LEVELS {
        let index = ancestor?;
        if let Some(found) = unified.find_joint(&source.joint(index).name) {
            return Some(found);
        }
        ancestor = source.parent(index);
    }
    None
}

/// Copy overriding bind transforms into the unified hierarchy.
///
/// Names missing from either hierarchy are silently skipped.
pub(super) fn apply_pose_overrides(unified: &mut Skeleton, overrides: &[PoseOverride]) {
    for pose in overrides {
        let source = &pose.mesh.skeleton;
        for entry in &pose.entries {
            let Some(source_index) = source.find_joint(&entry.joint) else {
                continue;
            };
            if entry.mode != OverrideMode::ChildrenOnly {
                copy_joint_pose(source, source_index, unified);
            }
            if entry.mode != OverrideMode::BoneOnly {
                for child in (source_index + 1)..source.len() {
                    if source.is_descendant_of(child, source_index) {
                        copy_joint_pose(source, child, unified);
                    }
                }
            }
        }
    }
}

fn copy_joint_pose(source: &Skeleton, source_index: usize, unified: &mut Skeleton) {
    let joint = source.joint(source_index);
    if let Some(target) = unified.find_joint(&joint.name) {
        unified.set_local(target, joint.local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::mesh::{LodModel, SkinnedMesh};
    use crate::merge::JointOverride;
    use std::sync::Arc;

    fn chain(names: &[&str]) -> Skeleton {
        let mut skeleton = Skeleton::new();
        for (i, name) in names.iter().enumerate() {
            let parent = if i == 0 { None } else { Some(i - 1) };
            skeleton.add_joint(
                *name,
                parent,
                Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            );
        }
        skeleton
    }

    fn part(skeleton: Skeleton) -> SourcePart {
        SourcePart::new(Arc::new(
            SkinnedMesh::new(skeleton).with_lod(LodModel::new()),
        ))
    }

    #[test]
    fn first_source_policy_keeps_first_hierarchy_verbatim() {
        let parts = vec![
            part(chain(&["root", "spine", "head"])),
            part(chain(&["root", "tail"])),
        ];
        let unified = build_unified_skeleton(&parts, HierarchyPolicy::FirstSource);
        assert_eq!(unified.len(), 3);
        assert!(unified.find_joint("tail").is_none());
    }

    #[test]
    fn union_policy_appends_unique_joints() {
        let parts = vec![
            part(chain(&["root", "spine"])),
            part(chain(&["root", "tail", "tail_tip"])),
        ];
        let unified = build_unified_skeleton(&parts, HierarchyPolicy::Union);
        assert_eq!(unified.len(), 4);
        let tail = unified.find_joint("tail").unwrap();
        assert_eq!(unified.parent(tail), Some(0));
        let tip = unified.find_joint("tail_tip").unwrap();
        assert_eq!(unified.parent(tip), Some(tail));
        // invariant survives the append
        for (index, joint) in unified.joints().iter().enumerate() {
            if let Some(p) = joint.parent {
                assert!(p < index);
            }
        }
    }

    #[test]
    fn union_skips_joints_with_unresolved_parents() {
        let mut orphaned = Skeleton::new();
        orphaned.add_joint("other_root", None, Transform::identity());
        orphaned.add_joint("dangling", Some(0), Transform::identity());
        let parts = vec![part(chain(&["root", "spine"])), part(orphaned)];
        let unified = build_unified_skeleton(&parts, HierarchyPolicy::Union);
        // "other_root" is index 0 of its source and never considered;
        // "dangling" parents to it and cannot resolve
        assert_eq!(unified.len(), 2);
    }

    #[test]
    fn remap_prefers_exact_names_then_ancestors_then_root() {
        let unified_parts = vec![part(chain(&["root", "spine", "head"]))];
        let unified = build_unified_skeleton(&unified_parts, HierarchyPolicy::FirstSource);
        let cs = unified.component_space_transforms();

        // source with one matching joint, one joint whose parent matches,
        // and one joint too deep for the 3-level walk
        let mut source = Skeleton::new();
        source.add_joint("spine", None, Transform::identity());
        source.add_joint("extra_a", Some(0), Transform::identity());
        source.add_joint("extra_b", Some(1), Transform::identity());
        source.add_joint("extra_c", Some(2), Transform::identity());
        source.add_joint("extra_d", Some(3), Transform::identity());
        let parts = vec![part(source)];
        let (tables, _) = build_remap_tables(&parts, &unified, &cs);

        let spine = unified.find_joint("spine").unwrap() as u16;
        assert_eq!(tables[0][0], spine); // exact
        assert_eq!(tables[0][1], spine); // 1 ancestor level
        assert_eq!(tables[0][3], spine); // 3 ancestor levels
        assert_eq!(tables[0][4], 0); // beyond the walk: root
    }

    #[test]
    fn attach_joint_maps_every_source_joint() {
        let unified_parts = vec![part(chain(&["root", "spine", "hand_r"]))];
        let unified = build_unified_skeleton(&unified_parts, HierarchyPolicy::FirstSource);
        let cs = unified.component_space_transforms();

        let weapon = part(chain(&["grip", "blade"])).with_attach_joint("hand_r");
        let parts = vec![weapon];
        let (tables, transforms) = build_remap_tables(&parts, &unified, &cs);

        let hand = unified.find_joint("hand_r").unwrap() as u16;
        assert_eq!(tables[0], vec![hand, hand]);
        // the rebased transform carries the source root onto the attach joint
        let source_root = Vec3::new(0.0, 1.0, 0.0);
        let expected = cs[hand as usize].translation;
        assert!((transforms[0].transform_point(source_root) - expected).norm() < 1e-5);
    }

    #[test]
    fn pose_override_modes_select_joint_and_descendants() {
        let base = vec![part(chain(&["root", "spine", "head"]))];
        let moved = {
            let mut s = Skeleton::new();
            s.add_joint("root", None, Transform::identity());
            s.add_joint(
                "spine",
                Some(0),
                Transform::from_translation(Vec3::new(5.0, 0.0, 0.0)),
            );
            s.add_joint(
                "head",
                Some(1),
                Transform::from_translation(Vec3::new(6.0, 0.0, 0.0)),
            );
            s
        };
        let override_mesh = Arc::new(SkinnedMesh::new(moved));

        let mut bone_only = build_unified_skeleton(&base, HierarchyPolicy::FirstSource);
        apply_pose_overrides(
            &mut bone_only,
            &[PoseOverride {
                mesh: override_mesh.clone(),
                entries: vec![JointOverride {
                    joint: "spine".into(),
                    mode: OverrideMode::BoneOnly,
                }],
            }],
        );
        assert_eq!(
            bone_only.joint(1).local.translation,
            Vec3::new(5.0, 0.0, 0.0)
        );
        assert_eq!(
            bone_only.joint(2).local.translation,
            Vec3::new(0.0, 1.0, 0.0)
        );

        let mut children_only = build_unified_skeleton(&base, HierarchyPolicy::FirstSource);
        apply_pose_overrides(
            &mut children_only,
            &[PoseOverride {
                mesh: override_mesh,
                entries: vec![JointOverride {
                    joint: "spine".into(),
                    mode: OverrideMode::ChildrenOnly,
                }],
            }],
        );
        assert_eq!(
            children_only.joint(1).local.translation,
            Vec3::new(0.0, 1.0, 0.0)
        );
        assert_eq!(
            children_only.joint(2).local.translation,
            Vec3::new(6.0, 0.0, 0.0)
        );
    }

    #[test]
    fn pose_override_with_unknown_name_is_skipped() {
        let base = vec![part(chain(&["root", "spine"]))];
        let mut unified = build_unified_skeleton(&base, HierarchyPolicy::FirstSource);
        let before = unified.joint(1).local;
        apply_pose_overrides(
            &mut unified,
            &[PoseOverride {
                mesh: Arc::new(SkinnedMesh::new(chain(&["root", "spine"]))),
                entries: vec![JointOverride {
                    joint: "missing".into(),
                    mode: OverrideMode::Both,
                }],
            }],
        );
        assert_eq!(unified.joint(1).local, before);
    }
}
