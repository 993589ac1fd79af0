//! Attachment-point merging.
//!
//! Every source's mesh-level and skeleton-level attachment points merge
//! into the output by name, first source wins, no duplicate names. The
//! pose-override list can then retarget specific points, propagating to
//! descendants with the same mode semantics as the bind-pose overrides.

use crate::skeleton::{AttachmentPoint, Skeleton};

use super::{OverrideMode, PoseOverride, SourcePart};

/// Merge all sources' attachment points.
///
/// Mesh-level points of every source are considered first, then
/// skeleton-level points; a point is dropped if its name is already taken
/// in the output or (for skeleton-level points) already carried by the
/// unified skeleton itself.
pub(super) fn build_attachments(
    parts: &[SourcePart],
    unified: &Skeleton,
) -> Vec<AttachmentPoint> {
    let mut merged: Vec<AttachmentPoint> = Vec::new();

    for part in parts {
        for point in &part.mesh.attachments {
            add_point(&mut merged, unified, point, false);
        }
    }
    for part in parts {
        for point in &part.mesh.skeleton.attachments {
            add_point(&mut merged, unified, point, true);
        }
    }

    merged
}

fn add_point(
    merged: &mut Vec<AttachmentPoint>,
    unified: &Skeleton,
    point: &AttachmentPoint,
    from_skeleton: bool,
) {
    if merged.iter().any(|existing| existing.name == point.name) {
        return;
    }
    // the unified skeleton is shared state; points it already carries are
    // not duplicated onto the mesh
    if from_skeleton
        && unified
            .attachments
            .iter()
            .any(|existing| existing.name == point.name)
    {
        return;
    }
    merged.push(point.clone());
}

/// Retarget merged attachment points from the override sources.
pub(super) fn apply_attachment_overrides(
    merged: &mut [AttachmentPoint],
    overrides: &[PoseOverride],
) {
    for pose in overrides {
        let source_skeleton = &pose.mesh.skeleton;
        for entry in &pose.entries {
            let Some(source_index) = source_skeleton.find_joint(&entry.joint) else {
                continue;
            };
            if entry.mode != OverrideMode::ChildrenOnly {
                override_joint_points(merged, &pose.mesh.attachments, &entry.joint);
                override_joint_points(merged, &source_skeleton.attachments, &entry.joint);
            }
            if entry.mode != OverrideMode::BoneOnly {
                for child in (source_index + 1)..source_skeleton.len() {
                    if source_skeleton.is_descendant_of(child, source_index) {
                        let child_name = &source_skeleton.joint(child).name;
                        override_joint_points(merged, &pose.mesh.attachments, child_name);
                        override_joint_points(merged, &source_skeleton.attachments, child_name);
                    }
                }
            }
        }
    }
}

/// Copy every source point hanging off `joint_name` onto the same-named
/// merged point, if one exists.
fn override_joint_points(
    merged: &mut [AttachmentPoint],
    source_points: &[AttachmentPoint],
    joint_name: &str,
) {
    for source in source_points.iter().filter(|p| p.joint == joint_name) {
        for target in merged.iter_mut().filter(|p| p.name == source.name) {
            target.joint = source.joint.clone();
            target.transform = source.transform;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Transform, Vec3};
    use crate::merge::JointOverride;
    use crate::mesh::SkinnedMesh;
    use std::sync::Arc;

    fn point(name: &str, joint: &str, x: f32) -> AttachmentPoint {
        AttachmentPoint {
            name: name.into(),
            joint: joint.into(),
            transform: Transform::from_translation(Vec3::new(x, 0.0, 0.0)),
        }
    }

    fn skeleton(names: &[&str]) -> Skeleton {
        let mut s = Skeleton::new();
        for (i, name) in names.iter().enumerate() {
            let parent = if i == 0 { None } else { Some(i - 1) };
            s.add_joint(*name, parent, Transform::identity());
        }
        s
    }

    fn part(mesh: SkinnedMesh) -> SourcePart {
        SourcePart::new(Arc::new(mesh))
    }

    #[test]
    fn colliding_names_keep_the_first_source() {
        let a = SkinnedMesh::new(skeleton(&["root"]))
            .with_attachments(vec![point("hand_r", "root", 1.0)]);
        let b = SkinnedMesh::new(skeleton(&["root"]))
            .with_attachments(vec![point("hand_r", "root", 2.0)]);
        let merged = build_attachments(&[part(a), part(b)], &skeleton(&["root"]));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].transform.translation.x, 1.0);
    }

    #[test]
    fn skeleton_level_points_respect_unified_skeleton_names() {
        let mut source_skeleton = skeleton(&["root"]);
        source_skeleton.attachments = vec![point("crown", "root", 3.0)];
        let source = SkinnedMesh::new(source_skeleton);

        let mut unified = skeleton(&["root"]);
        unified.attachments = vec![point("crown", "root", 0.0)];
        let merged = build_attachments(&[part(source)], &unified);
        assert!(merged.is_empty());
    }

    #[test]
    fn mesh_level_points_merge_before_skeleton_level() {
        let mut source_skeleton = skeleton(&["root"]);
        source_skeleton.attachments = vec![point("lamp", "root", 9.0)];
        let source = SkinnedMesh::new(source_skeleton)
            .with_attachments(vec![point("lamp", "root", 4.0)]);
        let merged = build_attachments(&[part(source)], &skeleton(&["root"]));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].transform.translation.x, 4.0);
    }

    #[test]
    fn overrides_retarget_matching_points_and_descendants() {
        let mut merged = vec![
            point("hand_r", "old_joint", 0.0),
            point("elbow_pad", "old_joint", 0.0),
        ];

        let override_mesh = SkinnedMesh::new(skeleton(&["root", "arm", "hand"]))
            .with_attachments(vec![
                point("hand_r", "hand", 7.0),
                point("elbow_pad", "arm", 5.0),
            ]);
        apply_attachment_overrides(
            &mut merged,
            &[PoseOverride {
                mesh: Arc::new(override_mesh),
                entries: vec![JointOverride {
                    joint: "arm".into(),
                    mode: OverrideMode::Both,
                }],
            }],
        );

        // "elbow_pad" hangs off the named joint, "hand_r" off a descendant
        assert_eq!(merged[0].joint, "hand");
        assert_eq!(merged[0].transform.translation.x, 7.0);
        assert_eq!(merged[1].joint, "arm");
        assert_eq!(merged[1].transform.translation.x, 5.0);
    }

    #[test]
    fn bone_only_override_leaves_descendant_points_alone() {
        let mut merged = vec![point("hand_r", "old_joint", 0.0)];
        let override_mesh = SkinnedMesh::new(skeleton(&["root", "arm", "hand"]))
            .with_attachments(vec![point("hand_r", "hand", 7.0)]);
        apply_attachment_overrides(
            &mut merged,
            &[PoseOverride {
                mesh: Arc::new(override_mesh),
                entries: vec![JointOverride {
                    joint: "arm".into(),
                    mode: OverrideMode::BoneOnly,
                }],
            }],
        );
        assert_eq!(merged[0].joint, "old_joint");
    }
}
