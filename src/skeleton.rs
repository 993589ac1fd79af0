//! Joint hierarchy arena.
//!
//! A [`Skeleton`] stores joints in a flat, topologically ordered array:
//! every joint's parent index is strictly less than its own index and the
//! root sits at index 0. The invariant is enforced when joints are added,
//! which lets forward-kinematic passes run as a single loop instead of a
//! tree traversal.

use crate::math::{Mat4, Transform};

/// A named rigid transform in the hierarchy.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Joint name, unique within a hierarchy.
    pub name: String,
    /// Parent index (`None` only for the root).
    pub parent: Option<usize>,
    /// Local bind transform relative to the parent.
    pub local: Transform,
}

/// A named, joint-relative transform used to parent external objects.
#[derive(Debug, Clone)]
pub struct AttachmentPoint {
    /// Attachment name, unique within a mesh.
    pub name: String,
    /// Name of the joint this point hangs off.
    pub joint: String,
    /// Transform relative to the joint.
    pub transform: Transform,
}

/// An ordered joint hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
    /// Skeleton-level attachment points.
    pub attachments: Vec<AttachmentPoint>,
}

impl Skeleton {
    /// Creates an empty skeleton.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a joint and return its index.
    ///
    /// # Panics
    ///
    /// Panics if the topological invariant would break: the first joint
    /// must be parentless, every later joint must name a parent with a
    /// smaller index.
    pub fn add_joint(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        local: Transform,
    ) -> usize {
        let index = self.joints.len();
        match parent {
            None => assert!(index == 0, "only the root joint may be parentless"),
            Some(p) => assert!(p < index, "joint parent must precede the joint"),
        }
        self.joints.push(Joint {
            name: name.into(),
            parent,
            local,
        });
        index
    }

    /// Number of joints.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// True if the skeleton has no joints.
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// All joints in topological order.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Joint at `index`.
    pub fn joint(&self, index: usize) -> &Joint {
        &self.joints[index]
    }

    /// Find a joint index by name.
    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Parent index of the joint at `index`.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints[index].parent
    }

    /// Replace a joint's local bind transform.
    pub fn set_local(&mut self, index: usize, local: Transform) {
        self.joints[index].local = local;
    }

    /// True if `joint` sits below `ancestor` in the hierarchy.
    pub fn is_descendant_of(&self, joint: usize, ancestor: usize) -> bool {
        let mut current = self.joints[joint].parent;
        while let Some(idx) = current {
            if idx == ancestor {
                return true;
            }
            current = self.joints[idx].parent;
        }
        false
    }

    /// Component-space transform of every joint.
    ///
    /// One forward pass: each joint composes its local transform onto its
    /// parent's already-computed transform (parents precede children), with
    /// the rotation re-normalized after each composition.
    pub fn component_space_transforms(&self) -> Vec<Transform> {
        let mut out: Vec<Transform> = Vec::with_capacity(self.joints.len());
        for joint in &self.joints {
            let cs = match joint.parent {
                Some(p) => {
                    let mut cs = &out[p] * &joint.local;
                    cs.normalize_rotation();
                    cs
                }
                None => joint.local,
            };
            out.push(cs);
        }
        out
    }

    /// Inverse bind matrix of every joint, from the bind pose.
    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.component_space_transforms()
            .iter()
            .map(|t| t.to_matrix().try_inverse().unwrap_or_else(Mat4::identity))
            .collect()
    }

    /// Complete `bones` with every ancestor of its entries, deduplicated
    /// and sorted ascending.
    pub fn ensure_parents_and_sort(&self, bones: &mut Vec<u16>) {
        let mut closed = std::collections::BTreeSet::new();
        for &bone in bones.iter() {
            let mut index = bone as usize;
            loop {
                closed.insert(index as u16);
                match self.joints[index].parent {
                    Some(p) => index = p,
                    None => break,
                }
            }
        }
        *bones = closed.into_iter().collect();
    }
}
