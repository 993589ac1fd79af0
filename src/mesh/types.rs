//! Skinned mesh data types.

use crate::material::Material;
use crate::math::{Aabb, Mat4, Vec2, Vec3};
use crate::skeleton::{AttachmentPoint, Skeleton};

/// Maximum number of UV channels a vertex format can carry.
pub const MAX_TEXCOORDS: usize = 4;

/// Maximum bone influences per vertex (4 standard + 4 extra).
pub const MAX_INFLUENCES: usize = 8;

/// A vertex of the static (non-skinning) stream: position, tangent basis,
/// and up to [`MAX_TEXCOORDS`] UV channels. The number of channels in use
/// is tracked on the owning [`LodModel`], not per vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinnedVertex {
    /// Position in mesh space.
    pub position: Vec3,
    /// Tangent (X axis of the tangent basis).
    pub tangent: Vec3,
    /// Normal (Z axis of the tangent basis).
    pub normal: Vec3,
    /// UV channels; channels beyond the LOD's channel count are zero.
    pub uvs: [Vec2; MAX_TEXCOORDS],
}

impl Default for SkinnedVertex {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            tangent: Vec3::zeros(),
            normal: Vec3::zeros(),
            uvs: [Vec2::zeros(); MAX_TEXCOORDS],
        }
    }
}

/// Per-vertex skin weights.
///
/// Bone indices address the owning section's bone map. Buffers carrying
/// only 4 influences leave the upper slots zeroed; whether the extra slots
/// are meaningful is tracked on the owning [`LodModel`].
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct SkinWeights {
    /// Influence bone indices into the section bone map.
    pub bones: [u8; MAX_INFLUENCES],
    /// Influence weights; 0 marks an unused slot.
    pub weights: [u8; MAX_INFLUENCES],
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers.
    #[default]
    Uint16,
    /// 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// An index buffer in its narrowest sufficient width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    /// 16-bit indices.
    U16(Vec<u16>),
    /// 32-bit indices.
    U32(Vec<u32>),
}

impl IndexData {
    /// Build from 32-bit indices, choosing 16-bit width iff every index
    /// (bounded by `max_index`) fits, i.e. `max_index < 65536`.
    pub fn from_indices(indices: Vec<u32>, max_index: u32) -> Self {
        if (max_index as usize) < 1 << 16 {
            Self::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            Self::U32(indices)
        }
    }

    /// Number of indices.
    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    /// True if the buffer holds no indices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index value at `i`, widened to u32.
    pub fn get(&self, i: usize) -> u32 {
        match self {
            Self::U16(v) => v[i] as u32,
            Self::U32(v) => v[i],
        }
    }

    /// Storage format of this buffer.
    pub fn format(&self) -> IndexFormat {
        match self {
            Self::U16(_) => IndexFormat::Uint16,
            Self::U32(_) => IndexFormat::Uint32,
        }
    }

    /// Raw little-endian bytes, for GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

impl Default for IndexData {
    fn default() -> Self {
        Self::U16(Vec::new())
    }
}

/// One vertex's run of duplicate entries in
/// [`DuplicatedVertices::vertex_indices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DupVertexSpan {
    /// First entry of the run.
    pub start: u32,
    /// Run length; 0 for vertices without duplicates.
    pub len: u32,
}

/// Duplicate-vertex acceleration data for one section.
///
/// `spans` holds one entry per section vertex; each span points into
/// `vertex_indices`, which lists LOD-buffer indices of vertices sharing the
/// same position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicatedVertices {
    /// Concatenated duplicate vertex indices (LOD-buffer space).
    pub vertex_indices: Vec<u32>,
    /// Per-vertex runs into `vertex_indices`.
    pub spans: Vec<DupVertexSpan>,
}

/// A contiguous run of a LOD's vertex/index data sharing one material and
/// one bone map.
#[derive(Debug, Clone, Default)]
pub struct RenderSection {
    /// Index into the owning mesh's material list.
    pub material_index: usize,
    /// Joint indices (into the mesh skeleton) addressed by this section's
    /// skin weights, in first-seen order.
    pub bone_map: Vec<u16>,
    /// First vertex of this section in the LOD vertex buffer.
    pub base_vertex: u32,
    /// Number of vertices.
    pub num_vertices: u32,
    /// First index of this section in the LOD index buffer.
    pub base_index: u32,
    /// Number of triangles.
    pub num_triangles: u32,
    /// Duplicate-vertex data, if any source supplied it.
    pub duplicated_vertices: Option<DuplicatedVertices>,
}

/// Render data for one level of detail.
#[derive(Debug, Clone)]
pub struct LodModel {
    /// Sections, in draw order.
    pub sections: Vec<RenderSection>,
    /// Static vertex stream.
    pub vertices: Vec<SkinnedVertex>,
    /// Skin-weight stream, parallel to `vertices`.
    pub skin_weights: Vec<SkinWeights>,
    /// Vertex colors, parallel to `vertices`, if the mesh carries them.
    pub colors: Option<Vec<[u8; 4]>>,
    /// Index buffer.
    pub indices: IndexData,
    /// Number of UV channels in use (1..=[`MAX_TEXCOORDS`]).
    pub uv_count: u32,
    /// True if the skin-weight stream carries 8 influences per vertex.
    pub has_extra_influences: bool,
    /// All joints referenced by this LOD's sections, sorted ascending.
    pub active_bones: Vec<u16>,
    /// Joints that must be evaluated for this LOD, sorted ascending.
    pub required_bones: Vec<u16>,
    /// Screen-size threshold at which this LOD is selected.
    pub screen_size: f32,
    /// Hysteresis applied around the screen-size threshold.
    pub hysteresis: f32,
    /// True if buffers must stay CPU-readable after upload.
    pub needs_cpu_access: bool,
    /// Per-LOD material remap applied to section material indices on LOD
    /// levels above 0; empty = identity.
    pub material_map: Vec<usize>,
}

impl LodModel {
    /// Creates an empty LOD with one UV channel and default thresholds.
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            vertices: Vec::new(),
            skin_weights: Vec::new(),
            colors: None,
            indices: IndexData::default(),
            uv_count: 1,
            has_extra_influences: false,
            active_bones: Vec::new(),
            required_bones: Vec::new(),
            screen_size: 1.0,
            hysteresis: 0.0,
            needs_cpu_access: false,
            material_map: Vec::new(),
        }
    }

    /// Effective material index of `section` at `lod_index`, honoring the
    /// per-LOD material map (clamped into `material_count`).
    pub fn remapped_material_index(
        &self,
        section: &RenderSection,
        lod_index: usize,
        material_count: usize,
    ) -> usize {
        if lod_index > 0 && section.material_index < self.material_map.len() {
            self.material_map[section.material_index].min(material_count.saturating_sub(1))
        } else {
            section.material_index
        }
    }
}

impl Default for LodModel {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete skinned mesh asset: hierarchy, materials, per-LOD render
/// data, and attachment points.
#[derive(Debug, Clone, Default)]
pub struct SkinnedMesh {
    /// Mesh name.
    pub name: Option<String>,
    /// Joint hierarchy driving the skin.
    pub skeleton: Skeleton,
    /// Surface materials addressed by section material indices.
    pub materials: Vec<Material>,
    /// Render data, finest LOD first.
    pub lods: Vec<LodModel>,
    /// Mesh-level attachment points.
    pub attachments: Vec<AttachmentPoint>,
    /// Object-space bounds.
    pub bounds: Aabb,
    /// True if any LOD carries vertex colors.
    pub has_vertex_colors: bool,
    /// Inverse bind matrices, one per joint of `skeleton`.
    pub inverse_bind_matrices: Vec<Mat4>,
}

impl SkinnedMesh {
    /// Creates an empty mesh over the given skeleton.
    pub fn new(skeleton: Skeleton) -> Self {
        Self {
            skeleton,
            bounds: Aabb::zero(),
            ..Self::default()
        }
    }

    /// Set the mesh name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the material list.
    #[must_use]
    pub fn with_materials(mut self, materials: Vec<Material>) -> Self {
        self.materials = materials;
        self
    }

    /// Append a LOD.
    #[must_use]
    pub fn with_lod(mut self, lod: LodModel) -> Self {
        self.lods.push(lod);
        self
    }

    /// Set the mesh-level attachment points.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<AttachmentPoint>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Set the object-space bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    /// Number of LODs.
    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    /// Render data for LOD `index`.
    pub fn lod(&self, index: usize) -> &LodModel {
        &self.lods[index]
    }
}
