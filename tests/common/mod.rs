//! Synthetic source meshes for merge tests.

use std::sync::Arc;

use skelmerge::material::{Material, BASE_COLOR_PARAM};
use skelmerge::math::{Transform, Vec2, Vec3};
use skelmerge::mesh::{
    IndexData, LodModel, RenderSection, SkinWeights, SkinnedMesh, SkinnedVertex, MAX_TEXCOORDS,
};
use skelmerge::skeleton::Skeleton;
use skelmerge::texture::{CpuTexture, TextureFormat};

/// A chain skeleton: each joint parents to the previous one and sits one
/// unit above it.
pub fn chain(names: &[&str]) -> Skeleton {
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

/// A material whose base-color texture is a square of `tex_size` pixels.
pub fn base_material(tex_size: u32) -> Material {
    Material::new().with_texture(
        BASE_COLOR_PARAM,
        Arc::new(CpuTexture::new(tex_size, tex_size, TextureFormat::Rgba8)),
    )
}

/// A LOD with `vertex_count` vertices in a row (positions `(i, 0, 0)`, UV
/// `(0.5, 0.5)`), all fully weighted to local bone 0, and a triangle list
/// over consecutive triples. `vertex_count` must be a multiple of 3.
pub fn row_lod(vertex_count: u32, bone_map: Vec<u16>) -> LodModel {
    assert_eq!(vertex_count % 3, 0);
    let mut lod = LodModel::new();
    for i in 0..vertex_count {
        lod.vertices.push(SkinnedVertex {
            position: Vec3::new(i as f32, 0.0, 0.0),
            tangent: Vec3::new(1.0, 0.0, 0.0),
            normal: Vec3::new(0.0, 0.0, 1.0),
            uvs: [Vec2::new(0.5, 0.5); MAX_TEXCOORDS],
        });
        let mut weights = SkinWeights::default();
        weights.weights[0] = 255;
        lod.skin_weights.push(weights);
    }
    let mut required = bone_map.clone();
    required.sort_unstable();
    lod.required_bones = required;
    lod.sections.push(RenderSection {
        bone_map,
        num_vertices: vertex_count,
        num_triangles: vertex_count / 3,
        ..Default::default()
    });
    lod.indices = IndexData::from_indices(
        (0..vertex_count).collect(),
        vertex_count.saturating_sub(1),
    );
    lod
}

/// A LOD whose single triangle references vertex 0, 1, and the last
/// vertex, pinning the maximum emitted index to `vertex_count - 1`.
pub fn spanning_lod(vertex_count: u32, bone_map: Vec<u16>) -> LodModel {
    let mut lod = LodModel::new();
    lod.vertices = vec![SkinnedVertex::default(); vertex_count as usize];
    lod.skin_weights = vec![
        SkinWeights {
            bones: [0; 8],
            weights: [255, 0, 0, 0, 0, 0, 0, 0],
        };
        vertex_count as usize
    ];
    lod.sections.push(RenderSection {
        bone_map,
        num_vertices: vertex_count,
        num_triangles: 1,
        ..Default::default()
    });
    lod.indices =
        IndexData::from_indices(vec![0, 1, vertex_count - 1], vertex_count - 1);
    lod
}

/// A source mesh over `skeleton` with one square base-color texture and
/// the given LOD chain.
pub fn source(skeleton: Skeleton, lods: Vec<LodModel>, tex_size: u32) -> Arc<SkinnedMesh> {
    let mut mesh =
        SkinnedMesh::new(skeleton).with_materials(vec![base_material(tex_size)]);
    for lod in lods {
        mesh = mesh.with_lod(lod);
    }
    Arc::new(mesh)
}
