//! Material merging: atlas packing and texture compositing.
//!
//! Every source material contributes one rectangle, sized by its base-color
//! texture, to a shared atlas layout. Two fixed properties are composited
//! onto that layout, the base-color page (sRGB) and the normal-map page
//! (linear), and installed on a single merged material cloned from the
//! caller's base material. Each source material's placement also yields the
//! normalized UV remap transform consumed by the LOD buffer builder.

use std::sync::Arc;

use crate::atlas::{self, UvTransform};
use crate::material::{Material, BASE_COLOR_PARAM, NORMAL_MAP_PARAM};
use crate::math::Vec2;
use crate::texture::{CpuTexture, TextureCompositor};

use super::{MergeError, SourcePart};

struct PageSpec {
    param: &'static str,
    /// Normal maps hold linear vector data, not sRGB color.
    normal: bool,
}

const PAGE_SPECS: [PageSpec; 2] = [
    PageSpec {
        param: BASE_COLOR_PARAM,
        normal: false,
    },
    PageSpec {
        param: NORMAL_MAP_PARAM,
        normal: true,
    },
];

/// Merge all source materials into one atlas-backed material.
///
/// Returns the merged material and, per source mesh, one [`UvTransform`]
/// per material in material order.
///
/// # Panics
///
/// Panics if a source material lacks a base-color texture parameter; that
/// is a contract violation, not a recoverable condition.
pub(super) fn merge_materials(
    parts: &[SourcePart],
    base_material: &Material,
    atlas_size: Vec2,
    compositor: &mut dyn TextureCompositor,
) -> Result<(Material, Vec<Vec<UvTransform>>), MergeError> {
    // Collect every source material in (mesh, material) order; the
    // base-color texture's size decides the material's atlas weight.
    let mut material_refs: Vec<(usize, usize)> = Vec::new();
    let mut texture_sizes: Vec<Vec2> = Vec::new();
    for (mesh_idx, part) in parts.iter().enumerate() {
        for (mtl_idx, material) in part.mesh.materials.iter().enumerate() {
            let main = material
                .texture_parameter(BASE_COLOR_PARAM)
                .expect("source material has no base color texture");
            material_refs.push((mesh_idx, mtl_idx));
            texture_sizes.push(Vec2::new(main.width() as f32, main.height() as f32));
        }
    }

    let boxes = atlas::pack(atlas_size, &texture_sizes).map_err(|_| {
        log::warn!("mesh merge: no source materials to atlas");
        MergeError::NoSourceMaterials
    })?;

    let mut merged = base_material.clone();
    for spec in &PAGE_SPECS {
        let textures: Vec<Option<Arc<CpuTexture>>> = material_refs
            .iter()
            .map(|&(mesh_idx, mtl_idx)| {
                parts[mesh_idx].mesh.materials[mtl_idx]
                    .texture_parameter(spec.param)
                    .cloned()
            })
            .collect();
        if let Some(page) = composite_page(atlas_size, spec, &textures, &boxes, compositor) {
            merged.set_texture_parameter(spec.param, Arc::new(page));
        }
    }

    let mut uv_transforms: Vec<Vec<UvTransform>> = vec![Vec::new(); parts.len()];
    for (list_idx, &(mesh_idx, _)) in material_refs.iter().enumerate() {
        uv_transforms[mesh_idx].push(UvTransform::from_box(&boxes[list_idx], atlas_size));
    }

    Ok((merged, uv_transforms))
}

/// Composite one property's textures into a fresh atlas page.
///
/// The page format follows the first material that carries the property.
/// Sources with a mismatched pixel format are skipped, leaving their
/// region blank. Returns `None` when no source carries the property.
fn composite_page(
    atlas_size: Vec2,
    spec: &PageSpec,
    textures: &[Option<Arc<CpuTexture>>],
    boxes: &[atlas::Box2],
    compositor: &mut dyn TextureCompositor,
) -> Option<CpuTexture> {
    let format = textures.iter().flatten().next()?.format();
    let mut page = CpuTexture::new(atlas_size.x as u32, atlas_size.y as u32, format)
        .with_srgb(!spec.normal);

    for (texture, placement) in textures.iter().zip(boxes) {
        let Some(texture) = texture else { continue };
        if texture.format() != format {
            log::warn!(
                "mesh merge: skipping {} texture with format {:?} (page is {:?})",
                spec.param,
                texture.format(),
                format
            );
            continue;
        }
        compositor.queue_copy(
            texture.clone(),
            [placement.min.x as u32, placement.min.y as u32],
        );
    }
    compositor.flush(&mut page);
    Some(page)
}
