//! Texture atlas packing.
//!
//! Bin-packs weighted 2D rectangles into a fixed-size canvas using a
//! guillotine free-region scheme. Placement boxes come back in the input
//! order and convert to normalized UV remap transforms via
//! [`UvTransform::from_box`].

use crate::math::Vec2;

/// A 2D axis-aligned box in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box2 {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Box2 {
    /// Box from explicit corners.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Degenerate box at the origin.
    pub fn zero() -> Self {
        Self {
            min: Vec2::zeros(),
            max: Vec2::zeros(),
        }
    }

    /// Box extent.
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Box area.
    pub fn area(&self) -> f32 {
        let s = self.size();
        s.x * s.y
    }

    /// True if `size` fits within this box's extent.
    pub fn fits(&self, size: Vec2) -> bool {
        let s = self.size();
        s.x >= size.x && s.y >= size.y
    }
}

/// Normalized UV remap transform: `uv' = uv * scale + offset`.
///
/// Maps a source's [0,1]² UV space into its placement box's sub-region of
/// the atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    /// Per-axis scale.
    pub scale: Vec2,
    /// Per-axis offset.
    pub offset: Vec2,
}

impl UvTransform {
    /// Identity remap (whole atlas).
    pub fn identity() -> Self {
        Self {
            scale: Vec2::new(1.0, 1.0),
            offset: Vec2::zeros(),
        }
    }

    /// Normalize a placement box against the canvas size.
    pub fn from_box(placement: &Box2, canvas: Vec2) -> Self {
        Self {
            scale: placement.size().component_div(&canvas),
            offset: placement.min.component_div(&canvas),
        }
    }

    /// Apply the remap to a UV coordinate.
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv.component_mul(&self.scale) + self.offset
    }
}

/// Atlas packing failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PackError {
    /// No rectangles were supplied.
    #[error("cannot pack an empty rectangle set")]
    Empty,
}

struct WeightedRect {
    size: Vec2,
    weight: f32,
    index: usize,
}

/// Pack `sizes` into a canvas of `canvas` pixels.
///
/// Rectangles are weighted by `width / canvas.x` and inserted in descending
/// weight order (ties keep input order) into the free region with the
/// tightest fit. Each placement splits the chosen region guillotine-style
/// into a "below" and a "right" remainder. If any rectangle fails to fit,
/// every rectangle is shrunk by 1% and the whole pass restarts, so packing
/// terminates for any non-empty input, possibly with placements smaller
/// than the sources they hold.
///
/// Returns one placement box per input rectangle, in input order.
pub fn pack(canvas: Vec2, sizes: &[Vec2]) -> Result<Vec<Box2>, PackError> {
    if sizes.is_empty() {
        return Err(PackError::Empty);
    }

    let mut rects: Vec<WeightedRect> = sizes
        .iter()
        .enumerate()
        .map(|(index, size)| WeightedRect {
            size: *size,
            weight: size.x / canvas.x,
            index,
        })
        .collect();
    // sort_by is stable, so equal weights keep their input order
    rects.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let mut placed: Vec<(usize, Box2)> = Vec::with_capacity(rects.len());
    loop {
        placed.clear();
        let mut free = vec![Box2::new(Vec2::zeros(), canvas)];
        let mut pass_ok = true;

        for rect in &rects {
            let surface = rect.size.x * rect.size.y;

            let mut best: Option<usize> = None;
            let mut best_remainder = f32::MAX;
            for (region_idx, region) in free.iter().enumerate() {
                if region.fits(rect.size) {
                    let remainder = region.area() - surface;
                    if remainder < best_remainder && remainder >= 0.0 {
                        best = Some(region_idx);
                        best_remainder = remainder;
                    }
                }
            }

            let Some(best_idx) = best else {
                pass_ok = false;
                break;
            };

            let region = free[best_idx];
            let region_size = region.size();
            placed.push((
                rect.index,
                Box2::new(region.min, region.min + rect.size),
            ));

            // Split the consumed region into the remainder below the
            // placement and the remainder to its right:
            //   ___________
            //   |     |   |
            //   |     | R |
            //   |_____|   |
            //   |  B  |   |
            //   |_____|___|
            let below = Box2::new(
                Vec2::new(region.min.x, region.min.y + rect.size.y),
                Vec2::new(region.min.x + rect.size.x, region.min.y + region_size.y),
            );
            let right = Box2::new(
                Vec2::new(region.min.x + rect.size.x, region.min.y),
                Vec2::new(region.min.x + region_size.x, region.min.y + region_size.y),
            );

            let below_valid = below.area() > 0.0;
            let right_valid = right.area() > 0.0;
            if below_valid && right_valid {
                free[best_idx] = below;
                free.push(right);
            } else if right_valid {
                free[best_idx] = right;
            } else if below_valid {
                free[best_idx] = below;
            } else {
                free.swap_remove(best_idx);
            }
        }

        if pass_ok {
            break;
        }
        for rect in &mut rects {
            rect.size *= 0.99;
        }
    }

    let mut boxes = vec![Box2::zero(); sizes.len()];
    for (index, placement) in &placed {
        boxes[*index] = *placement;
    }
    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlaps(a: &Box2, b: &Box2) -> bool {
        a.min.x < b.max.x && b.min.x < a.max.x && a.min.y < b.max.y && b.min.y < a.max.y
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(
            pack(Vec2::new(1024.0, 1024.0), &[]).unwrap_err(),
            PackError::Empty
        );
    }

    #[test]
    fn fitting_set_has_no_overlap_and_stays_in_bounds() {
        let canvas = Vec2::new(1024.0, 1024.0);
        let sizes = [
            Vec2::new(512.0, 512.0),
            Vec2::new(512.0, 512.0),
            Vec2::new(256.0, 256.0),
            Vec2::new(256.0, 128.0),
            Vec2::new(512.0, 256.0),
        ];
        let boxes = pack(canvas, &sizes).unwrap();
        assert_eq!(boxes.len(), sizes.len());
        for b in &boxes {
            assert!(b.min.x >= 0.0 && b.min.y >= 0.0);
            assert!(b.max.x <= canvas.x + 1e-3 && b.max.y <= canvas.y + 1e-3);
        }
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                assert!(!overlaps(&boxes[i], &boxes[j]), "{i} overlaps {j}");
            }
        }
    }

    #[test]
    fn full_size_rects_keep_their_sizes() {
        let canvas = Vec2::new(1024.0, 1024.0);
        let sizes = [Vec2::new(1024.0, 512.0), Vec2::new(1024.0, 512.0)];
        let boxes = pack(canvas, &sizes).unwrap();
        for (b, s) in boxes.iter().zip(&sizes) {
            assert!((b.size() - s).norm() < 1e-3);
        }
    }

    #[test]
    fn oversized_set_shrinks_until_it_fits() {
        let canvas = Vec2::new(256.0, 256.0);
        let sizes = [
            Vec2::new(256.0, 256.0),
            Vec2::new(256.0, 256.0),
            Vec2::new(256.0, 256.0),
        ];
        let boxes = pack(canvas, &sizes).unwrap();
        for b in &boxes {
            assert!(b.area() > 0.0);
            assert!(b.max.x <= canvas.x && b.max.y <= canvas.y);
        }
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                assert!(!overlaps(&boxes[i], &boxes[j]));
            }
        }
    }

    #[test]
    fn uv_transform_maps_into_unit_square() {
        let canvas = Vec2::new(1024.0, 1024.0);
        let sizes = [Vec2::new(512.0, 256.0), Vec2::new(128.0, 128.0)];
        let boxes = pack(canvas, &sizes).unwrap();
        for b in &boxes {
            let t = UvTransform::from_box(b, canvas);
            for uv in [
                Vec2::zeros(),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.25, 0.75),
            ] {
                let mapped = t.apply(uv);
                assert!((0.0..=1.0).contains(&mapped.x));
                assert!((0.0..=1.0).contains(&mapped.y));
            }
        }
    }

    #[test]
    fn widest_rect_is_placed_first_at_origin() {
        let canvas = Vec2::new(1024.0, 1024.0);
        let sizes = [Vec2::new(128.0, 128.0), Vec2::new(512.0, 512.0)];
        let boxes = pack(canvas, &sizes).unwrap();
        // the 512-wide rect carries the larger weight and claims the corner
        assert_eq!(boxes[1].min, Vec2::zeros());
    }
}
