//! Deferred texture compositing.
//!
//! Copying source textures into their atlas placements is queued rather
//! than performed immediately: a GPU-backed implementation submits copy
//! commands to the render thread and fences on [`flush`]. The merge
//! pipeline only ever observes the flushed result, so the whole operation
//! is synchronous from the caller's perspective.
//!
//! [`flush`]: TextureCompositor::flush

use std::sync::Arc;

use super::{CpuTexture, TextureFormat};

/// Queue/flush interface for compositing source textures into one page.
///
/// Implementations may defer queued copies arbitrarily; `flush` must block
/// until every queued copy has landed in the destination. Callers are
/// expected to queue only sources whose [`TextureFormat`] matches the
/// destination page.
pub trait TextureCompositor {
    /// Queue a copy of the whole of `source` into the destination, with the
    /// source's top-left corner landing at `dest_min` (pixels).
    fn queue_copy(&mut self, source: Arc<CpuTexture>, dest_min: [u32; 2]);

    /// Apply all queued copies to `dest`, blocking until they have landed.
    fn flush(&mut self, dest: &mut CpuTexture);
}

/// Synchronous CPU reference implementation of [`TextureCompositor`].
///
/// Copies row-by-row, clipping against the destination bounds.
#[derive(Debug, Default)]
pub struct CpuCompositor {
    pending: Vec<(Arc<CpuTexture>, [u32; 2])>,
}

impl CpuCompositor {
    /// Creates a compositor with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextureCompositor for CpuCompositor {
    fn queue_copy(&mut self, source: Arc<CpuTexture>, dest_min: [u32; 2]) {
        self.pending.push((source, dest_min));
    }

    fn flush(&mut self, dest: &mut CpuTexture) {
        for (source, dest_min) in self.pending.drain(..) {
            copy_clipped(&source, dest, dest_min);
        }
    }
}

fn copy_clipped(source: &CpuTexture, dest: &mut CpuTexture, dest_min: [u32; 2]) {
    debug_assert_eq!(source.format(), dest.format());
    let pixel = source.format().pixel_size();
    let copy_w = source.width().min(dest.width().saturating_sub(dest_min[0])) as usize;
    let copy_h = source.height().min(dest.height().saturating_sub(dest_min[1]));
    if copy_w == 0 {
        return;
    }
    for row in 0..copy_h {
        let src_start = source.pixel_offset(0, row);
        let dst_start = dest.pixel_offset(dest_min[0], dest_min[1] + row);
        dest.data_mut()[dst_start..dst_start + copy_w * pixel]
            .copy_from_slice(&source.data()[src_start..src_start + copy_w * pixel]);
    }
}
