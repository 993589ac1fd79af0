//! CPU-side texture types and compositing.
//!
//! Provides [`CpuTexture`] for holding raw pixel data, the shared
//! [`TextureFormat`] enum, and the [`TextureCompositor`] interface used to
//! queue region copies into atlas pages (with [`CpuCompositor`] as the
//! synchronous reference implementation).

mod compositor;
mod types;

pub use compositor::{CpuCompositor, TextureCompositor};
pub use types::{CpuTexture, TextureFormat};
