//! View state: the mapping between screen pixels and the infinite world plane.
//!
//! Conventions:
//! - Cursor positions are logical pixels, origin top-left, +Y down.
//! - NDC is `[-1, 1]²`, +Y up. "Aspect-corrected NDC" is `S · ndc`.
//! - World space is reached with `T = M · S`; shaders receive `T` directly.

mod aspect;
mod transform;

pub use aspect::AspectState;
pub use transform::{DragMode, DragSession, ViewTransform, INITIAL_ZOOM};
