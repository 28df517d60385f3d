//! GPU rendering subsystem.
//!
//! Fragment programs are validated and reflected on the CPU (`program`), then
//! composed into a fixed pass sequence (`compositor`) drawn over a full-screen
//! quad each frame.
//!
//! Convention:
//! - All passes share group 0 with fixed binding slots (see [`Uniform`]).
//! - Programs only receive the bindings they statically use.

mod compositor;
mod ctx;
mod program;
mod quad;
mod surface;
mod texture;
mod uniforms;

#[cfg(test)]
pub(crate) mod test_support;

pub use compositor::{
    needs_back_buffer, needs_intermediate, plan_passes, resource_plan, schedule, BindingSource,
    PassInput, PassOutput, PassStep, PassTarget, PipelineCompositor, RenderPass,
};
pub use ctx::{RenderCtx, RenderTarget};
pub use program::{
    assemble, preamble_lines, reflect_uniforms, ProgramSource, ShaderProgram, Uniform, UniformSet,
    FRAGMENT_ENTRY, VERTEX_ENTRY,
};
pub use surface::{IntermediateSurface, INTERMEDIATE_FORMAT};
pub use texture::{mip_count, mip_extent, MipLevel, TileTexture, TILE_FORMAT};
pub use uniforms::FrameUniforms;
