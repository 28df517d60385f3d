//! Multi-pass composition of fragment programs.
//!
//! Passes run in input order. Every pass but the last renders into the
//! intermediate surface and the next pass samples that output as `tex`; the
//! last (terminal) pass draws to the screen.

use anyhow::{ensure, Result};
use wgpu::util::DeviceExt;

use super::program::{ShaderProgram, Uniform, UniformSet, FRAGMENT_ENTRY, VERTEX_ENTRY};
use super::quad::{QuadVertex, QUAD_TOPOLOGY, QUAD_VERTICES};
use super::surface::{IntermediateSurface, INTERMEDIATE_FORMAT};
use super::texture::{Placeholder, TileTexture};
use super::uniforms::{FrameUniforms, UniformBuffers};
use super::{RenderCtx, RenderTarget};

/// Where a pass writes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassTarget {
    Intermediate,
    Screen,
}

/// What a pass finds in its `tex` slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassInput {
    /// First pass: nothing rendered yet this frame.
    None,
    /// Output of the pass immediately before this one.
    Previous,
}

/// One entry of the pass sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass<P> {
    pub program: P,
    pub index: usize,
    pub terminal: bool,
    pub input: PassInput,
    pub target: PassTarget,
}

/// Tags `programs` in order: the last one is terminal and targets the screen.
pub fn plan_passes<P>(programs: Vec<P>) -> Vec<RenderPass<P>> {
    let count = programs.len();
    programs
        .into_iter()
        .enumerate()
        .map(|(index, program)| {
            let terminal = index + 1 == count;
            RenderPass {
                program,
                index,
                terminal,
                input: if index == 0 { PassInput::None } else { PassInput::Previous },
                target: if terminal { PassTarget::Screen } else { PassTarget::Intermediate },
            }
        })
        .collect()
}

/// Whether `pass_count` passes need an offscreen surface at all.
#[inline]
pub fn needs_intermediate(pass_count: usize) -> bool {
    pass_count > 1
}

/// Whether some pass both reads and writes the intermediate surface.
#[inline]
pub fn needs_back_buffer(pass_count: usize) -> bool {
    pass_count > 2
}

/// Concrete attachment for one pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassOutput {
    Buffer(usize),
    Screen,
}

/// One pass resolved against the intermediate surface's buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PassStep {
    pub pass: usize,
    /// Buffer holding the previous pass's output.
    pub input: Option<usize>,
    pub output: PassOutput,
}

/// Assigns buffers so that no pass samples its own attachment.
///
/// Writes alternate between buffers; the most recent write is what the next
/// pass reads.
pub fn schedule<P>(passes: &[RenderPass<P>], buffer_count: usize) -> Vec<PassStep> {
    let buffers = buffer_count.max(1);
    let mut front: Option<usize> = None;

    passes
        .iter()
        .map(|pass| {
            let input = match pass.input {
                PassInput::None => None,
                PassInput::Previous => front,
            };
            let output = match pass.target {
                PassTarget::Screen => PassOutput::Screen,
                PassTarget::Intermediate => {
                    let slot = front.map_or(0, |f| (f + 1) % buffers);
                    front = Some(slot);
                    PassOutput::Buffer(slot)
                }
            };
            PassStep {
                pass: pass.index,
                input,
                output,
            }
        })
        .collect()
}

/// Resource bound for a uniform in a given pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindingSource {
    TransformBuffer,
    ResolutionBuffer,
    IntermediateView(usize),
    IntermediateSampler,
    TileView,
    TileSampler,
    PlaceholderView,
    PlaceholderSampler,
}

/// Decides what backs each uniform a program uses.
///
/// Uniforms outside `uniforms` get nothing. Texture inputs that do not exist
/// (no previous pass, no tile texture) fall back to the placeholder.
pub fn resource_plan(
    uniforms: UniformSet,
    input: Option<usize>,
    tile_loaded: bool,
) -> Vec<(Uniform, BindingSource)> {
    uniforms
        .iter()
        .map(|u| {
            let source = match u {
                Uniform::Transform => BindingSource::TransformBuffer,
                Uniform::Resolution => BindingSource::ResolutionBuffer,
                Uniform::PassInput => input
                    .map(BindingSource::IntermediateView)
                    .unwrap_or(BindingSource::PlaceholderView),
                Uniform::PassInputSampler if input.is_some() => BindingSource::IntermediateSampler,
                Uniform::PassInputSampler => BindingSource::PlaceholderSampler,
                Uniform::TileTexture if tile_loaded => BindingSource::TileView,
                Uniform::TileTexture => BindingSource::PlaceholderView,
                Uniform::TileSampler if tile_loaded => BindingSource::TileSampler,
                Uniform::TileSampler => BindingSource::PlaceholderSampler,
            };
            (u, source)
        })
        .collect()
}

/// Runs a fixed sequence of programs each frame.
pub struct PipelineCompositor {
    passes: Vec<RenderPass<ShaderProgram>>,
    pipelines: Vec<wgpu::RenderPipeline>,
    surface_format: wgpu::TextureFormat,

    quad_vbo: wgpu::Buffer,
    uniforms: UniformBuffers,
    placeholder: Placeholder,

    intermediate: Option<IntermediateSurface>,
    tile: Option<TileTexture>,
}

impl PipelineCompositor {
    /// Builds one pipeline per program. The last program is the terminal pass.
    pub fn configure(ctx: &RenderCtx<'_>, programs: Vec<ShaderProgram>) -> Result<Self> {
        ensure!(!programs.is_empty(), "at least one shader program is required");

        let count = programs.len();
        let passes = plan_passes(programs);
        let pipelines = passes
            .iter()
            .map(|pass| build_pipeline(ctx.device, &pass.program, target_format(pass, ctx.surface_format)))
            .collect();

        let quad_vbo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("planeview quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let intermediate = needs_intermediate(count)
            .then(|| IntermediateSurface::new(ctx.device, ctx.framebuffer, needs_back_buffer(count)));

        for pass in &passes {
            log::debug!(
                "pass {}: {} -> {:?}{}",
                pass.index,
                pass.program.label(),
                pass.target,
                if pass.terminal { " (terminal)" } else { "" }
            );
        }

        Ok(Self {
            passes,
            pipelines,
            surface_format: ctx.surface_format,
            quad_vbo,
            uniforms: UniformBuffers::new(ctx.device),
            placeholder: Placeholder::new(ctx.device),
            intermediate,
            tile: None,
        })
    }

    /// Sets or clears the texture bound as `tiletex` in every pass.
    pub fn set_tile_texture(&mut self, tile: Option<TileTexture>) {
        self.tile = tile;
    }

    /// Resizes the intermediate surface to the new framebuffer size.
    pub fn on_resize(&mut self, ctx: &RenderCtx<'_>, width: u32, height: u32) {
        if let Some(surface) = self.intermediate.as_mut() {
            surface.resize(ctx.device, width, height);
        }
    }

    /// Records every pass into `target.encoder`.
    pub fn render_frame(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        frame: &FrameUniforms,
    ) {
        let (width, height) = ctx.framebuffer;
        if width == 0 || height == 0 {
            return;
        }

        // A resize may not have reached us yet; never draw into a stale surface.
        if let Some(surface) = self.intermediate.as_mut() {
            if surface.size() != (width, height) {
                surface.resize(ctx.device, width, height);
            }
        }

        self.ensure_surface_format(ctx);
        self.uniforms.write(ctx.queue, frame);

        let buffer_count = self.intermediate.as_ref().map_or(0, IntermediateSurface::buffer_count);
        let steps = schedule(&self.passes, buffer_count);
        let tile_loaded = self.tile.is_some();

        for step in steps {
            let pass = &self.passes[step.pass];
            let plan = resource_plan(pass.program.uniforms(), step.input, tile_loaded);

            let entries: Vec<wgpu::BindGroupEntry<'_>> = plan
                .into_iter()
                .map(|(u, source)| wgpu::BindGroupEntry {
                    binding: u.binding(),
                    resource: self.resolve(source),
                })
                .collect();

            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("planeview pass bind group"),
                layout: pass.program.bind_group_layout(),
                entries: &entries,
            });

            let (view, clear) = match step.output {
                PassOutput::Screen => (target.color_view, wgpu::Color::BLACK),
                PassOutput::Buffer(i) => match self.intermediate.as_ref() {
                    Some(surface) => (surface.view(i), wgpu::Color::TRANSPARENT),
                    None => continue,
                },
            };

            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.program.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&self.pipelines[step.pass]);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
            rpass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }
    }

    #[inline]
    pub fn passes(&self) -> &[RenderPass<ShaderProgram>] {
        &self.passes
    }

    #[inline]
    pub fn intermediate(&self) -> Option<&IntermediateSurface> {
        self.intermediate.as_ref()
    }

    /// The terminal pipeline targets the surface format; rebuild it if that changed.
    fn ensure_surface_format(&mut self, ctx: &RenderCtx<'_>) {
        if self.surface_format == ctx.surface_format {
            return;
        }

        log::debug!("surface format changed to {:?}; rebuilding terminal pipeline", ctx.surface_format);
        if let Some(last) = self.passes.last() {
            let pipeline = build_pipeline(ctx.device, &last.program, ctx.surface_format);
            if let Some(slot) = self.pipelines.last_mut() {
                *slot = pipeline;
            }
        }
        self.surface_format = ctx.surface_format;
    }

    fn resolve(&self, source: BindingSource) -> wgpu::BindingResource<'_> {
        let placeholder_view = &self.placeholder.view;
        let placeholder_sampler = &self.placeholder.sampler;

        match source {
            BindingSource::TransformBuffer => self.uniforms.transform.as_entire_binding(),
            BindingSource::ResolutionBuffer => self.uniforms.resolution.as_entire_binding(),
            BindingSource::IntermediateView(i) => wgpu::BindingResource::TextureView(
                self.intermediate.as_ref().map_or(placeholder_view, |s| s.view(i)),
            ),
            BindingSource::IntermediateSampler => wgpu::BindingResource::Sampler(
                self.intermediate.as_ref().map_or(placeholder_sampler, |s| s.sampler()),
            ),
            BindingSource::TileView => wgpu::BindingResource::TextureView(
                self.tile.as_ref().map_or(placeholder_view, |t| t.view()),
            ),
            BindingSource::TileSampler => wgpu::BindingResource::Sampler(
                self.tile.as_ref().map_or(placeholder_sampler, |t| t.sampler()),
            ),
            BindingSource::PlaceholderView => wgpu::BindingResource::TextureView(placeholder_view),
            BindingSource::PlaceholderSampler => wgpu::BindingResource::Sampler(placeholder_sampler),
        }
    }
}

fn target_format<P>(pass: &RenderPass<P>, surface_format: wgpu::TextureFormat) -> wgpu::TextureFormat {
    match pass.target {
        PassTarget::Screen => surface_format,
        PassTarget::Intermediate => INTERMEDIATE_FORMAT,
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("planeview pass pipeline layout"),
        bind_group_layouts: &[program.bind_group_layout()],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(program.label()),
        layout: Some(&layout),

        vertex: wgpu::VertexState {
            module: program.module(),
            entry_point: Some(VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &[QuadVertex::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module: program.module(),
            entry_point: Some(FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                // Passes overwrite their target.
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: QUAD_TOPOLOGY,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
