//! Fragment programs: WGSL assembly, validation, and uniform reflection.
//!
//! User code is wrapped in a fixed preamble (vertex stage, `Fragment` input,
//! and the conventional bindings). naga parses and validates the result on the
//! CPU, which gives readable diagnostics before any GPU object exists and tells
//! us which of the conventional uniforms each program actually uses.

use anyhow::{anyhow, bail, Result};

const PREAMBLE: &str = include_str!("shaders/preamble.wgsl");

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// A conventional shader input, bound at a fixed slot in group 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Uniform {
    /// `T`: world mapping `M · S` (`mat3x3<f32>`).
    Transform,
    /// `resolution`: framebuffer size in pixels (`vec2<i32>`).
    Resolution,
    /// `tex`: colour output of the previous pass.
    PassInput,
    PassInputSampler,
    /// `tiletex`: optional user-supplied auxiliary texture.
    TileTexture,
    TileSampler,
}

impl Uniform {
    pub const ALL: [Uniform; 6] = [
        Uniform::Transform,
        Uniform::Resolution,
        Uniform::PassInput,
        Uniform::PassInputSampler,
        Uniform::TileTexture,
        Uniform::TileSampler,
    ];

    /// Identifier used in WGSL.
    pub const fn name(self) -> &'static str {
        match self {
            Uniform::Transform => "T",
            Uniform::Resolution => "resolution",
            Uniform::PassInput => "tex",
            Uniform::PassInputSampler => "tex_sampler",
            Uniform::TileTexture => "tiletex",
            Uniform::TileSampler => "tiletex_sampler",
        }
    }

    /// Binding index in group 0.
    pub const fn binding(self) -> u32 {
        match self {
            Uniform::Transform => 0,
            Uniform::Resolution => 1,
            Uniform::PassInput => 2,
            Uniform::PassInputSampler => 3,
            Uniform::TileTexture => 4,
            Uniform::TileSampler => 5,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.name() == name)
    }

    const fn bit(self) -> u8 {
        1 << self.binding()
    }

    fn layout_entry(self) -> wgpu::BindGroupLayoutEntry {
        let ty = match self {
            Uniform::Transform | Uniform::Resolution => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            Uniform::PassInput | Uniform::TileTexture => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            Uniform::PassInputSampler | Uniform::TileSampler => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
        };

        wgpu::BindGroupLayoutEntry {
            binding: self.binding(),
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty,
            count: None,
        }
    }
}

/// Set of [`Uniform`]s a program uses.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct UniformSet {
    bits: u8,
}

impl UniformSet {
    #[inline]
    pub fn insert(&mut self, u: Uniform) {
        self.bits |= u.bit();
    }

    #[inline]
    pub fn contains(self, u: Uniform) -> bool {
        self.bits & u.bit() != 0
    }

    /// Members in binding order.
    pub fn iter(self) -> impl Iterator<Item = Uniform> {
        Uniform::ALL.into_iter().filter(move |u| self.contains(*u))
    }
}

impl FromIterator<Uniform> for UniformSet {
    fn from_iter<I: IntoIterator<Item = Uniform>>(iter: I) -> Self {
        let mut set = UniformSet::default();
        for u in iter {
            set.insert(u);
        }
        set
    }
}

/// Wraps a program body in the fixed preamble.
pub fn assemble(body: &str) -> String {
    format!("{PREAMBLE}\n{body}\n")
}

/// Number of lines the preamble adds before user code (for diagnostics).
pub fn preamble_lines() -> usize {
    PREAMBLE.lines().count() + 1
}

/// Collects the conventional uniforms statically used by any entry point.
///
/// Declared-but-unused globals are not reported, the same way an unused
/// uniform is optimised out of a linked GL program.
pub fn reflect_uniforms(module: &naga::Module, info: &naga::valid::ModuleInfo) -> UniformSet {
    let mut used = UniformSet::default();

    for index in 0..module.entry_points.len() {
        let entry = info.get_entry_point(index);
        for (handle, var) in module.global_variables.iter() {
            if entry[handle].is_empty() {
                continue;
            }
            if let Some(u) = var.name.as_deref().and_then(Uniform::from_name) {
                used.insert(u);
            }
        }
    }

    used
}

/// Rejects any bound global other than the conventional ones at their slots.
///
/// Pipelines are built from the conventional layout alone, so an extra
/// resource would validate here and only fail once it reaches the device.
fn check_bindings(module: &naga::Module) -> Result<()> {
    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else {
            continue;
        };
        let name = var.name.as_deref().unwrap_or("<unnamed>");

        match Uniform::from_name(name) {
            Some(u) if rb.group == 0 && rb.binding == u.binding() => {}
            Some(u) => bail!(
                "`{name}` is bound at @group({}) @binding({}), expected @group(0) @binding({})",
                rb.group,
                rb.binding,
                u.binding()
            ),
            None => bail!(
                "`{name}` at @group({}) @binding({}) is not a provided resource (available: {})",
                rb.group,
                rb.binding,
                Uniform::ALL.map(Uniform::name).join(", ")
            ),
        }
    }
    Ok(())
}

/// A validated, reflected fragment program that has not touched the GPU yet.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    label: String,
    wgsl: String,
    uniforms: UniformSet,
}

impl ProgramSource {
    /// Assembles `body`, then parses and validates it.
    ///
    /// Errors carry naga's diagnostic text, prefixed with `label`.
    pub fn new(label: impl Into<String>, body: &str) -> Result<Self> {
        let label = label.into();
        let wgsl = assemble(body);

        let module = naga::front::wgsl::parse_str(&wgsl).map_err(|e| {
            anyhow!(
                "{label}: failed to parse shader (line numbers include a {}-line preamble)\n{}",
                preamble_lines(),
                e.emit_to_string(&wgsl)
            )
        })?;

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .map_err(|e| anyhow!("{label}: shader validation failed: {e}"))?;

        check_bindings(&module).map_err(|e| anyhow!("{label}: {e}"))?;

        let uniforms = reflect_uniforms(&module, &info);
        log::debug!("{label}: uses {:?}", uniforms.iter().map(Uniform::name).collect::<Vec<_>>());

        Ok(Self { label, wgsl, uniforms })
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn wgsl(&self) -> &str {
        &self.wgsl
    }

    #[inline]
    pub fn uniforms(&self) -> UniformSet {
        self.uniforms
    }
}

/// A compiled program: shader module plus a bind-group layout holding only
/// the bindings the program uses.
pub struct ShaderProgram {
    label: String,
    module: wgpu::ShaderModule,
    uniforms: UniformSet,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ShaderProgram {
    /// Creates GPU objects for an already validated source.
    pub fn compile(device: &wgpu::Device, source: &ProgramSource) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label()),
            source: wgpu::ShaderSource::Wgsl(source.wgsl().into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> =
            source.uniforms().iter().map(Uniform::layout_entry).collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planeview program bgl"),
            entries: &entries,
        });

        Self {
            label: source.label().to_string(),
            module,
            uniforms: source.uniforms(),
            bind_group_layout,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn uniforms(&self) -> UniformSet {
        self.uniforms
    }

    #[inline]
    pub(super) fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    #[inline]
    pub(super) fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uses(body: &str) -> UniformSet {
        ProgramSource::new("test", body)
            .unwrap_or_else(|e| panic!("shader should compile: {e:#}"))
            .uniforms()
    }

    // ── reflection ────────────────────────────────────────────────────────

    #[test]
    fn constant_shader_only_uses_transform() {
        let set = uses("fn frag(f: Fragment) -> vec4<f32> { return vec4<f32>(1.0, 0.0, 0.0, 1.0); }");
        assert_eq!(set, [Uniform::Transform].into_iter().collect());
    }

    #[test]
    fn resolution_is_reported_when_read() {
        let set = uses(
            "fn frag(f: Fragment) -> vec4<f32> {
                let r = vec2<f32>(resolution);
                return vec4<f32>(f.coord / r, 0.0, 1.0);
            }",
        );
        assert!(set.contains(Uniform::Resolution));
        assert!(!set.contains(Uniform::PassInput));
    }

    #[test]
    fn sampled_pass_input_reports_texture_and_sampler() {
        let set = uses(
            "fn frag(f: Fragment) -> vec4<f32> {
                let uv = f.coord / vec2<f32>(resolution);
                return textureSample(tex, tex_sampler, uv);
            }",
        );
        assert!(set.contains(Uniform::PassInput));
        assert!(set.contains(Uniform::PassInputSampler));
        assert!(!set.contains(Uniform::TileTexture));
    }

    #[test]
    fn loaded_pass_input_needs_no_sampler() {
        let set = uses(
            "fn frag(f: Fragment) -> vec4<f32> {
                return textureLoad(tex, vec2<i32>(f.coord), 0);
            }",
        );
        assert!(set.contains(Uniform::PassInput));
        assert!(!set.contains(Uniform::PassInputSampler));
    }

    #[test]
    fn tile_texture_used_through_helper_function() {
        let set = uses(
            "fn tile(p: vec2<f32>) -> vec4<f32> {
                return textureSample(tiletex, tiletex_sampler, fract(p));
            }
            fn frag(f: Fragment) -> vec4<f32> { return tile(f.wpos); }",
        );
        assert!(set.contains(Uniform::TileTexture));
        assert!(set.contains(Uniform::TileSampler));
    }

    // ── diagnostics ───────────────────────────────────────────────────────

    #[test]
    fn syntax_error_is_reported_with_label() {
        let err = ProgramSource::new("broken.wgsl", "fn frag(f: Fragment) -> vec4<f32> { return }")
            .expect_err("must not parse");
        assert!(format!("{err:#}").contains("broken.wgsl"));
    }

    #[test]
    fn extra_resource_binding_is_rejected() {
        let err = ProgramSource::new(
            "extra.wgsl",
            "@group(0) @binding(9) var<uniform> extra: f32;
            fn frag(f: Fragment) -> vec4<f32> { return vec4<f32>(extra); }",
        )
        .expect_err("layout has no slot 9");
        let msg = format!("{err:#}");
        assert!(msg.contains("extra.wgsl"));
        assert!(msg.contains("`extra`"));
    }

    #[test]
    fn resource_in_another_group_is_rejected() {
        let err = ProgramSource::new(
            "group1",
            "@group(1) @binding(0) var<uniform> tint: vec4<f32>;
            fn frag(f: Fragment) -> vec4<f32> { return tint; }",
        )
        .expect_err("only group 0 exists");
        assert!(format!("{err:#}").contains("@group(1)"));
    }

    #[test]
    fn preamble_bindings_pass_the_check() {
        let module = naga::front::wgsl::parse_str(&assemble(
            "fn frag(f: Fragment) -> vec4<f32> { return vec4<f32>(0.0); }",
        ))
        .unwrap_or_else(|e| panic!("preamble should parse: {e}"));
        assert!(check_bindings(&module).is_ok());
    }

    #[test]
    fn missing_frag_function_is_rejected() {
        assert!(ProgramSource::new("empty", "").is_err());
    }

    // ── conventions ───────────────────────────────────────────────────────

    #[test]
    fn names_round_trip_and_bindings_are_distinct() {
        for u in Uniform::ALL {
            assert_eq!(Uniform::from_name(u.name()), Some(u));
        }
        let mut bindings: Vec<u32> = Uniform::ALL.iter().map(|u| u.binding()).collect();
        bindings.dedup();
        assert_eq!(bindings.len(), Uniform::ALL.len());
        assert_ne!(Uniform::TileTexture.binding(), Uniform::PassInput.binding());
        assert_eq!(Uniform::from_name("wpos"), None);
    }

    #[test]
    fn assembled_source_places_body_after_preamble() {
        let wgsl = assemble("// body");
        assert!(wgsl.contains(VERTEX_ENTRY));
        assert!(wgsl.contains(FRAGMENT_ENTRY));
        assert!(wgsl.trim_end().ends_with("// body"));
        assert_eq!(wgsl.lines().position(|l| l == "// body"), Some(preamble_lines()));
    }
}
