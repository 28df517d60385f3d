use std::path::PathBuf;

use clap::Parser;
use winit::dpi::LogicalSize;

use planeview_engine::device::GpuInit;
use planeview_engine::logging::LoggingConfig;
use planeview_engine::window::RuntimeConfig;

/// Interactive viewer for WGSL fragment shaders on an infinite 2D plane.
///
/// Drag with the left mouse button to pan. Space switches dragging to
/// rotate/zoom about the window centre. Escape or Q quits.
#[derive(Parser, Debug)]
#[command(
    name = "planeview",
    version,
    after_help = "Each SHADER defines `fn frag(f: Fragment) -> vec4<f32>`.\n\
                  Shaders run in the order given; every pass after the first can\n\
                  sample the previous pass's output as `tex`."
)]
pub struct Cli {
    /// Fragment shaders, in pass order. Without any, a built-in checkerboard is shown.
    #[arg(value_name = "SHADER")]
    pub shaders: Vec<PathBuf>,

    /// Image bound as `tiletex` in every pass.
    #[arg(short, long, value_name = "IMAGE")]
    pub tex: Option<PathBuf>,

    /// Window title.
    #[arg(long, default_value = "Tiling Viewer")]
    pub title: String,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 800, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Present frames as soon as they are drawn instead of waiting for vblank.
    #[arg(long)]
    pub no_vsync: bool,

    /// Log filter in env_logger syntax (overrides RUST_LOG), e.g. "debug".
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,
}

impl Cli {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.title.clone(),
            initial_size: LogicalSize::new(f64::from(self.width), f64::from(self.height)),
        }
    }

    pub fn gpu_init(&self) -> GpuInit {
        GpuInit {
            vsync: !self.no_vsync,
            ..GpuInit::default()
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            env_filter: self.log.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("planeview").chain(args.iter().copied()))
            .unwrap_or_else(|e| panic!("{args:?} should parse: {e}"))
    }

    #[test]
    fn defaults_match_the_classic_viewer() {
        let cli = parse(&[]);
        assert!(cli.shaders.is_empty());
        assert!(cli.tex.is_none());
        assert_eq!(cli.title, "Tiling Viewer");
        assert_eq!((cli.width, cli.height), (1000, 800));

        let config = cli.runtime_config();
        assert_eq!(config.initial_size, LogicalSize::new(1000.0, 800.0));
        assert_eq!(cli.gpu_init(), GpuInit::default());
    }

    #[test]
    fn no_vsync_flag_reaches_gpu_init() {
        let init = parse(&["--no-vsync"]).gpu_init();
        assert!(!init.vsync);
        assert!(!init.srgb_surface);
    }

    #[test]
    fn shaders_keep_command_line_order() {
        let cli = parse(&["--tex", "tile.png", "a.wgsl", "b.wgsl", "c.wgsl"]);
        assert_eq!(
            cli.shaders,
            vec![PathBuf::from("a.wgsl"), PathBuf::from("b.wgsl"), PathBuf::from("c.wgsl")]
        );
        assert_eq!(cli.tex, Some(PathBuf::from("tile.png")));
    }

    #[test]
    fn zero_size_window_is_rejected() {
        assert!(Cli::try_parse_from(["planeview", "--width", "0"]).is_err());
    }

    #[test]
    fn log_flag_becomes_filter() {
        let cli = parse(&["--log", "planeview=debug"]);
        assert_eq!(cli.logging_config().env_filter.as_deref(), Some("planeview=debug"));
    }
}
