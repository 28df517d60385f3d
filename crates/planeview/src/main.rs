mod cli;
mod loader;
mod viewer;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use planeview_engine::logging::init_logging;
use planeview_engine::window::Runtime;

use crate::cli::Cli;
use crate::loader::TileImage;
use crate::viewer::Viewer;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.logging_config());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Everything that can fail on bad input is checked before a window opens.
    let sources = loader::load_programs(&cli.shaders)?;

    let tile = cli.tex.as_deref().map(TileImage::open).transpose()?;
    if let Some(tile) = &tile {
        let (w, h) = tile.size();
        log::info!("tile texture: {w}x{h}, {} mip levels", tile.levels.len());
    }

    let config = cli.runtime_config();
    let gpu_init = cli.gpu_init();
    let size = (config.initial_size.width as f32, config.initial_size.height as f32);
    let viewer = Viewer::new(sources, tile, size);

    log::info!("starting {} ({} pass(es))", config.title, cli.shaders.len().max(1));
    Runtime::run(config, gpu_init, viewer)
}
