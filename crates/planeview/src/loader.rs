//! Reads shader programs and the optional tile texture from disk.

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbaImage;

use planeview_engine::render::{mip_count, mip_extent, MipLevel, ProgramSource};

/// Shown when no shader is given on the command line.
pub const CHECKERBOARD: &str = include_str!("../shaders/checkerboard.wgsl");

/// Loads and validates every shader, in order. Falls back to the checkerboard.
pub fn load_programs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ProgramSource>> {
    if paths.is_empty() {
        log::info!("no shader given; showing the built-in checkerboard");
        return Ok(vec![ProgramSource::new("checkerboard.wgsl", CHECKERBOARD)?]);
    }

    paths.iter().map(|p| load_program(p.as_ref())).collect()
}

pub fn load_program(path: &Path) -> Result<ProgramSource> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shader {}", path.display()))?;
    ProgramSource::new(path.display().to_string(), &body)
}

/// Decoded tile texture with its full mip chain.
pub struct TileImage {
    pub levels: Vec<RgbaImage>,
}

impl TileImage {
    /// Decodes `path` to RGBA8 (alpha = 1 where the file has none) and builds mips.
    pub fn open(path: &Path) -> Result<Self> {
        let decoded = image::open(path)
            .with_context(|| format!("failed to load texture {}", path.display()))?;
        Ok(Self::from_rgba(decoded.to_rgba8()))
    }

    pub fn from_rgba(base: RgbaImage) -> Self {
        let (w, h) = base.dimensions();
        let count = mip_count(w, h);

        let mut levels = Vec::with_capacity(count as usize);
        levels.push(base);
        for level in 1..count {
            let (lw, lh) = mip_extent(w, h, level);
            // Each level is filtered down from the one above it.
            let prev = &levels[level as usize - 1];
            let next = image::imageops::resize(prev, lw, lh, FilterType::Triangle);
            levels.push(next);
        }

        Self { levels }
    }

    pub fn mip_levels(&self) -> Vec<MipLevel<'_>> {
        self.levels
            .iter()
            .map(|img| MipLevel {
                width: img.width(),
                height: img.height(),
                rgba: img.as_raw(),
            })
            .collect()
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.levels.first().map_or((0, 0), RgbaImage::dimensions)
    }
}
