//! Sampled textures: the user's auxiliary tile texture and the 1×1 placeholder.

use anyhow::{ensure, Result};

use super::RenderCtx;

/// Format of the auxiliary texture. Data is taken as-is (no sRGB decode).
pub const TILE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// One level of a mip chain, tightly packed RGBA8.
#[derive(Debug, Copy, Clone)]
pub struct MipLevel<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

/// Size of mip `level` for a `width × height` base image.
#[inline]
pub fn mip_extent(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}

/// Number of levels in a full chain down to 1×1.
#[inline]
pub fn mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Optional user-supplied texture, visible to every pass as `tiletex`.
///
/// Sampled with linear + mipmap filtering and repeat wrapping, so shaders can
/// tile it across the plane.
pub struct TileTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: (u32, u32),
}

impl TileTexture {
    /// Uploads a mip chain. `levels[0]` is the base image; each following level
    /// must have the size given by [`mip_extent`].
    pub fn upload(ctx: &RenderCtx<'_>, label: &str, levels: &[MipLevel<'_>]) -> Result<Self> {
        ensure!(!levels.is_empty(), "{label}: texture has no image data");

        let base = levels[0];
        ensure!(base.width > 0 && base.height > 0, "{label}: texture has zero size");

        let max_dim = ctx.device.limits().max_texture_dimension_2d;
        ensure!(
            base.width <= max_dim && base.height <= max_dim,
            "{label}: {}x{} exceeds the GPU limit of {max_dim}",
            base.width,
            base.height
        );

        for (i, level) in levels.iter().enumerate() {
            let expected = mip_extent(base.width, base.height, i as u32);
            ensure!(
                (level.width, level.height) == expected,
                "{label}: mip {i} is {}x{}, expected {}x{}",
                level.width,
                level.height,
                expected.0,
                expected.1
            );
            ensure!(
                level.rgba.len() == (level.width * level.height * 4) as usize,
                "{label}: mip {i} has {} bytes, expected {}",
                level.rgba.len(),
                level.width * level.height * 4
            );
        }

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: base.width,
                height: base.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TILE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (i, level) in levels.iter().enumerate() {
            ctx.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: i as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                level.rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level.width * 4),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("planeview tile sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        log::info!("{label}: uploaded {}x{} with {} mip levels", base.width, base.height, levels.len());

        Ok(Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            _texture: texture,
            sampler,
            size: (base.width, base.height),
        })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[inline]
    pub(super) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub(super) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// 1×1 transparent-black texture bound where a program samples an input that
/// does not exist (first-pass `tex`, or `tiletex` with nothing loaded).
pub(super) struct Placeholder {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Placeholder {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        // Contents are zero-initialised by wgpu.
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("planeview placeholder"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TILE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("planeview placeholder sampler"),
            ..Default::default()
        });

        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            _texture: texture,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_halves_down_to_one() {
        assert_eq!(mip_count(256, 256), 9);
        assert_eq!(mip_count(300, 17), 9);
        assert_eq!(mip_count(1, 1), 1);
        assert_eq!(mip_extent(300, 17, 0), (300, 17));
        assert_eq!(mip_extent(300, 17, 5), (9, 1));
        assert_eq!(mip_extent(300, 17, 8), (1, 1));
    }

    #[test]
    fn upload_rejects_mismatched_levels() {
        let Some((device, queue)) = crate::render::test_support::headless_device() else {
            return;
        };
        let ctx = RenderCtx::new(&device, &queue, TILE_FORMAT, (1, 1));

        let base = vec![255u8; 4 * 4 * 4];
        let wrong = vec![0u8; 3 * 3 * 4];
        let levels = [
            MipLevel { width: 4, height: 4, rgba: &base },
            MipLevel { width: 3, height: 3, rgba: &wrong },
        ];
        assert!(TileTexture::upload(&ctx, "bad", &levels).is_err());

        let mip1 = vec![0u8; 2 * 2 * 4];
        let mip2 = vec![0u8; 4];
        let levels = [
            MipLevel { width: 4, height: 4, rgba: &base },
            MipLevel { width: 2, height: 2, rgba: &mip1 },
            MipLevel { width: 1, height: 1, rgba: &mip2 },
        ];
        let tile = TileTexture::upload(&ctx, "good", &levels).expect("valid chain uploads");
        assert_eq!(tile.size(), (4, 4));
    }
}
