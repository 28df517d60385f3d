//! Offscreen colour buffers shared by the non-terminal passes.

/// Format of intermediate buffers. Fixed so programs see the same precision
/// regardless of the window's surface format.
pub const INTERMEDIATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct ColorBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl ColorBuffer {
    fn new(device: &wgpu::Device, size: (u32, u32), index: usize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("planeview intermediate {index}")),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: INTERMEDIATE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            _texture: texture,
        }
    }
}

/// Screen-sized offscreen target that passes render into and later passes
/// sample as `tex`.
///
/// One buffer suffices for two passes. With more, a pass would read and write
/// the same texture, so a second buffer is kept and passes alternate between
/// them.
pub struct IntermediateSurface {
    size: (u32, u32),
    buffers: Vec<ColorBuffer>,
    sampler: wgpu::Sampler,
}

impl IntermediateSurface {
    pub fn new(device: &wgpu::Device, size: (u32, u32), double_buffered: bool) -> Self {
        let size = (size.0.max(1), size.1.max(1));
        let count = if double_buffered { 2 } else { 1 };

        // Nearest: pixel-exact reads of the previous pass at matching resolution.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("planeview intermediate sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        log::debug!("intermediate surface: {}x{} ({count} buffer(s))", size.0, size.1);

        Self {
            size,
            buffers: (0..count).map(|i| ColorBuffer::new(device, size, i)).collect(),
            sampler,
        }
    }

    /// Reallocates storage at the new size. Contents are discarded.
    ///
    /// Returns `false` (and keeps the old storage) for zero sizes or when the
    /// size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == self.size {
            return false;
        }

        self.size = (width, height);
        let count = self.buffers.len();
        self.buffers = (0..count).map(|i| ColorBuffer::new(device, self.size, i)).collect();

        log::debug!("intermediate surface resized to {width}x{height}");
        true
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub(super) fn view(&self, index: usize) -> &wgpu::TextureView {
        &self.buffers[index].view
    }

    #[inline]
    pub(super) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_skips_zero_and_unchanged_sizes() {
        let Some((device, _queue)) = crate::render::test_support::headless_device() else {
            return;
        };

        let mut surface = IntermediateSurface::new(&device, (800, 600), false);
        assert_eq!(surface.buffer_count(), 1);

        assert!(!surface.resize(&device, 800, 600));
        assert!(!surface.resize(&device, 0, 600));
        assert_eq!(surface.size(), (800, 600));

        assert!(surface.resize(&device, 1920, 1080));
        assert_eq!(surface.size(), (1920, 1080));
    }

    #[test]
    fn double_buffered_surface_keeps_both_buffers_on_resize() {
        let Some((device, _queue)) = crate::render::test_support::headless_device() else {
            return;
        };

        let mut surface = IntermediateSurface::new(&device, (64, 64), true);
        assert_eq!(surface.buffer_count(), 2);
        surface.resize(&device, 128, 32);
        assert_eq!(surface.buffer_count(), 2);
    }
}
