//! Per-frame uniform values and their GPU buffers.

use bytemuck::{Pod, Zeroable};
use glam::Mat3;

/// Values every pass may read this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameUniforms {
    /// `T = M · S`.
    pub transform: Mat3,
    /// Framebuffer size in physical pixels.
    pub resolution: (u32, u32),
}

/// `mat3x3<f32>` in the uniform address space: three 16-byte aligned columns.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct TransformUniform {
    pub cols: [[f32; 4]; 3],
}

impl TransformUniform {
    pub(super) fn from_mat3(m: Mat3) -> Self {
        let c = m.to_cols_array_2d();
        Self {
            cols: [
                [c[0][0], c[0][1], c[0][2], 0.0],
                [c[1][0], c[1][1], c[1][2], 0.0],
                [c[2][0], c[2][1], c[2][2], 0.0],
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct ResolutionUniform {
    pub size: [i32; 2],
    pub _pad: [i32; 2], // 16-byte buffer
}

impl ResolutionUniform {
    pub(super) fn new(width: u32, height: u32) -> Self {
        Self {
            size: [
                i32::try_from(width).unwrap_or(i32::MAX),
                i32::try_from(height).unwrap_or(i32::MAX),
            ],
            _pad: [0; 2],
        }
    }
}

/// Uniform buffers shared by all passes; written once per frame.
pub(super) struct UniformBuffers {
    pub transform: wgpu::Buffer,
    pub resolution: wgpu::Buffer,
}

impl UniformBuffers {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let transform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("planeview transform ubo"),
            size: std::mem::size_of::<TransformUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let resolution = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("planeview resolution ubo"),
            size: std::mem::size_of::<ResolutionUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { transform, resolution }
    }

    pub(super) fn write(&self, queue: &wgpu::Queue, frame: &FrameUniforms) {
        let t = TransformUniform::from_mat3(frame.transform);
        queue.write_buffer(&self.transform, 0, bytemuck::bytes_of(&t));

        let (w, h) = frame.resolution;
        let r = ResolutionUniform::new(w, h);
        queue.write_buffer(&self.resolution, 0, bytemuck::bytes_of(&r));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::{Vec2, Vec3};

    #[test]
    fn transform_columns_are_padded_to_vec4() {
        assert_eq!(std::mem::size_of::<TransformUniform>(), 48);

        let m = Mat3::from_scale_angle_translation(Vec2::splat(2.0), 0.0, Vec2::new(3.0, -1.0));
        let u = TransformUniform::from_mat3(m);
        assert_eq!(u.cols[0], [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(u.cols[1], [0.0, 2.0, 0.0, 0.0]);
        assert_eq!(u.cols[2], [3.0, -1.0, 1.0, 0.0]);
    }

    #[test]
    fn column_major_layout_matches_glam() {
        let m = Mat3::from_cols(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0), Vec3::new(7.0, 8.0, 9.0));
        let u = TransformUniform::from_mat3(m);
        assert_eq!(u.cols[1][..3], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn resolution_is_signed_and_padded() {
        assert_eq!(std::mem::size_of::<ResolutionUniform>(), 16);
        assert_eq!(ResolutionUniform::new(1920, 1080).size, [1920, 1080]);
        assert_eq!(ResolutionUniform::new(u32::MAX, 1).size, [i32::MAX, 1]);
    }
}
