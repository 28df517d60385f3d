//! GPU device and window surface.
//!
//! `Gpu` owns the device, queue and configured surface for the single viewer
//! window, and turns surface failures into a [`SurfaceErrorAction`].

mod gpu;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
