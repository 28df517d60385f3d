//! Planeview engine crate.
//!
//! Platform + GPU runtime, the interactive view transform, and the multi-pass
//! shader compositor used by the `planeview` binary.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod render;
pub mod view;
