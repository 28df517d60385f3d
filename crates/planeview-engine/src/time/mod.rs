//! Frame timing.
//!
//! The runtime stamps each redraw with an `Instant`; `FrameRate` turns those
//! stamps into a periodic average for logging.

mod frame_rate;

pub use frame_rate::FrameRate;
