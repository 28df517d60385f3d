use glam::{Mat3, Vec3};

/// Aspect-ratio correction `S = diag(w / h, 1, 1)` with its cached inverse.
///
/// Maps the non-square device viewport into a ratio-preserving square space,
/// so one world unit has the same on-screen length along both axes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AspectState {
    ratio: f32,
    s: Mat3,
    s_inv: Mat3,
}

impl AspectState {
    /// Builds the correction for a `width × height` viewport.
    ///
    /// Degenerate sizes fall back to a square aspect.
    pub fn new(width: f32, height: f32) -> Self {
        let mut state = Self::square();
        state.resize(width, height);
        state
    }

    pub fn square() -> Self {
        Self {
            ratio: 1.0,
            s: Mat3::IDENTITY,
            s_inv: Mat3::IDENTITY,
        }
    }

    /// Recomputes `S` for a new viewport size.
    ///
    /// Returns `false` (and keeps the previous value) when either side is zero,
    /// negative or non-finite, e.g. while the window is minimized.
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        let valid = width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite();
        if !valid {
            return false;
        }

        self.ratio = width / height;
        self.s = Mat3::from_diagonal(Vec3::new(self.ratio, 1.0, 1.0));
        self.s_inv = self.s.inverse();
        true
    }

    #[inline]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    #[inline]
    pub fn matrix(&self) -> Mat3 {
        self.s
    }

    #[inline]
    pub fn inverse(&self) -> Mat3 {
        self.s_inv
    }
}

impl Default for AspectState {
    fn default() -> Self {
        Self::square()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_viewport_stretches_x() {
        let a = AspectState::new(1000.0, 800.0);
        assert_eq!(a.ratio(), 1.25);
        assert_eq!(a.matrix().x_axis, Vec3::new(1.25, 0.0, 0.0));
        assert_eq!(a.matrix().y_axis, Vec3::Y);
    }

    #[test]
    fn inverse_is_cached_and_correct() {
        let a = AspectState::new(640.0, 480.0);
        assert!((a.inverse() * a.matrix()).abs_diff_eq(Mat3::IDENTITY, 1e-6));
    }

    #[test]
    fn zero_size_keeps_previous_ratio() {
        let mut a = AspectState::new(800.0, 400.0);
        assert!(!a.resize(0.0, 400.0));
        assert!(!a.resize(800.0, 0.0));
        assert_eq!(a.ratio(), 2.0);
    }

    #[test]
    fn degenerate_initial_size_is_square() {
        let a = AspectState::new(0.0, 0.0);
        assert_eq!(a, AspectState::square());
    }
}
