use glam::{Mat3, Vec2, Vec3};

use super::AspectState;

/// Zoom applied at startup: the NDC half-extent spans this many world units.
pub const INITIAL_ZOOM: f32 = 4.0;

/// Smallest rotate/scale ratio; keeps `M` invertible when the cursor sits on the centre.
const MIN_SCALE_RATIO: f32 = 1e-4;

/// Anchor distances below this are treated as "pressed on the centre" (no scaling).
const MIN_ANCHOR_DISTANCE: f32 = 1e-7;

/// What a mouse drag does to the view.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DragMode {
    /// Translate the plane so the point under the cursor follows it.
    #[default]
    Pan,
    /// Rotate and zoom about the viewport centre.
    RotateScale,
}

impl DragMode {
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            DragMode::Pan => DragMode::RotateScale,
            DragMode::RotateScale => DragMode::Pan,
        }
    }
}

/// State captured when the drag button goes down.
///
/// Never mutated; each press replaces it and release drops it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DragSession {
    pub mode: DragMode,
    /// Cursor position at press time (logical px).
    pub start_cursor: Vec2,
    /// `M` at press time.
    pub start_matrix: Mat3,
}

/// Owns the world mapping `M`, the aspect correction `S`, and the drag state machine.
///
/// `M` is kept invertible at all times and its inverse is cached, since both are
/// read every frame.
#[derive(Debug, Clone)]
pub struct ViewTransform {
    m: Mat3,
    m_inv: Mat3,
    aspect: AspectState,

    /// Logical window size, used for cursor → NDC conversion and the rotation centre.
    screen: Vec2,

    mode: DragMode,
    session: Option<DragSession>,

    /// Aspect-corrected NDC of the cursor at the previous pan tick.
    pan_prev: Vec2,
}

impl ViewTransform {
    pub fn new(width: f32, height: f32) -> Self {
        let m = Mat3::from_diagonal(Vec3::new(INITIAL_ZOOM, INITIAL_ZOOM, 1.0));
        let mut view = Self {
            m,
            m_inv: m.inverse(),
            aspect: AspectState::square(),
            screen: Vec2::ONE,
            mode: DragMode::default(),
            session: None,
            pan_prev: Vec2::ZERO,
        };
        view.on_resize(width, height);
        view
    }

    // ── drag state machine ────────────────────────────────────────────────

    /// Starts a drag at `cursor` using the current persistent mode.
    ///
    /// Any previous session is discarded.
    pub fn begin_drag(&mut self, cursor: Vec2) {
        if self.mode == DragMode::Pan {
            self.pan_prev = self.screen_to_ndc(cursor);
        }

        self.session = Some(DragSession {
            mode: self.mode,
            start_cursor: cursor,
            start_matrix: self.m,
        });

        log::debug!("drag begin: {:?} at ({:.1}, {:.1})", self.mode, cursor.x, cursor.y);
    }

    /// Applies a cursor move to the active drag. No-op without a session.
    pub fn update_drag(&mut self, cursor: Vec2) {
        let Some(session) = self.session else { return };

        match session.mode {
            DragMode::Pan => {
                // Incremental: the translation is post-multiplied in M's local frame,
                // so the world point under the cursor stays under it.
                let p1 = self.screen_to_ndc(cursor);
                let step = self.pan_prev - p1;
                self.set_matrix(self.m * Mat3::from_translation(step));
                self.pan_prev = p1;
            }
            DragMode::RotateScale => {
                let (angle, ratio) = self.rotate_scale_params(session.start_cursor, cursor);
                self.set_matrix(
                    session.start_matrix
                        * Mat3::from_angle(angle)
                        * Mat3::from_scale(Vec2::splat(1.0 / ratio)),
                );
            }
        }
    }

    pub fn end_drag(&mut self) {
        if self.session.take().is_some() {
            log::debug!("drag end");
        }
    }

    /// Flips the persistent mode. An in-progress drag keeps the mode it started with.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        log::debug!("drag mode: {:?}", self.mode);
    }

    /// Updates `S` and the screen size. `M` is untouched.
    ///
    /// Zero-sized windows (minimized) are ignored.
    pub fn on_resize(&mut self, width: f32, height: f32) {
        if !self.aspect.resize(width, height) {
            log::debug!("ignoring degenerate view size {width}x{height}");
            return;
        }
        self.screen = Vec2::new(width, height);
    }

    // ── queries ───────────────────────────────────────────────────────────

    /// `T = M · S`, the coordinate-mapping uniform sent to shaders.
    #[inline]
    pub fn current_transform(&self) -> Mat3 {
        self.m * self.aspect.matrix()
    }

    /// `(M · S)⁻¹`, from cached inverses.
    #[inline]
    pub fn inverse_transform(&self) -> Mat3 {
        self.aspect.inverse() * self.m_inv
    }

    #[inline]
    pub fn matrix(&self) -> Mat3 {
        self.m
    }

    #[inline]
    pub fn inverse_matrix(&self) -> Mat3 {
        self.m_inv
    }

    #[inline]
    pub fn aspect(&self) -> &AspectState {
        &self.aspect
    }

    #[inline]
    pub fn mode(&self) -> DragMode {
        self.mode
    }

    #[inline]
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Converts a cursor position to aspect-corrected NDC (`S · ndc`).
    pub fn screen_to_ndc(&self, cursor: Vec2) -> Vec2 {
        let ndc = Vec3::new(
            -1.0 + 2.0 * cursor.x / self.screen.x,
            1.0 - 2.0 * cursor.y / self.screen.y,
            1.0,
        );
        (self.aspect.matrix() * ndc).truncate()
    }

    /// World position currently under `cursor`.
    pub fn world_at(&self, cursor: Vec2) -> Vec2 {
        self.m.transform_point2(self.screen_to_ndc(cursor))
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Returns `(angle, ratio)` of `cursor` relative to `start`, both measured
    /// about the screen centre. `ratio` never drops below `MIN_SCALE_RATIO`.
    fn rotate_scale_params(&self, start: Vec2, cursor: Vec2) -> (f32, f32) {
        let centre = self.screen * 0.5;
        let from = start - centre;
        let to = cursor - centre;

        let angle = to.y.atan2(to.x) - from.y.atan2(from.x);

        let anchor = from.length();
        let ratio = if anchor > MIN_ANCHOR_DISTANCE {
            (to.length() / anchor).max(MIN_SCALE_RATIO)
        } else {
            1.0
        };

        (angle, ratio)
    }

    fn set_matrix(&mut self, m: Mat3) {
        debug_assert!(m.is_finite() && m.determinant() != 0.0, "view matrix must stay invertible");
        self.m = m;
        self.m_inv = m.inverse();
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}
