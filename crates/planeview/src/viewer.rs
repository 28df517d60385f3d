use anyhow::Result;
use glam::Vec2;

use planeview_engine::core::{App, AppControl, FrameCtx};
use planeview_engine::input::{InputEvent, Key, KeyState, MouseButton, MouseButtonState};
use planeview_engine::render::{FrameUniforms, PipelineCompositor, ProgramSource, ShaderProgram, TileTexture};
use planeview_engine::time::FrameRate;
use planeview_engine::view::ViewTransform;

use crate::loader::TileImage;

/// The interactive viewer: owns the view state and the pass pipeline.
///
/// GPU objects are created on the first frame, once a device exists.
pub struct Viewer {
    sources: Vec<ProgramSource>,
    tile: Option<TileImage>,

    view: ViewTransform,
    compositor: Option<PipelineCompositor>,

    /// Last seen sizes; a change triggers the resize paths.
    logical: (f32, f32),
    framebuffer: (u32, u32),

    fps: FrameRate,
}

impl Viewer {
    pub fn new(sources: Vec<ProgramSource>, tile: Option<TileImage>, logical: (f32, f32)) -> Self {
        Self {
            sources,
            tile,
            view: ViewTransform::new(logical.0, logical.1),
            compositor: None,
            logical,
            framebuffer: (0, 0),
            fps: FrameRate::default(),
        }
    }

    #[inline]
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Applies queued input in arrival order.
    pub fn handle_input(&mut self, events: &[InputEvent]) -> AppControl {
        for ev in events {
            match ev {
                InputEvent::PointerButton(b) if b.button == MouseButton::Left => match (b.state, b.position) {
                    (MouseButtonState::Pressed, Some((x, y))) => self.view.begin_drag(Vec2::new(x, y)),
                    (MouseButtonState::Pressed, None) => log::debug!("press before any cursor motion; no drag"),
                    (MouseButtonState::Released, _) => self.view.end_drag(),
                },

                InputEvent::PointerMoved(p) => self.view.update_drag(Vec2::new(p.x, p.y)),

                // Focus loss drops held buttons; do not leave a drag running.
                InputEvent::Focused(false) => self.view.end_drag(),

                InputEvent::Key {
                    key,
                    state: KeyState::Pressed,
                    repeat: false,
                    ..
                } => match key {
                    Key::Space => self.view.toggle_mode(),
                    Key::Escape | Key::Q => {
                        log::info!("quit requested");
                        return AppControl::Exit;
                    }
                    _ => {}
                },

                _ => {}
            }
        }

        AppControl::Continue
    }

    /// Updates the aspect correction when the logical window size changes.
    pub fn resize_view(&mut self, logical: (f32, f32)) {
        if logical == self.logical {
            return;
        }
        self.logical = logical;
        self.view.on_resize(logical.0, logical.1);
    }

    fn ensure_compositor(&mut self, ctx: &FrameCtx<'_, '_>) -> Result<()> {
        if self.compositor.is_some() {
            return Ok(());
        }

        let rctx = ctx.render_ctx();
        let programs = self
            .sources
            .iter()
            .map(|src| ShaderProgram::compile(rctx.device, src))
            .collect();

        let mut compositor = PipelineCompositor::configure(&rctx, programs)?;

        if let Some(tile) = self.tile.take() {
            let texture = TileTexture::upload(&rctx, "tiletex", &tile.mip_levels())?;
            compositor.set_tile_texture(Some(texture));
        }

        log::info!("configured {} pass(es)", compositor.passes().len());
        self.framebuffer = rctx.framebuffer;
        self.compositor = Some(compositor);
        Ok(())
    }
}

impl App for Viewer {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.resize_view(ctx.window.logical_size());

        if self.handle_input(&ctx.input_frame.events) == AppControl::Exit {
            return AppControl::Exit;
        }

        if let Err(e) = self.ensure_compositor(ctx) {
            log::error!("failed to set up rendering: {e:#}");
            return AppControl::Exit;
        }

        let physical = ctx.window.physical_size();
        let Some(compositor) = self.compositor.as_mut() else {
            return AppControl::Continue;
        };

        if physical != self.framebuffer && physical.0 > 0 && physical.1 > 0 {
            let rctx = ctx.render_ctx();
            compositor.on_resize(&rctx, physical.0, physical.1);
            self.framebuffer = physical;
        }

        let frame = FrameUniforms {
            transform: self.view.current_transform(),
            resolution: physical,
        };

        let control = ctx.render(|rctx, target| compositor.render_frame(rctx, target, &frame));

        if let Some(fps) = self.fps.record(ctx.now) {
            log::debug!("{fps:.1} fps");
        }

        control
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use planeview_engine::input::{Modifiers, PointerButtonEvent, PointerMoveEvent};
    use planeview_engine::view::DragMode;

    fn viewer() -> Viewer {
        Viewer::new(Vec::new(), None, (800.0, 800.0))
    }

    fn left(state: MouseButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state,
            position: Some((x, y)),
            modifiers: Modifiers::default(),
        })
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerMoveEvent { x, y })
    }

    fn press(key: Key, repeat: bool) -> InputEvent {
        InputEvent::Key {
            key,
            state: KeyState::Pressed,
            modifiers: Modifiers::default(),
            code: 0,
            repeat,
        }
    }

    #[test]
    fn left_drag_pans_the_view() {
        let mut v = viewer();
        let events = [
            left(MouseButtonState::Pressed, 400.0, 400.0),
            moved(500.0, 400.0),
            moved(600.0, 400.0),
            left(MouseButtonState::Released, 600.0, 400.0),
        ];
        assert_eq!(v.handle_input(&events), AppControl::Continue);

        assert!(!v.view().is_dragging());
        assert!((v.view().matrix().z_axis.x + 2.0).abs() < 1e-5);
    }

    #[test]
    fn press_with_unknown_position_starts_no_drag() {
        let mut v = viewer();
        let before = v.view().matrix();
        let press = InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state: MouseButtonState::Pressed,
            position: None,
            modifiers: Modifiers::default(),
        });
        v.handle_input(&[press, moved(700.0, 100.0)]);

        assert!(!v.view().is_dragging());
        assert_eq!(v.view().matrix(), before);
    }

    #[test]
    fn hover_without_button_does_nothing() {
        let mut v = viewer();
        let before = v.view().matrix();
        v.handle_input(&[moved(10.0, 10.0), moved(700.0, 300.0)]);
        assert_eq!(v.view().matrix(), before);
    }

    #[test]
    fn space_toggles_once_per_press() {
        let mut v = viewer();
        v.handle_input(&[press(Key::Space, false), press(Key::Space, true), press(Key::Space, true)]);
        assert_eq!(v.view().mode(), DragMode::RotateScale);
    }

    #[test]
    fn escape_and_q_quit() {
        assert_eq!(viewer().handle_input(&[press(Key::Escape, false)]), AppControl::Exit);
        assert_eq!(viewer().handle_input(&[press(Key::Q, false)]), AppControl::Exit);
        assert_eq!(viewer().handle_input(&[press(Key::Enter, false)]), AppControl::Continue);
    }

    #[test]
    fn focus_loss_ends_the_drag() {
        let mut v = viewer();
        v.handle_input(&[left(MouseButtonState::Pressed, 100.0, 100.0), InputEvent::Focused(false)]);
        assert!(!v.view().is_dragging());
    }

    #[test]
    fn resize_view_tracks_logical_size() {
        let mut v = viewer();
        v.resize_view((1600.0, 800.0));
        assert!((v.view().aspect().ratio() - 2.0).abs() < 1e-6);
    }
}
