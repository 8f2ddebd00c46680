use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// What the runtime drives: one `init`, then `step` per redraw.
pub trait App {
    /// Called once, after the window and GPU exist. Returning `false` stops
    /// the runtime with an error.
    fn init(&mut self, gpu: &Gpu<'_>, width: u32, height: u32) -> bool;

    /// Drawable size changed, in physical pixels. Never zero.
    fn resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called once per redraw.
    fn step(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
