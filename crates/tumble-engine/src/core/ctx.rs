use winit::window::Window;

use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};

use super::app::AppControl;

/// Per-frame context passed to [`App::step`](super::App::step).
///
/// `'a` is the callback duration, `'w` the window borrow carried by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    /// Frames presented before this one.
    pub frame_index: u64,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires a surface frame, lets `record` fill its encoder, then presents.
    ///
    /// `record` hands the frame back when it is done with it; returning `None`
    /// drops the frame unpresented. Surface errors are handled here and only
    /// surface to the caller as [`AppControl::Exit`] when fatal.
    pub fn render<F>(&mut self, record: F) -> AppControl
    where
        F: FnOnce(GpuFrame) -> Option<GpuFrame>,
    {
        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                log::debug!("frame {} skipped: {err}", self.frame_index);
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        let Some(frame) = record(frame) else {
            log::warn!("frame {} was not handed back; not presented", self.frame_index);
            return AppControl::Continue;
        };

        self.window.pre_present_notify();
        self.gpu.submit(frame);

        AppControl::Continue
    }
}
