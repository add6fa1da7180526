use super::ctx::{FrameCtx, SetupCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Every callback runs on the render thread.
pub trait App: Send + 'static {
    /// Called once after the device exists, before the first frame. Typically
    /// adds and registers the application's draw operations.
    ///
    /// The window thread is already running its event loop at this point, so
    /// `setup` may block on `perform_on_window_with_result`.
    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per frame before the frame is rendered. Draws enqueued here
    /// are rendered this frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;

    /// Called once after the render loop stopped, before operations are disposed.
    fn on_shutdown(&mut self) {}
}
