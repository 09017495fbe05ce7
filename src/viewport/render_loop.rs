/// Cooperative per-viewport render loop.
///
/// The host calls [`RenderLoop::begin_frame`] on every display tick and
/// re-arms its frame callback only while it returns `true`. Stopping is
/// explicit and happens once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLoop {
    running: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn start() -> Self {
        Self { running: true, frames: 0 }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn begin_frame(&mut self) -> bool {
        if self.running {
            self.frames += 1;
        }
        self.running
    }

    /// Returns `true` only for the call that actually stopped the loop.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }
}
