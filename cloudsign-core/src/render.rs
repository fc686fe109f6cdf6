use crate::layout::FrameConfig;
use crate::models::CloudSign;

/// Receives the frame each sign should show, once per sign per tick.
///
/// Called from inside the reconciliation tick: implementations must hand the
/// work off (channel, host thread queue, ...) instead of blocking.
pub trait SignRenderer<T>: Send + Sync {
    fn render(&self, sign: &CloudSign<T>, frame: &FrameConfig);

    /// The sign at `location` is gone; drop anything kept for it.
    fn forget(&self, _location: &T) {}
}
