//! Per-layout frame rotation.

use std::sync::Arc;

use tokio::time::Instant;

use crate::layout::Layout;
use crate::registry::LocationKey;
use crate::state::SignState;

/// Advance every layout whose interval has elapsed. Returns how many advanced.
///
/// Layouts rotate whether or not a sign currently shows them. Layouts without
/// frames are skipped.
pub async fn advance_frames<T: LocationKey>(
    state: &SignState<T>,
    layouts: &[Arc<Layout>],
    now: Instant,
) -> usize {
    let mut advanced = 0;
    for layout in layouts.iter().filter(|l| !l.is_empty()) {
        if state
            .advance_if_due(&layout.name, layout.frames.len(), layout.frame_update_interval, now)
            .await
            .is_some()
        {
            advanced += 1;
        }
    }
    advanced
}
