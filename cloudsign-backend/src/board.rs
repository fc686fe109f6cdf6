//! Render sink of the backend: keeps the last rendered lines of every sign.
//!
//! The sign tick hands frames over through a bounded channel and never waits;
//! a single worker resolves the placeholders and stores the result. Forgotten
//! signs go through the same channel so a queued frame cannot bring them back.

use cloudsign_core::{BackendServer, CloudSign, FrameConfig, PlaceholderResolver, SignLocation, SignRenderer};
use scc::HashMap;
use scc::hash_map::Entry;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::helpers::now;

/// Lines shown by one sign after placeholder resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSign {
    pub lines: Vec<String>,
    /// `group-id` of the shown server
    pub server: Option<String>,
    /// Unix timestamp (seconds)
    pub rendered_at: i64,
}

struct RenderJob {
    location: SignLocation,
    server: Option<BackendServer>,
    frame: FrameConfig,
}

enum BoardJob {
    Render(RenderJob),
    Forget(SignLocation),
}

#[derive(Clone)]
pub struct SignBoard {
    jobs: mpsc::Sender<BoardJob>,
    rendered: Arc<HashMap<SignLocation, RenderedSign>>,
}

impl SignBoard {
    /// Create the board and spawn its worker. The worker ends once every
    /// clone of the board is dropped.
    pub fn spawn(capacity: usize, resolver: PlaceholderResolver) -> (Self, JoinHandle<()>) {
        let (jobs, rx) = mpsc::channel(capacity.max(1));
        let rendered = Arc::new(HashMap::new());
        let worker = tokio::spawn(run_worker(rx, resolver, Arc::clone(&rendered)));
        (Self { jobs, rendered }, worker)
    }

    pub async fn lines(&self, location: &SignLocation) -> Option<RenderedSign> {
        self.rendered
            .read_async(location, |_, sign| sign.clone())
            .await
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }
}

impl SignRenderer<SignLocation> for SignBoard {
    fn render(&self, sign: &CloudSign<SignLocation>, frame: &FrameConfig) {
        let job = RenderJob {
            location: sign.location.clone(),
            server: sign.server.clone(),
            frame: frame.clone(),
        };
        match self.jobs.try_send(BoardJob::Render(job)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                trace!(location = %sign.location, "render queue full, dropping frame");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("render worker stopped, dropping frame");
            }
        }
    }

    fn forget(&self, location: &SignLocation) {
        self.rendered.remove_sync(location);
        match self.jobs.try_send(BoardJob::Forget(location.clone())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(location = %location, "render queue full, a queued frame may linger");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<BoardJob>,
    resolver: PlaceholderResolver,
    rendered: Arc<HashMap<SignLocation, RenderedSign>>,
) {
    while let Some(job) = rx.recv().await {
        let job = match job {
            BoardJob::Render(job) => job,
            BoardJob::Forget(location) => {
                rendered.remove_async(&location).await;
                continue;
            }
        };
        let mut lines = Vec::with_capacity(job.frame.lines().len());
        for line in job.frame.lines() {
            lines.push(resolver.resolve_line(line, job.server.as_ref()).await);
        }
        let sign = RenderedSign {
            lines,
            server: job.server.as_ref().map(BackendServer::display_name),
            rendered_at: now(),
        };

        match rendered.entry_async(job.location).await {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() = sign;
            }
            Entry::Vacant(entry) => {
                entry.insert_entry(sign);
            }
        }
    }
    debug!("render worker stopped");
}
