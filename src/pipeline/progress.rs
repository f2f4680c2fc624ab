//! Progress publication

use log::trace;
use tokio::sync::broadcast;

use crate::models::ProgressEvent;

/// Buffered events per subscriber before the slowest one starts lagging.
const PROGRESS_CAPACITY: usize = 256;

/// Fan-out of stage boundary events.
///
/// Publishing never blocks and never fails: with no subscribers, or with a
/// lagging one, events are simply dropped.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PROGRESS_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ProgressEvent) {
        trace!(
            "[{}] {} {}%: {}",
            event.run_id,
            event.stage,
            event.percent_complete,
            event.message
        );
        let _ = self.sender.send(event);
    }
}
