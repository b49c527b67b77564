//! Tokio-backed retry timer

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ChannelInput, RetryTimer, TransportEvent};

/// One pending sleep task at a time; rescheduling aborts the previous one
pub struct TokioRetryTimer {
    events: mpsc::UnboundedSender<ChannelInput>,
    pending: Option<JoinHandle<()>>,
}

impl TokioRetryTimer {
    pub fn new(events: mpsc::UnboundedSender<ChannelInput>) -> Self {
        Self {
            events,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl RetryTimer for TokioRetryTimer {
    fn schedule(&mut self, delay: Duration, generation: u64) {
        self.cancel();

        let events = self.events.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ChannelInput::Event(TransportEvent::RetryElapsed { generation }));
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}
