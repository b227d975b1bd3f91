use bar_replay_application::session::{FrameSink, SessionStatus};
use bar_replay_domain::services::chart::ChartFrame;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug)]
pub enum TaskEvent {
    Input(crossterm::event::Event),
    /// A new frame is waiting in the [`ChannelFrameSink`].
    Redraw,
}

/// Frame sink for the TUI: keeps only the newest frame and nudges the UI loop.
///
/// `present` runs on whichever thread mutated the session (the replay loop or
/// the UI itself), so it never blocks on the terminal.
pub struct ChannelFrameSink {
    latest: Mutex<Option<ChartFrame>>,
    tx: UnboundedSender<TaskEvent>,
}

impl ChannelFrameSink {
    pub fn new(tx: UnboundedSender<TaskEvent>) -> Self {
        Self {
            latest: Mutex::new(None),
            tx,
        }
    }

    pub fn take_latest(&self) -> Option<ChartFrame> {
        self.latest.lock().take()
    }
}

impl FrameSink for ChannelFrameSink {
    fn present(&self, frame: &ChartFrame, status: &SessionStatus) -> Result<(), String> {
        let coalesced = self.latest.lock().replace(frame.clone()).is_some();
        tracing::trace!(
            cursor = status.cursor,
            state = status.state.as_str(),
            coalesced,
            "frame queued"
        );
        if coalesced {
            return Ok(());
        }
        self.tx
            .send(TaskEvent::Redraw)
            .map_err(|_| "ui event loop has shut down".to_string())
    }
}
