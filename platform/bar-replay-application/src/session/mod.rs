//! The shared replay session.
//!
//! All mutable state (run/pause flags, cursor, interaction mode, annotations,
//! selection) lives in one [`SessionState`] behind a single mutex. Commands from
//! the front end and ticks from the background loop take that lock for the
//! whole operation and present a fresh frame before releasing it, so every
//! frame a sink receives is a consistent picture of the state.

mod replay_loop;

use bar_replay_domain::entities::annotation_board::{
    AnnotationBoard, AnnotationSettings, ClickOutcome,
};
use bar_replay_domain::entities::playback::{Playback, PlaybackState};
use bar_replay_domain::services::chart::{compose_frame, ChartFrame, ChartStyle};
use bar_replay_domain::value_objects::annotation::{AnnotationId, MarkerSide};
use bar_replay_domain::value_objects::bar::Bar;
use bar_replay_domain::value_objects::interaction_mode::InteractionMode;
use bar_replay_domain::value_objects::point::ChartPoint;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Receives every frame produced after a state change.
///
/// Called with the session lock held; implementations should hand the frame
/// off quickly and must not call back into the session.
pub trait FrameSink: Send + Sync {
    fn present(&self, frame: &ChartFrame, status: &SessionStatus) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: PlaybackState,
    pub cursor: usize,
    pub total: usize,
    pub paused: bool,
    pub mode: InteractionMode,
    pub selected: Option<AnnotationId>,
    pub pending_trend_points: usize,
    pub trend_count: usize,
    pub marker_count: usize,
    pub pause_label: &'static str,
    pub step_forward_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    AlreadyRunning,
    NotRunning,
    ForwardDisabled,
    AtEnd,
    AtStart,
    NothingSelected,
    LoopUnavailable,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AlreadyRunning => "replay is already running",
            Self::NotRunning => "replay is not running",
            Self::ForwardDisabled => "forward is disabled while playing",
            Self::AtEnd => "already at the last bar",
            Self::AtStart => "already at the first bar",
            Self::NothingSelected => "no annotation selected for deletion",
            Self::LoopUnavailable => "failed to start the replay loop",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    NoOp(NoOpReason),
}

impl CommandOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub tick_interval: Duration,
    pub annotations: AnnotationSettings,
    pub style: ChartStyle,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            annotations: AnnotationSettings::default(),
            style: ChartStyle::default(),
        }
    }
}

struct SessionState {
    playback: Playback,
    board: AnnotationBoard,
    /// Bumped on every start/stop; a loop thread exits once its epoch is stale.
    epoch: u64,
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.playback.state(),
            cursor: self.playback.cursor(),
            total: self.playback.len(),
            paused: self.playback.paused(),
            mode: self.board.mode(),
            selected: self.board.selected(),
            pending_trend_points: self.board.pending_points().len(),
            trend_count: self.board.trends().len(),
            marker_count: self.board.markers().len(),
            pause_label: self.playback.pause_label(),
            step_forward_enabled: self.playback.step_forward_enabled(),
        }
    }
}

struct Shared {
    bars: Arc<[Bar]>,
    state: Mutex<SessionState>,
    /// Wakes a sleeping loop on stop and wakes idle waiters when the loop exits.
    wake: Condvar,
    sink: Arc<dyn FrameSink>,
    style: ChartStyle,
    tick_interval: Duration,
}

impl Shared {
    fn present_locked(&self, state: &SessionState) {
        let frame = match compose_frame(
            &self.bars,
            state.playback.cursor(),
            &state.board,
            &self.style,
        ) {
            Ok(frame) => frame,
            Err(err) => {
                metrics::counter!("bar_replay.session.render_failures_total").increment(1);
                tracing::error!(error = %err, "error while composing the chart");
                return;
            }
        };
        if let Err(err) = self.sink.present(&frame, &state.status()) {
            metrics::counter!("bar_replay.session.render_failures_total").increment(1);
            tracing::warn!(error = %err, "error while plotting the chart");
        }
    }
}

pub struct ReplaySession {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReplaySession {
    pub fn new(bars: Vec<Bar>, options: SessionOptions, sink: Arc<dyn FrameSink>) -> Self {
        let len = bars.len();
        Self {
            shared: Arc::new(Shared {
                bars: bars.into(),
                state: Mutex::new(SessionState {
                    playback: Playback::new(len),
                    board: AnnotationBoard::new(options.annotations),
                    epoch: 0,
                }),
                wake: Condvar::new(),
                sink,
                style: options.style,
                tick_interval: options.tick_interval,
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.shared.bars
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.state.lock().status()
    }

    pub fn frame(&self) -> Result<ChartFrame, String> {
        let state = self.shared.state.lock();
        compose_frame(
            &self.shared.bars,
            state.playback.cursor(),
            &state.board,
            &self.shared.style,
        )
    }

    /// Presents the current state without changing it.
    pub fn redraw(&self) {
        let state = self.shared.state.lock();
        self.shared.present_locked(&state);
    }

    pub fn start(&self) -> CommandOutcome {
        count_command("start");
        let epoch = {
            let mut state = self.shared.state.lock();
            if !state.playback.start() {
                tracing::info!("replay is already running");
                return CommandOutcome::NoOp(NoOpReason::AlreadyRunning);
            }
            state.epoch += 1;
            state.epoch
        };

        let mut worker = self.worker.lock();
        // A handle left here belongs to a loop that already ran to the end.
        if let Some(finished) = worker.take() {
            join_loop(finished);
        }

        let shared = self.shared.clone();
        match std::thread::Builder::new()
            .name("replay-loop".to_string())
            .spawn(move || replay_loop::run(shared, epoch))
        {
            Ok(handle) => {
                *worker = Some(handle);
                tracing::info!(epoch, bars = self.shared.bars.len(), "replay started");
                CommandOutcome::Applied
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to spawn replay loop");
                let mut state = self.shared.state.lock();
                state.playback.stop();
                state.epoch += 1;
                CommandOutcome::NoOp(NoOpReason::LoopUnavailable)
            }
        }
    }

    pub fn toggle_pause(&self) -> CommandOutcome {
        count_command("toggle_pause");
        let mut state = self.shared.state.lock();
        match state.playback.toggle_pause() {
            Some(paused) => {
                tracing::info!(paused, cursor = state.playback.cursor(), "pause toggled");
                self.shared.present_locked(&state);
                CommandOutcome::Applied
            }
            None => {
                tracing::info!("pause ignored: replay is not running");
                CommandOutcome::NoOp(NoOpReason::NotRunning)
            }
        }
    }

    /// Halts playback, rewinds to 0, and returns only after the loop thread has exited.
    pub fn stop(&self) -> CommandOutcome {
        count_command("stop");
        self.halt_loop();
        let state = self.shared.state.lock();
        tracing::info!("replay stopped");
        self.shared.present_locked(&state);
        CommandOutcome::Applied
    }

    pub fn step_forward(&self) -> CommandOutcome {
        count_command("step_forward");
        let mut state = self.shared.state.lock();
        if !state.playback.step_forward_enabled() {
            tracing::info!("forward ignored while playing");
            return CommandOutcome::NoOp(NoOpReason::ForwardDisabled);
        }
        if !state.playback.step_forward() {
            tracing::info!(cursor = state.playback.cursor(), "forward ignored at the last bar");
            return CommandOutcome::NoOp(NoOpReason::AtEnd);
        }
        tracing::debug!(cursor = state.playback.cursor(), "stepped forward");
        self.shared.present_locked(&state);
        CommandOutcome::Applied
    }

    /// Steps one bar back; playback is left paused either way.
    pub fn step_back(&self) -> CommandOutcome {
        count_command("step_back");
        let mut state = self.shared.state.lock();
        let moved = state.playback.step_back();
        self.shared.present_locked(&state);
        if !moved {
            tracing::info!("rewind ignored at the first bar");
            return CommandOutcome::NoOp(NoOpReason::AtStart);
        }
        tracing::debug!(cursor = state.playback.cursor(), "stepped back");
        CommandOutcome::Applied
    }

    pub fn set_mode(&self, mode: InteractionMode) -> CommandOutcome {
        count_command("set_mode");
        let mut state = self.shared.state.lock();
        state.board.set_mode(mode);
        tracing::info!(%mode, "mode set");
        CommandOutcome::Applied
    }

    pub fn clear_indicators(&self) -> CommandOutcome {
        count_command("clear_indicators");
        let mut state = self.shared.state.lock();
        state.board.clear();
        tracing::info!("indicators cleared");
        self.shared.present_locked(&state);
        CommandOutcome::Applied
    }

    pub fn delete_selected(&self) -> CommandOutcome {
        count_command("delete_selected");
        let mut state = self.shared.state.lock();
        match state.board.delete_selected() {
            Some(removed) => {
                tracing::info!(annotation_id = %removed.id, "annotation deleted");
                self.shared.present_locked(&state);
                CommandOutcome::Applied
            }
            None => {
                tracing::info!("no annotation selected for deletion");
                CommandOutcome::NoOp(NoOpReason::NothingSelected)
            }
        }
    }

    /// Handles a pointer click in chart coordinates; `None` means the click
    /// landed outside the plotted axes and is ignored.
    pub fn click(&self, point: Option<ChartPoint>) -> ClickOutcome {
        let Some(point) = point else {
            return ClickOutcome::Ignored;
        };
        count_command("click");

        let mut state = self.shared.state.lock();
        let outcome = state.board.click(point);
        match &outcome {
            ClickOutcome::Ignored => return outcome,
            ClickOutcome::TrendPointAdded { pending } => {
                tracing::debug!(pending, x = point.x, y = point.y, "trend point added");
            }
            ClickOutcome::TrendCreated(trend) => {
                metrics::counter!("bar_replay.session.annotations_created_total", "kind" => "trend")
                    .increment(1);
                tracing::info!(
                    annotation_id = %trend.id,
                    x1 = trend.start.x,
                    y1 = trend.start.y,
                    x2 = trend.end.x,
                    y2 = trend.end.y,
                    "trendline drawn"
                );
            }
            ClickOutcome::MarkerPlaced(marker) => {
                let kind = match marker.side {
                    MarkerSide::Buy => "buy",
                    MarkerSide::Sell => "sell",
                };
                metrics::counter!("bar_replay.session.annotations_created_total", "kind" => kind)
                    .increment(1);
                tracing::info!(
                    annotation_id = %marker.id,
                    x = marker.at.x,
                    y = marker.at.y,
                    "{} annotation added",
                    marker.label()
                );
            }
            ClickOutcome::Selected(id) => {
                tracing::info!(annotation_id = %id, "annotation selected");
            }
            ClickOutcome::NothingHit => {
                tracing::info!(x = point.x, y = point.y, "no annotation clicked");
            }
        }
        self.shared.present_locked(&state);
        outcome
    }

    /// Blocks until playback is no longer running or `timeout` elapses.
    /// Returns `true` when the session is idle.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.playback.running() {
            if self.shared.wake.wait_until(&mut state, deadline).timed_out() {
                return !state.playback.running();
            }
        }
        true
    }

    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        while state.playback.running() {
            self.shared.wake.wait(&mut state);
        }
    }

    fn halt_loop(&self) {
        {
            let mut state = self.shared.state.lock();
            state.playback.stop();
            state.epoch += 1;
            self.shared.wake.notify_all();
        }
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            join_loop(handle);
        }
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        self.halt_loop();
    }
}

/// Returns false when the loop thread panicked.
fn join_loop(handle: JoinHandle<()>) -> bool {
    let joined = handle.join().is_ok();
    if !joined {
        tracing::error!("replay loop thread panicked");
    }
    joined
}

fn count_command(command: &'static str) {
    metrics::counter!("bar_replay.session.commands_total", "command" => command).increment(1);
}

#[cfg(test)]
mod tests {
    use super::{
        join_loop, CommandOutcome, FrameSink, NoOpReason, ReplaySession, SessionOptions,
        SessionStatus,
    };
    use bar_replay_domain::entities::annotation_board::ClickOutcome;
    use bar_replay_domain::entities::playback::PlaybackState;
    use bar_replay_domain::services::chart::ChartFrame;
    use bar_replay_domain::value_objects::bar::Bar;
    use bar_replay_domain::value_objects::interaction_mode::InteractionMode;
    use bar_replay_domain::value_objects::point::ChartPoint;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSink {
        frames: Mutex<Vec<usize>>,
    }

    impl FrameSink for CountingSink {
        fn present(&self, frame: &ChartFrame, _status: &SessionStatus) -> Result<(), String> {
            self.frames.lock().push(frame.cursor);
            Ok(())
        }
    }

    struct FailingSink;

    impl FrameSink for FailingSink {
        fn present(&self, _frame: &ChartFrame, _status: &SessionStatus) -> Result<(), String> {
            Err("plot backend unavailable".to_string())
        }
    }

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                timestamp: i as i64 * 60,
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 1.0,
            })
            .collect()
    }

    fn session(n: usize) -> (ReplaySession, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink::default());
        let options = SessionOptions {
            tick_interval: Duration::from_millis(2),
            ..SessionOptions::default()
        };
        (ReplaySession::new(bars(n), options, sink.clone()), sink)
    }

    #[test]
    fn manual_stepping_respects_bounds() {
        let (session, sink) = session(3);
        assert_eq!(session.step_back(), CommandOutcome::NoOp(NoOpReason::AtStart));
        assert_eq!(session.step_forward(), CommandOutcome::Applied);
        assert_eq!(session.step_forward(), CommandOutcome::Applied);
        assert_eq!(session.step_forward(), CommandOutcome::NoOp(NoOpReason::AtEnd));
        assert_eq!(session.status().cursor, 2);
        assert_eq!(session.step_back(), CommandOutcome::Applied);
        assert_eq!(session.status().cursor, 1);
        assert!(session.status().paused);
        assert!(sink.frames.lock().contains(&2));
    }

    #[test]
    fn delete_without_selection_reports_noop() {
        let (session, _sink) = session(3);
        session.set_mode(InteractionMode::Trend);
        session.click(Some(ChartPoint::new(0.0, 0.0)));
        session.click(Some(ChartPoint::new(1.0, 1.0)));

        assert_eq!(
            session.delete_selected(),
            CommandOutcome::NoOp(NoOpReason::NothingSelected)
        );
        assert_eq!(session.status().trend_count, 1);
    }

    #[test]
    fn outside_click_is_ignored_without_redraw() {
        let (session, sink) = session(3);
        session.set_mode(InteractionMode::Buy);
        assert_eq!(session.click(None), ClickOutcome::Ignored);
        assert_eq!(session.status().marker_count, 0);
        assert!(sink.frames.lock().is_empty());
    }

    #[test]
    fn sink_failure_does_not_break_commands() {
        let session = ReplaySession::new(bars(3), SessionOptions::default(), Arc::new(FailingSink));
        assert_eq!(session.step_forward(), CommandOutcome::Applied);
        assert_eq!(session.status().cursor, 1);
        assert_eq!(session.clear_indicators(), CommandOutcome::Applied);
    }

    #[test]
    fn toggle_pause_requires_running() {
        let (session, _sink) = session(3);
        assert_eq!(session.toggle_pause(), CommandOutcome::NoOp(NoOpReason::NotRunning));
        assert_eq!(session.status().state, PlaybackState::Stopped);
        assert_eq!(session.status().pause_label, "Pause");
    }

    #[test]
    fn panicked_loop_thread_is_reported_not_propagated() {
        let panicked = std::thread::spawn(|| panic!("loop failure"));
        assert!(!join_loop(panicked));
        assert!(join_loop(std::thread::spawn(|| {})));
    }
}
