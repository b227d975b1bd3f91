use bar_replay_application::session::{
    CommandOutcome, FrameSink, NoOpReason, ReplaySession, SessionOptions, SessionStatus,
};
use bar_replay_domain::entities::annotation_board::ClickOutcome;
use bar_replay_domain::entities::playback::PlaybackState;
use bar_replay_domain::services::chart::ChartFrame;
use bar_replay_domain::value_objects::bar::Bar;
use bar_replay_domain::value_objects::interaction_mode::InteractionMode;
use bar_replay_domain::value_objects::point::ChartPoint;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecordingSink {
    frames: Mutex<Vec<(usize, PlaybackState)>>,
}

impl RecordingSink {
    fn len(&self) -> usize {
        self.frames.lock().len()
    }

    fn cursors(&self) -> Vec<usize> {
        self.frames.lock().iter().map(|(c, _)| *c).collect()
    }
}

impl FrameSink for RecordingSink {
    fn present(&self, frame: &ChartFrame, status: &SessionStatus) -> Result<(), String> {
        assert_eq!(frame.cursor, status.cursor);
        assert_eq!(frame.candles.len(), frame.cursor);
        self.frames.lock().push((frame.cursor, status.state));
        Ok(())
    }
}

fn bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let base = 150.0 + i as f64;
            Bar {
                timestamp: 1_640_995_200 + 86_400 * i as i64,
                open: base,
                high: base + 1.5,
                low: base - 1.5,
                close: base + 0.5,
                volume: 1_000.0,
            }
        })
        .collect()
}

fn session_with(n: usize, tick_ms: u64) -> (ReplaySession, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let options = SessionOptions {
        tick_interval: Duration::from_millis(tick_ms),
        ..SessionOptions::default()
    };
    (ReplaySession::new(bars(n), options, sink.clone()), sink)
}

#[test]
fn replay_runs_to_the_end_and_finishes() {
    let (session, sink) = session_with(5, 1);
    assert_eq!(session.start(), CommandOutcome::Applied);
    assert!(session.wait_idle_timeout(Duration::from_secs(5)));

    let status = session.status();
    assert_eq!(status.cursor, 5);
    assert_eq!(status.state, PlaybackState::Finished);
    assert!(status.step_forward_enabled);
    assert_eq!(sink.cursors(), vec![1, 2, 3, 4, 5, 5]);
}

#[test]
fn start_while_running_is_a_noop() {
    let (session, _sink) = session_with(1_000, 50);
    assert_eq!(session.start(), CommandOutcome::Applied);
    assert_eq!(
        session.start(),
        CommandOutcome::NoOp(NoOpReason::AlreadyRunning)
    );
    session.stop();
}

#[test]
fn start_always_rewinds_to_zero() {
    let (session, sink) = session_with(10, 1);
    for _ in 0..4 {
        session.step_forward();
    }
    assert_eq!(session.status().cursor, 4);

    assert_eq!(session.toggle_pause(), CommandOutcome::NoOp(NoOpReason::NotRunning));

    let before = sink.len();
    session.start();
    assert_eq!(first_frame_after(&sink, before), 1);
    session.stop();

    // Restart after a finished run rewinds as well.
    session.start();
    assert!(session.wait_idle_timeout(Duration::from_secs(5)));
    assert_eq!(session.status().cursor, 10);
    let before = sink.len();
    session.start();
    assert_eq!(first_frame_after(&sink, before), 1);
    session.stop();
}

fn first_frame_after(sink: &RecordingSink, seen: usize) -> usize {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while sink.len() <= seen && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    sink.cursors()[seen]
}

#[test]
fn stop_resets_flags_and_cursor() {
    let (session, _sink) = session_with(100, 1);
    session.start();
    std::thread::sleep(Duration::from_millis(20));
    session.toggle_pause();
    assert_eq!(session.stop(), CommandOutcome::Applied);

    let status = session.status();
    assert_eq!(status.cursor, 0);
    assert!(!status.paused);
    assert_eq!(status.state, PlaybackState::Stopped);
    assert_eq!(status.pause_label, "Pause");
    assert!(status.step_forward_enabled);
}

#[test]
fn stop_immediately_after_start_leaves_no_stale_ticks() {
    for _ in 0..50 {
        let (session, sink) = session_with(1_000, 1);
        session.start();
        session.stop();

        let frames_after_stop = sink.len();
        assert_eq!(session.status().cursor, 0);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(session.status().cursor, 0);
        assert_eq!(sink.len(), frames_after_stop);
        assert_eq!(sink.cursors().last().copied(), Some(0));
    }
}

#[test]
fn pause_freezes_cursor_and_enables_forward() {
    let (session, _sink) = session_with(1_000, 2);
    session.start();
    assert!(!session.status().step_forward_enabled);
    assert_eq!(
        session.step_forward(),
        CommandOutcome::NoOp(NoOpReason::ForwardDisabled)
    );

    session.toggle_pause();
    let paused_at = session.status().cursor;
    assert_eq!(session.status().pause_label, "Play");
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(session.status().cursor, paused_at);

    assert_eq!(session.step_forward(), CommandOutcome::Applied);
    assert_eq!(session.status().cursor, paused_at + 1);
    session.stop();
}

#[test]
fn step_back_pauses_a_running_replay() {
    let (session, _sink) = session_with(1_000, 2);
    session.start();
    std::thread::sleep(Duration::from_millis(20));
    session.step_back();
    let status = session.status();
    assert_eq!(status.state, PlaybackState::Paused);
    let at = status.cursor;
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(session.status().cursor, at);
    session.stop();
}

#[test]
fn annotations_survive_stop_and_start() {
    let (session, _sink) = session_with(10, 1);
    session.set_mode(InteractionMode::Trend);
    session.click(Some(ChartPoint::new(0.0, 0.0)));
    let outcome = session.click(Some(ChartPoint::new(1.0, 1.0)));
    let ClickOutcome::TrendCreated(trend) = outcome else {
        panic!("expected a trend line, got {outcome:?}");
    };
    assert_eq!(trend.end, ChartPoint::new(3.0, 3.0));
    assert_eq!(session.status().mode, InteractionMode::None);

    session.set_mode(InteractionMode::Sell);
    session.click(Some(ChartPoint::new(2.0, 151.0)));
    session.click(Some(ChartPoint::new(3.0, 152.0)));

    session.start();
    session.stop();
    let status = session.status();
    assert_eq!(status.trend_count, 1);
    assert_eq!(status.marker_count, 2);
    assert_eq!(status.mode, InteractionMode::Sell);
}

#[test]
fn select_then_delete_removes_the_line() {
    let (session, _sink) = session_with(10, 1);
    session.set_mode(InteractionMode::Trend);
    session.click(Some(ChartPoint::new(0.0, 0.0)));
    session.click(Some(ChartPoint::new(10.0, 0.0)));

    assert_eq!(
        session.click(Some(ChartPoint::new(0.0, 0.6))),
        ClickOutcome::NothingHit
    );
    assert!(matches!(
        session.click(Some(ChartPoint::new(0.0, 0.4))),
        ClickOutcome::Selected(_)
    ));
    let frame = session.frame().expect("frame");
    assert!(frame.trends.is_empty());

    assert_eq!(session.delete_selected(), CommandOutcome::Applied);
    let status = session.status();
    assert_eq!(status.trend_count, 0);
    assert_eq!(status.selected, None);
}

#[test]
fn clear_indicators_empties_everything() {
    let (session, _sink) = session_with(10, 1);
    session.set_mode(InteractionMode::Trend);
    session.click(Some(ChartPoint::new(0.0, 0.0)));
    session.click(Some(ChartPoint::new(1.0, 0.0)));
    session.set_mode(InteractionMode::None);
    session.click(Some(ChartPoint::new(2.0, 0.1)));
    session.set_mode(InteractionMode::Buy);
    session.click(Some(ChartPoint::new(1.0, 150.0)));
    session.set_mode(InteractionMode::Trend);
    session.click(Some(ChartPoint::new(5.0, 5.0)));

    assert_eq!(session.clear_indicators(), CommandOutcome::Applied);
    let status = session.status();
    assert_eq!(status.trend_count, 0);
    assert_eq!(status.marker_count, 0);
    assert_eq!(status.pending_trend_points, 0);
    assert_eq!(status.selected, None);
}

#[test]
fn empty_dataset_replay_finishes_immediately() {
    let (session, sink) = session_with(0, 1);
    assert_eq!(session.start(), CommandOutcome::Applied);
    assert!(session.wait_idle_timeout(Duration::from_secs(5)));
    assert_eq!(session.status().cursor, 0);
    assert_eq!(session.status().state, PlaybackState::Stopped);
    assert_eq!(session.step_forward(), CommandOutcome::NoOp(NoOpReason::AtEnd));
    assert!(sink.cursors().iter().all(|c| *c == 0));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        .. ProptestConfig::default()
    })]

    #[test]
    fn commands_keep_cursor_within_dataset(
        len in 0usize..20,
        ops in prop::collection::vec(0u8..4, 0..60),
    ) {
        let (session, sink) = session_with(len, 60_000);
        for op in ops {
            match op {
                0 => { session.start(); }
                1 => { session.toggle_pause(); }
                2 => { session.step_forward(); }
                _ => { session.step_back(); }
            }
            let status = session.status();
            prop_assert_eq!(status.total, len);
            prop_assert!(status.cursor <= status.total);
        }
        session.stop();
        prop_assert_eq!(session.status().cursor, 0);
        prop_assert!(sink.cursors().iter().all(|c| *c <= len));
    }
}
