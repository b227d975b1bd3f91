use bar_replay_application::session::{
    CommandOutcome, FrameSink, ReplaySession, SessionOptions, SessionStatus,
};
use bar_replay_domain::services::chart::ChartFrame;
use bar_replay_domain::value_objects::bar::Bar;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct HeadlessArgs {
    pub bars: Vec<Bar>,
    pub options: SessionOptions,
}

/// Seconds between bars; must be positive and finite.
pub fn speed_to_interval(speed: f64) -> Result<Duration, String> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(format!("--speed must be a positive number of seconds (got {speed})"));
    }
    Duration::try_from_secs_f64(speed).map_err(|err| format!("invalid --speed {speed}: {err}"))
}

pub fn run_headless(args: HeadlessArgs) -> Result<usize, String> {
    replay_to(args, std::io::stdout())
}

/// Replays every bar through a session, writing each newly revealed bar to `out`.
/// Returns the number of bars written.
pub fn replay_to<W>(args: HeadlessArgs, out: W) -> Result<usize, String>
where
    W: Write + Send + 'static,
{
    if let Some(first) = args.bars.first() {
        tracing::info!(
            bars = args.bars.len(),
            first = first.timestamp,
            interval_ms = args.options.tick_interval.as_millis() as u64,
            "console replay starting"
        );
    }

    let sink = Arc::new(ConsoleSink::new(out));
    let session = ReplaySession::new(args.bars, args.options, sink.clone());
    if let CommandOutcome::NoOp(reason) = session.start() {
        return Err(format!("replay did not start: {reason}"));
    }
    session.wait_idle();

    let (written, error) = sink.finish();
    match error {
        Some(err) => Err(err),
        None => {
            tracing::info!(bars = written, "console replay finished");
            Ok(written)
        }
    }
}

/// Prints elapsed time and the JSON form of every bar the cursor moves past.
struct ConsoleSink<W> {
    inner: Mutex<ConsoleState<W>>,
}

struct ConsoleState<W> {
    out: W,
    started: Instant,
    printed: usize,
    written: usize,
    error: Option<String>,
}

impl<W: Write> ConsoleSink<W> {
    fn new(out: W) -> Self {
        Self {
            inner: Mutex::new(ConsoleState {
                out,
                started: Instant::now(),
                printed: 0,
                written: 0,
                error: None,
            }),
        }
    }

    fn finish(&self) -> (usize, Option<String>) {
        let mut state = self.inner.lock();
        if let Err(err) = state.out.flush() {
            state.error.get_or_insert(format!("failed to flush output: {err}"));
        }
        (state.written, state.error.take())
    }
}

impl<W: Write + Send> FrameSink for ConsoleSink<W> {
    fn present(&self, frame: &ChartFrame, _status: &SessionStatus) -> Result<(), String> {
        let mut state = self.inner.lock();
        if frame.cursor < state.printed {
            state.printed = frame.cursor;
            return Ok(());
        }
        let elapsed = state.started.elapsed().as_secs_f64();
        let start = state.printed;
        for bar in &frame.candles[start..frame.cursor] {
            let json = serde_json::to_string(bar)
                .map_err(|err| format!("failed to encode bar: {err}"))?;
            let result = writeln!(state.out, "Elapsed Time: {elapsed:.2} seconds")
                .and_then(|_| writeln!(state.out, "{json}"));
            if let Err(err) = result {
                let msg = format!("failed to write bar: {err}");
                state.error.get_or_insert(msg.clone());
                return Err(msg);
            }
            state.written += 1;
        }
        state.printed = frame.cursor;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{replay_to, speed_to_interval, HeadlessArgs};
    use bar_replay_application::session::SessionOptions;
    use bar_replay_domain::value_objects::bar::Bar;
    use parking_lot::Mutex;
    use std::io::{self, Write};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn args(n: usize) -> HeadlessArgs {
        let bars = (0..n)
            .map(|i| Bar {
                timestamp: 1_641_168_000 + 86_400 * i as i64,
                open: 10.0 + i as f64,
                high: 12.0 + i as f64,
                low: 9.0 + i as f64,
                close: 11.0 + i as f64,
                volume: 100.0,
            })
            .collect();
        HeadlessArgs {
            bars,
            options: SessionOptions {
                tick_interval: Duration::from_millis(1),
                ..SessionOptions::default()
            },
        }
    }

    #[test]
    fn prints_each_bar_once_in_order() {
        let buf = SharedBuf::default();
        let written = replay_to(args(3), buf.clone()).expect("replay");
        assert_eq!(written, 3);

        let text = String::from_utf8(buf.0.lock().clone()).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        for (i, pair) in lines.chunks(2).enumerate() {
            assert!(pair[0].starts_with("Elapsed Time: "));
            assert!(pair[0].ends_with(" seconds"));
            let bar: Bar = serde_json::from_str(pair[1]).expect("bar json");
            assert_eq!(bar.timestamp, 1_641_168_000 + 86_400 * i as i64);
        }
    }

    #[test]
    fn empty_dataset_prints_nothing() {
        let buf = SharedBuf::default();
        assert_eq!(replay_to(args(0), buf.clone()).expect("replay"), 0);
        assert!(buf.0.lock().is_empty());
    }

    #[test]
    fn write_failure_is_reported() {
        let err = replay_to(args(2), BrokenPipe).expect_err("broken pipe");
        assert!(err.contains("failed to write bar"));
    }

    #[test]
    fn speed_must_be_positive() {
        assert_eq!(speed_to_interval(0.25), Ok(Duration::from_millis(250)));
        assert!(speed_to_interval(0.0).is_err());
        assert!(speed_to_interval(-1.0).is_err());
        assert!(speed_to_interval(f64::NAN).is_err());
    }
}
