use super::Shared;
use bar_replay_domain::entities::playback::TickOutcome;
use std::sync::Arc;
use std::time::Instant;

/// Body of the background replay thread for one start/stop cycle.
///
/// Each tick runs under the session lock; the wait between ticks releases it.
pub(super) fn run(shared: Arc<Shared>, epoch: u64) {
    let mut state = shared.state.lock();
    loop {
        if state.epoch != epoch {
            break;
        }
        match state.playback.tick() {
            TickOutcome::Halted => break,
            TickOutcome::Paused => {}
            TickOutcome::Advanced { cursor } => {
                metrics::counter!("bar_replay.session.ticks_total").increment(1);
                tracing::trace!(cursor, "tick");
                shared.present_locked(&state);
            }
            TickOutcome::Finished => {
                tracing::info!(cursor = state.playback.cursor(), "replay reached the end of data");
                shared.present_locked(&state);
                break;
            }
        }

        let deadline = Instant::now() + shared.tick_interval;
        while state.epoch == epoch && state.playback.running() {
            if shared.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
    }
    drop(state);
    shared.wake.notify_all();
    tracing::debug!(epoch, "replay loop exited");
}
