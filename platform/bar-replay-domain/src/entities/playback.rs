#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Running,
    Paused,
    /// Stopped with every bar revealed.
    Finished,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced { cursor: usize },
    Paused,
    Finished,
    Halted,
}

/// Run/pause flags plus the cursor over a dataset of `len` bars.
///
/// The cursor is the exclusive upper bound of visible bars and stays within `[0, len]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    running: bool,
    paused: bool,
    cursor: usize,
    len: usize,
}

impl Playback {
    pub fn new(len: usize) -> Self {
        Self {
            running: false,
            paused: false,
            cursor: 0,
            len,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn state(&self) -> PlaybackState {
        match (self.running, self.paused) {
            (true, true) => PlaybackState::Paused,
            (true, false) => PlaybackState::Running,
            (false, _) if self.len > 0 && self.cursor == self.len => PlaybackState::Finished,
            (false, _) => PlaybackState::Stopped,
        }
    }

    /// Returns `false` without touching anything when already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.paused = false;
        self.cursor = 0;
        true
    }

    /// Flips the pause flag; `None` when not running.
    pub fn toggle_pause(&mut self) -> Option<bool> {
        if !self.running {
            return None;
        }
        self.paused = !self.paused;
        Some(self.paused)
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.paused = false;
        self.cursor = 0;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Halted;
        }
        if self.paused {
            return TickOutcome::Paused;
        }
        if self.cursor < self.len {
            self.cursor += 1;
            return TickOutcome::Advanced {
                cursor: self.cursor,
            };
        }
        self.running = false;
        TickOutcome::Finished
    }

    /// Manual stepping stops one bar short of the loop's own bound.
    pub fn step_forward(&mut self) -> bool {
        if self.cursor + 1 < self.len {
            self.cursor += 1;
            return true;
        }
        false
    }

    /// Always leaves playback paused, even when the cursor is already at 0.
    pub fn step_back(&mut self) -> bool {
        self.paused = true;
        if self.cursor > 0 {
            self.cursor -= 1;
            return true;
        }
        false
    }

    pub fn step_forward_enabled(&self) -> bool {
        !(self.running && !self.paused)
    }

    pub fn pause_label(&self) -> &'static str {
        if self.paused {
            "Play"
        } else {
            "Pause"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Playback, PlaybackState, TickOutcome};

    #[test]
    fn start_resets_cursor_and_rejects_second_start() {
        let mut playback = Playback::new(5);
        assert!(playback.step_forward());
        assert!(playback.step_forward());
        assert_eq!(playback.cursor(), 2);

        assert!(playback.start());
        assert_eq!(playback.cursor(), 0);
        assert_eq!(playback.state(), PlaybackState::Running);
        assert!(!playback.start());
    }

    #[test]
    fn tick_runs_to_len_then_finishes() {
        let mut playback = Playback::new(2);
        playback.start();
        assert_eq!(playback.tick(), TickOutcome::Advanced { cursor: 1 });
        assert_eq!(playback.tick(), TickOutcome::Advanced { cursor: 2 });
        assert_eq!(playback.tick(), TickOutcome::Finished);
        assert!(!playback.running());
        assert_eq!(playback.state(), PlaybackState::Finished);
        assert_eq!(playback.tick(), TickOutcome::Halted);
    }

    #[test]
    fn paused_tick_does_not_move() {
        let mut playback = Playback::new(3);
        playback.start();
        assert_eq!(playback.toggle_pause(), Some(true));
        assert_eq!(playback.tick(), TickOutcome::Paused);
        assert_eq!(playback.cursor(), 0);
        assert_eq!(playback.state(), PlaybackState::Paused);
        assert_eq!(playback.pause_label(), "Play");
    }

    #[test]
    fn toggle_pause_requires_running() {
        let mut playback = Playback::new(3);
        assert_eq!(playback.toggle_pause(), None);
        assert!(!playback.paused());
    }

    #[test]
    fn step_forward_stops_before_last_bar() {
        let mut playback = Playback::new(3);
        assert!(playback.step_forward());
        assert!(playback.step_forward());
        assert!(!playback.step_forward());
        assert_eq!(playback.cursor(), 2);

        let mut empty = Playback::new(0);
        assert!(!empty.step_forward());
        assert_eq!(empty.cursor(), 0);
    }

    #[test]
    fn step_back_always_pauses() {
        let mut playback = Playback::new(3);
        assert!(!playback.step_back());
        assert!(playback.paused());
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn stop_clears_flags() {
        let mut playback = Playback::new(4);
        playback.start();
        playback.tick();
        playback.toggle_pause();
        playback.stop();
        assert_eq!(playback.cursor(), 0);
        assert!(!playback.running());
        assert!(!playback.paused());
        assert!(playback.step_forward_enabled());
    }

    #[test]
    fn step_forward_disabled_only_while_playing() {
        let mut playback = Playback::new(4);
        assert!(playback.step_forward_enabled());
        playback.start();
        assert!(!playback.step_forward_enabled());
        playback.toggle_pause();
        assert!(playback.step_forward_enabled());
    }
}
