use crate::coords;
use crate::logging::SharedLogStore;
use crate::tasks::{ChannelFrameSink, TaskEvent};
use crate::toolbar::{self, Button, Command};
use bar_replay_application::session::{CommandOutcome, ReplaySession, SessionStatus};
use bar_replay_domain::entities::annotation_board::ClickOutcome;
use bar_replay_domain::services::chart::ChartFrame;
use bar_replay_domain::value_objects::interaction_mode::InteractionMode;
use crossterm::event::{
    Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::layout::Rect;
use std::sync::Arc;
use std::time::{Duration, Instant};

const INFO_TTL: Duration = Duration::from_secs(4);

pub struct App {
    pub symbol: String,
    pub session: ReplaySession,
    sink: Arc<ChannelFrameSink>,

    pub frame: ChartFrame,
    pub status: SessionStatus,
    pub dataset_error: Option<String>,

    pub logs: SharedLogStore,
    pub log_scroll: usize,

    /// Filled in by the last draw; used to hit-test mouse clicks.
    pub toolbar: Vec<Button>,
    pub plot_area: Option<Rect>,

    pub dirty: bool,
    pub info_message: Option<String>,
    info_expires_at: Option<Instant>,
}

impl App {
    pub fn new(
        symbol: String,
        session: ReplaySession,
        sink: Arc<ChannelFrameSink>,
        dataset_error: Option<String>,
        logs: SharedLogStore,
    ) -> Self {
        let status = session.status();
        let frame = session
            .frame()
            .unwrap_or_else(|_| ChartFrame::blank(status.total));
        Self {
            symbol,
            session,
            sink,
            frame,
            status,
            dataset_error,
            logs,
            log_scroll: 0,
            toolbar: Vec::new(),
            plot_area: None,
            dirty: true,
            info_message: None,
            info_expires_at: None,
        }
    }

    pub fn spawn_input_reader(&self, tx: tokio::sync::mpsc::UnboundedSender<TaskEvent>) {
        std::thread::spawn(move || {
            while let Ok(event) = crossterm::event::read() {
                if tx.send(TaskEvent::Input(event)).is_err() {
                    break;
                }
            }
        });
    }

    pub fn on_tick(&mut self) {
        if let Some(until) = self.info_expires_at {
            if Instant::now() >= until {
                self.info_message = None;
                self.info_expires_at = None;
                self.dirty = true;
            }
        }
    }

    /// Returns `Ok(true)` when the app should quit.
    pub fn on_event(&mut self, event: TaskEvent) -> Result<bool, String> {
        match event {
            TaskEvent::Input(ct) => self.on_input(ct),
            TaskEvent::Redraw => {
                if let Some(frame) = self.sink.take_latest() {
                    self.frame = frame;
                }
                self.status = self.session.status();
                self.dirty = true;
                Ok(false)
            }
        }
    }

    fn on_input(&mut self, event: CtEvent) -> Result<bool, String> {
        match event {
            CtEvent::Key(key) if key.kind != KeyEventKind::Release => self.on_key(key),
            CtEvent::Mouse(mouse) => {
                self.on_mouse(mouse);
                Ok(false)
            }
            CtEvent::Resize(_, _) => {
                self.dirty = true;
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Result<bool, String> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        let command = match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('s') => Command::Start,
            KeyCode::Char('p') | KeyCode::Char(' ') => Command::TogglePause,
            KeyCode::Char('x') => Command::Stop,
            KeyCode::Right => Command::Forward,
            KeyCode::Left => Command::Rewind,
            KeyCode::Char('b') => Command::Buy,
            KeyCode::Char('v') => Command::Sell,
            KeyCode::Char('c') => Command::ClearIndicators,
            KeyCode::Char('t') => Command::TrendLine,
            KeyCode::Char('d') | KeyCode::Delete => Command::DeleteAnnotation,
            KeyCode::Esc => {
                self.session.set_mode(InteractionMode::None);
                self.set_info("mode: none");
                self.refresh_status();
                return Ok(false);
            }
            KeyCode::PageUp => {
                self.log_scroll = self.log_scroll.saturating_add(5);
                self.dirty = true;
                return Ok(false);
            }
            KeyCode::PageDown => {
                self.log_scroll = self.log_scroll.saturating_sub(5);
                self.dirty = true;
                return Ok(false);
            }
            _ => return Ok(false),
        };
        self.run_command(command);
        Ok(false)
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        if let Some(command) = toolbar::hit(&self.toolbar, mouse.column, mouse.row) {
            metrics::counter!("bar_replay.ui.pointer_clicks_total", "target" => "toolbar")
                .increment(1);
            self.run_command(command);
            return;
        }

        let point = match (self.plot_area, self.frame.bounds) {
            (Some(plot), Some(bounds)) => coords::cell_to_chart(plot, bounds, mouse.column, mouse.row),
            _ => None,
        };
        if point.is_some() {
            metrics::counter!("bar_replay.ui.pointer_clicks_total", "target" => "chart")
                .increment(1);
        }
        match self.session.click(point) {
            ClickOutcome::Ignored => return,
            ClickOutcome::TrendPointAdded { pending } => {
                self.set_info(&format!("trend point {pending}/2"));
            }
            ClickOutcome::TrendCreated(trend) => {
                self.set_info(&format!("trend line {} drawn", trend.id));
            }
            ClickOutcome::MarkerPlaced(marker) => {
                self.set_info(&format!(
                    "{} marker {} at bar {:.1}, {:.2}",
                    marker.label(),
                    marker.id,
                    marker.at.x,
                    marker.at.y
                ));
            }
            ClickOutcome::Selected(id) => {
                self.set_info(&format!("selected {id} (d to delete)"));
            }
            ClickOutcome::NothingHit => self.set_info("no annotation clicked"),
        }
        self.refresh_status();
    }

    pub fn run_command(&mut self, command: Command) {
        let outcome = match command {
            Command::Start => self.session.start(),
            Command::TogglePause => self.session.toggle_pause(),
            Command::Stop => self.session.stop(),
            Command::Forward => self.session.step_forward(),
            Command::Rewind => self.session.step_back(),
            Command::Buy => self.session.set_mode(InteractionMode::Buy),
            Command::Sell => self.session.set_mode(InteractionMode::Sell),
            Command::TrendLine => self.session.set_mode(InteractionMode::Trend),
            Command::ClearIndicators => self.session.clear_indicators(),
            Command::DeleteAnnotation => self.session.delete_selected(),
        };
        self.refresh_status();
        match outcome {
            CommandOutcome::Applied => self.set_info(command.applied_message(&self.status)),
            CommandOutcome::NoOp(reason) => self.set_info(&reason.to_string()),
        }
    }

    fn refresh_status(&mut self) {
        self.status = self.session.status();
        self.dirty = true;
    }

    fn set_info(&mut self, msg: &str) {
        self.info_message = Some(msg.to_string());
        self.info_expires_at = Some(Instant::now() + INFO_TTL);
        self.dirty = true;
    }
}
