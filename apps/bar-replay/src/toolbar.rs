use bar_replay_application::session::SessionStatus;
use ratatui::layout::{Position, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    TogglePause,
    Stop,
    Forward,
    Rewind,
    Buy,
    Sell,
    ClearIndicators,
    TrendLine,
    DeleteAnnotation,
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::Start,
        Command::TogglePause,
        Command::Stop,
        Command::Forward,
        Command::Rewind,
        Command::Buy,
        Command::Sell,
        Command::ClearIndicators,
        Command::TrendLine,
        Command::DeleteAnnotation,
    ];

    pub fn label(self, status: &SessionStatus) -> &'static str {
        match self {
            Command::Start => "Start",
            Command::TogglePause => status.pause_label,
            Command::Stop => "Stop",
            Command::Forward => "Forward",
            Command::Rewind => "Rewind",
            Command::Buy => "Buy",
            Command::Sell => "Sell",
            Command::ClearIndicators => "Clear Indicators",
            Command::TrendLine => "Trend Line",
            Command::DeleteAnnotation => "Delete Annotation",
        }
    }

    /// Info line shown once the command has been applied; `status` is read afterwards.
    pub fn applied_message(self, status: &SessionStatus) -> &'static str {
        match self {
            Command::Start => "replay started",
            Command::TogglePause if status.paused => "paused",
            Command::TogglePause => "resumed",
            Command::Stop => "replay stopped",
            Command::Forward => "stepped forward",
            Command::Rewind => "stepped back",
            Command::Buy => "buy mode: click the chart",
            Command::Sell => "sell mode: click the chart",
            Command::ClearIndicators => "indicators cleared",
            Command::TrendLine => "trend mode: click two points",
            Command::DeleteAnnotation => "annotation deleted",
        }
    }

    pub fn hotkey(self) -> &'static str {
        match self {
            Command::Start => "s",
            Command::TogglePause => "p",
            Command::Stop => "x",
            Command::Forward => "→",
            Command::Rewind => "←",
            Command::Buy => "b",
            Command::Sell => "v",
            Command::ClearIndicators => "c",
            Command::TrendLine => "t",
            Command::DeleteAnnotation => "d",
        }
    }

    pub fn enabled(self, status: &SessionStatus) -> bool {
        match self {
            Command::Forward => status.step_forward_enabled,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub command: Command,
    pub area: Rect,
    pub enabled: bool,
}

/// Lays buttons out left to right on the first row of `area`, one cell apart.
/// Buttons that would not fit completely are omitted.
pub fn layout(area: Rect, status: &SessionStatus) -> Vec<Button> {
    let mut buttons = Vec::with_capacity(Command::ALL.len());
    if area.height == 0 {
        return buttons;
    }
    let right = area.x.saturating_add(area.width);
    let mut x = area.x;
    for command in Command::ALL {
        let width = button_text(command, status).chars().count() as u16;
        if x.saturating_add(width) > right {
            break;
        }
        buttons.push(Button {
            command,
            area: Rect::new(x, area.y, width, 1),
            enabled: command.enabled(status),
        });
        x = x.saturating_add(width + 1);
    }
    buttons
}

pub fn button_text(command: Command, status: &SessionStatus) -> String {
    format!("[{} {}]", command.hotkey(), command.label(status))
}

/// Returns the enabled button under the given terminal cell.
pub fn hit(buttons: &[Button], column: u16, row: u16) -> Option<Command> {
    let pos = Position::new(column, row);
    buttons
        .iter()
        .find(|b| b.area.contains(pos))
        .filter(|b| b.enabled)
        .map(|b| b.command)
}
