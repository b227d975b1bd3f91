use crate::app::App;
use crate::toolbar;
use bar_replay_domain::services::chart::{ChartFrame, PlotBounds};
use bar_replay_domain::value_objects::annotation::MarkerColor;
use bar_replay_domain::value_objects::interaction_mode::InteractionMode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

const Y_LABEL_WIDTH: u16 = 10;
const TREND_COLOR: Color = Color::Blue;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(1),
                Constraint::Length(7),
            ]
            .as_ref(),
        )
        .split(size);

    draw_toolbar(frame, outer[0], app);
    draw_chart(frame, outer[1], app);
    draw_status(frame, outer[2], app);
    draw_logs(frame, outer[3], app);
}

fn draw_toolbar(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .title(format!("Bar Replay: {}", app.symbol))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    app.toolbar = toolbar::layout(inner, &app.status);
    for button in &app.toolbar {
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if !button.enabled {
            style = Style::default().fg(Color::DarkGray);
        } else if is_active_mode(button.command, app.status.mode) {
            style = style.fg(Color::Black).bg(Color::Yellow);
        }
        frame.render_widget(
            Paragraph::new(Span::styled(
                toolbar::button_text(button.command, &app.status),
                style,
            )),
            button.area,
        );
    }
}

fn is_active_mode(command: toolbar::Command, mode: InteractionMode) -> bool {
    matches!(
        (command, mode),
        (toolbar::Command::Buy, InteractionMode::Buy)
            | (toolbar::Command::Sell, InteractionMode::Sell)
            | (toolbar::Command::TrendLine, InteractionMode::Trend)
    )
}

fn draw_chart(frame: &mut Frame, area: Rect, app: &mut App) {
    let title = format!(
        "Chart  bar {}/{}{}",
        app.frame.cursor,
        app.frame.total,
        current_date(&app.frame)
            .map(|d| format!("  {d}"))
            .unwrap_or_default()
    );
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(bounds) = app.frame.bounds else {
        app.plot_area = None;
        let msg = match app.dataset_error.as_deref() {
            Some(err) => format!("No data loaded: {err}"),
            None => "No data loaded.".to_string(),
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(msg, Style::default().fg(Color::Red))))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(Y_LABEL_WIDTH), Constraint::Min(1)].as_ref())
        .split(inner);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)].as_ref())
        .split(columns[1]);
    let plot = rows[0];
    app.plot_area = Some(plot);

    draw_y_labels(frame, Rect::new(columns[0].x, plot.y, columns[0].width, plot.height), bounds);
    draw_x_labels(frame, rows[1], &app.frame);

    let chart = &app.frame;
    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds(bounds.x)
        .y_bounds(bounds.y)
        .paint(|ctx| {
            for (i, bar) in chart.candles.iter().enumerate() {
                let x = i as f64;
                let color = if bar.is_bullish() { Color::Green } else { Color::Red };
                ctx.draw(&CanvasLine::new(x, bar.low, x, bar.high, color));
                let (lo, hi) = (bar.open.min(bar.close), bar.open.max(bar.close));
                for dx in [-0.25, 0.25] {
                    ctx.draw(&CanvasLine::new(x + dx, lo, x + dx, hi, color));
                }
            }
            ctx.layer();
            for trend in &chart.trends {
                ctx.draw(&CanvasLine::new(
                    trend.from.x,
                    trend.from.y,
                    trend.to.x,
                    trend.to.y,
                    TREND_COLOR,
                ));
            }
            for marker in &chart.markers {
                let color = marker_color(marker.color);
                ctx.draw(&CanvasLine::new(
                    marker.label_at.x,
                    marker.label_at.y,
                    marker.tip.x,
                    marker.tip.y,
                    color,
                ));
                ctx.print(
                    marker.label_at.x,
                    marker.label_at.y,
                    Span::styled(marker.label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                );
            }
        });
    frame.render_widget(canvas, plot);
}

fn draw_y_labels(frame: &mut Frame, area: Rect, bounds: PlotBounds) {
    if area.height == 0 {
        return;
    }
    let [min, max] = bounds.y;
    let mid = (min + max) / 2.0;
    let mut lines = vec![Line::from(""); area.height as usize];
    lines[0] = Line::from(format!("{max:.2}"));
    lines[(area.height / 2) as usize] = Line::from(format!("{mid:.2}"));
    lines[(area.height - 1) as usize] = Line::from(format!("{min:.2}"));
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Right), area);
}

fn draw_x_labels(frame: &mut Frame, area: Rect, chart: &ChartFrame) {
    let first = chart.candles.first().and_then(bar_date).unwrap_or_default();
    let last = chart.candles.last().and_then(bar_date).unwrap_or_default();
    let labels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);
    frame.render_widget(Paragraph::new(first), labels[0]);
    frame.render_widget(Paragraph::new(last).alignment(Alignment::Right), labels[1]);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &App) {
    let status = &app.status;
    let state_style = match status.state {
        bar_replay_domain::entities::playback::PlaybackState::Running => {
            Style::default().fg(Color::Green)
        }
        bar_replay_domain::entities::playback::PlaybackState::Paused => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        _ => Style::default(),
    };
    let selected = status
        .selected
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut spans = vec![
        Span::styled(status.state.as_str().to_uppercase(), state_style),
        Span::raw(format!(
            " | bar {}/{} | mode {} | selected {} | trends {} markers {}",
            status.cursor,
            status.total,
            status.mode,
            selected,
            status.trend_count,
            status.marker_count
        )),
    ];
    if status.mode == InteractionMode::Trend {
        spans.push(Span::raw(format!(" | points {}/2", status.pending_trend_points)));
    }
    if let Some(info) = app.info_message.as_deref() {
        spans.push(Span::styled(
            format!(" | {info}"),
            Style::default().fg(Color::Cyan),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_logs(frame: &mut Frame, area: Rect, app: &App) {
    let max_lines = area.height.saturating_sub(2) as usize;
    let visible = app.logs.lock().tail(max_lines, app.log_scroll);
    let text: Vec<Line> = visible.into_iter().map(Line::from).collect();
    frame.render_widget(
        Paragraph::new(text)
            .block(Block::default().title("Logs").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn marker_color(color: MarkerColor) -> Color {
    match color {
        MarkerColor::Green => Color::Green,
        MarkerColor::Red => Color::Red,
    }
}

fn bar_date(bar: &bar_replay_domain::value_objects::bar::Bar) -> Option<String> {
    bar.datetime().map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn current_date(chart: &ChartFrame) -> Option<String> {
    chart.candles.last().and_then(bar_date)
}

#[cfg(test)]
mod tests {
    use super::draw;
    use crate::app::App;
    use crate::logging::LogStore;
    use crate::tasks::ChannelFrameSink;
    use crate::toolbar::Command;
    use bar_replay_application::session::{ReplaySession, SessionOptions};
    use bar_replay_domain::value_objects::bar::Bar;
    use parking_lot::Mutex;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;

    fn app(bars: Vec<Bar>, error: Option<String>) -> App {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = Arc::new(ChannelFrameSink::new(tx));
        let session = ReplaySession::new(bars, SessionOptions::default(), sink.clone());
        App::new(
            "AAPL".to_string(),
            session,
            sink,
            error,
            Arc::new(Mutex::new(LogStore::new(10))),
        )
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn draw_records_toolbar_and_plot_areas() {
        let bars = (0..3)
            .map(|i| Bar {
                timestamp: 1_641_168_000 + 86_400 * i,
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 1.0,
            })
            .collect();
        let mut app = app(bars, None);
        let mut terminal = Terminal::new(TestBackend::new(200, 40)).expect("terminal");
        terminal.draw(|frame| draw(frame, &mut app)).expect("draw");

        assert_eq!(app.toolbar.len(), Command::ALL.len());
        assert!(app.plot_area.is_some());
        let text = screen_text(&terminal);
        assert!(text.contains("[s Start]"));
        assert!(text.contains("Bar Replay: AAPL"));
    }

    #[test]
    fn empty_dataset_shows_load_error() {
        let mut app = app(Vec::new(), Some("failed to open OHLCV CSV x.csv".to_string()));
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).expect("terminal");
        terminal.draw(|frame| draw(frame, &mut app)).expect("draw");

        assert!(app.plot_area.is_none());
        assert!(screen_text(&terminal).contains("No data loaded"));
    }
}
