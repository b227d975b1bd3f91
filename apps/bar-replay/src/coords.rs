use bar_replay_domain::services::chart::PlotBounds;
use bar_replay_domain::value_objects::point::ChartPoint;
use ratatui::layout::{Position, Rect};

/// Maps a terminal cell inside `plot` to chart data coordinates (x = bar index,
/// y = price), using the cell centre. Cells outside the plot map to `None`.
pub fn cell_to_chart(plot: Rect, bounds: PlotBounds, column: u16, row: u16) -> Option<ChartPoint> {
    if plot.width == 0 || plot.height == 0 || !plot.contains(Position::new(column, row)) {
        return None;
    }
    let fx = (f64::from(column - plot.x) + 0.5) / f64::from(plot.width);
    let fy = (f64::from(row - plot.y) + 0.5) / f64::from(plot.height);
    let x = bounds.x[0] + fx * (bounds.x[1] - bounds.x[0]);
    let y = bounds.y[1] - fy * (bounds.y[1] - bounds.y[0]);
    Some(ChartPoint::new(x, y))
}

/// Inverse of [`cell_to_chart`]; points outside the bounds map to `None`.
pub fn chart_to_cell(plot: Rect, bounds: PlotBounds, point: ChartPoint) -> Option<(u16, u16)> {
    if plot.width == 0 || plot.height == 0 || !bounds.contains(point) {
        return None;
    }
    let span_x = bounds.x[1] - bounds.x[0];
    let span_y = bounds.y[1] - bounds.y[0];
    if span_x <= 0.0 || span_y <= 0.0 {
        return None;
    }
    let fx = (point.x - bounds.x[0]) / span_x;
    let fy = (bounds.y[1] - point.y) / span_y;
    let col = (fx * f64::from(plot.width)).floor().min(f64::from(plot.width - 1));
    let row = (fy * f64::from(plot.height)).floor().min(f64::from(plot.height - 1));
    Some((plot.x + col as u16, plot.y + row as u16))
}
