//! Chart frame composition.
//!
//! A [`ChartFrame`] is everything a front end needs to draw one picture of the
//! replay: candles for the revealed bars, trend segments, and marker glyphs. It
//! is built from read-only inputs and never mutates session state, so the same
//! inputs always produce the same frame.

use crate::entities::annotation_board::AnnotationBoard;
use crate::value_objects::annotation::{AnnotationId, MarkerColor};
use crate::value_objects::bar::Bar;
use crate::value_objects::point::ChartPoint;

pub const DEFAULT_MARKER_LABEL_OFFSET: f64 = 5.0;
const Y_PADDING_RATIO: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStyle {
    /// Vertical distance between a marker's tip and its label, in price units.
    pub marker_label_offset: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            marker_label_offset: DEFAULT_MARKER_LABEL_OFFSET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl PlotBounds {
    pub fn contains(&self, point: ChartPoint) -> bool {
        point.x >= self.x[0] && point.x <= self.x[1] && point.y >= self.y[0] && point.y <= self.y[1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendSegment {
    pub id: AnnotationId,
    pub from: ChartPoint,
    pub to: ChartPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerGlyph {
    pub id: AnnotationId,
    pub label: &'static str,
    pub color: MarkerColor,
    pub tip: ChartPoint,
    pub label_at: ChartPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    /// Bars `[0, cursor)`; the bar at position `i` is drawn at `x = i`.
    pub candles: Vec<Bar>,
    pub trends: Vec<TrendSegment>,
    pub markers: Vec<MarkerGlyph>,
    /// `None` when there is nothing to plot against (empty dataset).
    pub bounds: Option<PlotBounds>,
    pub cursor: usize,
    pub total: usize,
}

impl ChartFrame {
    pub fn blank(total: usize) -> Self {
        Self {
            candles: Vec::new(),
            trends: Vec::new(),
            markers: Vec::new(),
            bounds: None,
            cursor: 0,
            total,
        }
    }
}

pub fn compose_frame(
    bars: &[Bar],
    cursor: usize,
    board: &AnnotationBoard,
    style: &ChartStyle,
) -> Result<ChartFrame, String> {
    if cursor > bars.len() {
        return Err(format!(
            "cursor {cursor} out of range for dataset of {} bars",
            bars.len()
        ));
    }

    let candles = bars[..cursor].to_vec();
    let trends: Vec<TrendSegment> = board
        .visible_trends()
        .map(|t| TrendSegment {
            id: t.id,
            from: t.start,
            to: t.end,
        })
        .collect();
    let markers: Vec<MarkerGlyph> = board
        .markers()
        .iter()
        .map(|m| MarkerGlyph {
            id: m.id,
            label: m.label(),
            color: m.color(),
            tip: m.at,
            label_at: ChartPoint::new(m.at.x, m.at.y + style.marker_label_offset),
        })
        .collect();

    let bounds = plot_bounds(bars, cursor, &markers)?;

    Ok(ChartFrame {
        candles,
        trends,
        markers,
        bounds,
        cursor,
        total: bars.len(),
    })
}

fn plot_bounds(
    bars: &[Bar],
    cursor: usize,
    markers: &[MarkerGlyph],
) -> Result<Option<PlotBounds>, String> {
    // With nothing revealed yet, keep axes around the first bar so clicks still map.
    let visible = match (cursor, bars.first()) {
        (0, Some(_)) => &bars[..1],
        (0, None) => return Ok(None),
        _ => &bars[..cursor],
    };

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for bar in visible {
        low = low.min(bar.low);
        high = high.max(bar.high);
    }
    for marker in markers {
        for y in [marker.tip.y, marker.label_at.y] {
            low = low.min(y);
            high = high.max(y);
        }
    }
    if !low.is_finite() || !high.is_finite() {
        return Err("non-finite price range in visible bars".to_string());
    }

    let span = high - low;
    let pad = if span > 0.0 {
        span * Y_PADDING_RATIO
    } else {
        (high.abs() * Y_PADDING_RATIO).max(1.0)
    };

    Ok(Some(PlotBounds {
        x: [-0.5, visible.len() as f64 - 0.5],
        y: [low - pad, high + pad],
    }))
}
