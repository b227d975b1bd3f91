use crate::services::geometry::{extrapolate, is_point_near_line};
use crate::value_objects::annotation::{
    AnnotationId, MarkerAnnotation, MarkerSide, TrendAnnotation,
};
use crate::value_objects::interaction_mode::InteractionMode;
use crate::value_objects::point::ChartPoint;

pub const DEFAULT_HIT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_EXTENSION_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationSettings {
    pub hit_threshold: f64,
    pub extension_factor: f64,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            hit_threshold: DEFAULT_HIT_THRESHOLD,
            extension_factor: DEFAULT_EXTENSION_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Undefined coordinates; nothing changed.
    Ignored,
    TrendPointAdded { pending: usize },
    TrendCreated(TrendAnnotation),
    MarkerPlaced(MarkerAnnotation),
    Selected(AnnotationId),
    NothingHit,
}

/// Interaction mode, pending trend clicks, drawn annotations and the current selection.
#[derive(Debug, Clone)]
pub struct AnnotationBoard {
    settings: AnnotationSettings,
    mode: InteractionMode,
    pending: Vec<ChartPoint>,
    trends: Vec<TrendAnnotation>,
    markers: Vec<MarkerAnnotation>,
    selected: Option<AnnotationId>,
    next_id: u64,
}

impl Default for AnnotationBoard {
    fn default() -> Self {
        Self::new(AnnotationSettings::default())
    }
}

impl AnnotationBoard {
    pub fn new(settings: AnnotationSettings) -> Self {
        Self {
            settings,
            mode: InteractionMode::None,
            pending: Vec::new(),
            trends: Vec::new(),
            markers: Vec::new(),
            selected: None,
            next_id: 1,
        }
    }

    pub fn settings(&self) -> AnnotationSettings {
        self.settings
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
    }

    pub fn pending_points(&self) -> &[ChartPoint] {
        &self.pending
    }

    pub fn trends(&self) -> &[TrendAnnotation] {
        &self.trends
    }

    pub fn markers(&self) -> &[MarkerAnnotation] {
        &self.markers
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_trend(&self) -> Option<&TrendAnnotation> {
        let id = self.selected?;
        self.trends.iter().find(|t| t.id == id)
    }

    /// Trend lines minus the one currently selected for deletion.
    pub fn visible_trends(&self) -> impl Iterator<Item = &TrendAnnotation> {
        let selected = self.selected;
        self.trends.iter().filter(move |t| Some(t.id) != selected)
    }

    pub fn click(&mut self, point: ChartPoint) -> ClickOutcome {
        if !point.is_finite() {
            return ClickOutcome::Ignored;
        }

        match self.mode {
            InteractionMode::Trend => self.add_trend_point(point),
            InteractionMode::Buy => self.place_marker(MarkerSide::Buy, point),
            InteractionMode::Sell => self.place_marker(MarkerSide::Sell, point),
            InteractionMode::None => self.select_at(point),
        }
    }

    /// Empties trends, markers and pending clicks, and drops the selection.
    pub fn clear(&mut self) {
        self.trends.clear();
        self.markers.clear();
        self.pending.clear();
        self.selected = None;
    }

    pub fn delete_selected(&mut self) -> Option<TrendAnnotation> {
        let id = self.selected.take()?;
        let idx = self.trends.iter().position(|t| t.id == id)?;
        Some(self.trends.remove(idx))
    }

    fn add_trend_point(&mut self, point: ChartPoint) -> ClickOutcome {
        self.pending.push(point);
        if self.pending.len() < 2 {
            return ClickOutcome::TrendPointAdded {
                pending: self.pending.len(),
            };
        }

        let start = self.pending[0];
        let through = self.pending[1];
        let trend = TrendAnnotation {
            id: self.allocate_id(),
            start,
            end: extrapolate(start, through, self.settings.extension_factor),
        };
        self.trends.push(trend.clone());
        self.pending.clear();
        self.mode = InteractionMode::None;
        ClickOutcome::TrendCreated(trend)
    }

    fn place_marker(&mut self, side: MarkerSide, at: ChartPoint) -> ClickOutcome {
        let marker = MarkerAnnotation {
            id: self.allocate_id(),
            side,
            at,
        };
        self.markers.push(marker.clone());
        ClickOutcome::MarkerPlaced(marker)
    }

    fn select_at(&mut self, point: ChartPoint) -> ClickOutcome {
        let threshold = self.settings.hit_threshold;
        let hit = self
            .trends
            .iter()
            .find(|t| is_point_near_line(point, t.start, t.end, threshold))
            .map(|t| t.id);

        self.selected = hit;
        match hit {
            Some(id) => ClickOutcome::Selected(id),
            None => ClickOutcome::NothingHit,
        }
    }

    fn allocate_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }
}
