use crate::value_objects::point::ChartPoint;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user-drawn line. `end` is the extrapolated endpoint, not the second click.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAnnotation {
    pub id: AnnotationId,
    pub start: ChartPoint,
    pub end: ChartPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Green,
    Red,
}

impl MarkerSide {
    pub fn label(self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
        }
    }

    pub fn color(self) -> MarkerColor {
        match self {
            Self::Buy => MarkerColor::Green,
            Self::Sell => MarkerColor::Red,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerAnnotation {
    pub id: AnnotationId,
    pub side: MarkerSide,
    pub at: ChartPoint,
}

impl MarkerAnnotation {
    pub fn label(&self) -> &'static str {
        self.side.label()
    }

    pub fn color(&self) -> MarkerColor {
        self.side.color()
    }
}
