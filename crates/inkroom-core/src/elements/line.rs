//! Straight segments, arrows and freehand strokes.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use super::{default_stroke, default_stroke_width};

/// A polyline stored as flattened `x, y, x, y, ...` coordinates.
///
/// Two points make a straight segment (or an arrow when `is_arrow` is set);
/// anything longer is a freehand stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawLine {
    /// Flattened coordinate pairs.
    pub points: Vec<f64>,
    /// Stroke color (CSS color string).
    #[serde(default = "super::default_stroke")]
    pub stroke: String,
    /// Stroke width in canvas units.
    #[serde(default = "super::default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default)]
    pub is_arrow: bool,
    #[serde(default)]
    pub is_dashed: bool,
}

impl DrawLine {
    /// Create a straight segment between two points.
    pub fn segment(from: Point, to: Point) -> Self {
        Self {
            points: vec![from.x, from.y, to.x, to.y],
            stroke: default_stroke(),
            stroke_width: default_stroke_width(),
            is_arrow: false,
            is_dashed: false,
        }
    }

    /// Create an arrow from `from` pointing at `to`.
    pub fn arrow(from: Point, to: Point) -> Self {
        Self {
            is_arrow: true,
            ..Self::segment(from, to)
        }
    }

    /// Create a freehand stroke from a list of points.
    pub fn freehand(points: impl IntoIterator<Item = Point>) -> Self {
        Self {
            points: points.into_iter().flat_map(|p| [p.x, p.y]).collect(),
            stroke: default_stroke(),
            stroke_width: default_stroke_width(),
            is_arrow: false,
            is_dashed: false,
        }
    }

    /// Set the stroke color and width.
    pub fn with_stroke(mut self, stroke: impl Into<String>, width: f64) -> Self {
        self.stroke = stroke.into();
        self.stroke_width = width;
        self
    }

    pub fn dashed(mut self) -> Self {
        self.is_dashed = true;
        self
    }

    /// Append a point while a stroke is being drawn.
    pub fn push_point(&mut self, point: Point) {
        self.points.push(point.x);
        self.points.push(point.y);
    }

    /// Iterate over the coordinate pairs as points. A trailing odd value is ignored.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.chunks_exact(2).map(|c| Point::new(c[0], c[1]))
    }

    /// Number of points in the line.
    pub fn point_count(&self) -> usize {
        self.points.len() / 2
    }

    /// True for a two-point segment or arrow.
    pub fn is_straight(&self) -> bool {
        self.points.len() == 4
    }

    /// Coordinates come in complete pairs and there is at least one point.
    pub fn is_well_formed(&self) -> bool {
        !self.points.is_empty() && self.points.len() % 2 == 0
    }

    /// Axis-aligned bounds of all points.
    pub fn bounds(&self) -> Option<Rect> {
        let mut points = self.points();
        let first = points.next()?;
        Some(points.fold(Rect::from_points(first, first), |acc, p| {
            acc.union_pt(p)
        }))
    }
}
