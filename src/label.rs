//! Per-tile label registry with overlap resolution.
//!
//! Labels are appended in placement order and never removed. A new label
//! always wins: every registered label it overlaps is hidden, including ones
//! that are already hidden, and hidden labels keep taking part in later
//! collision tests.

use log::debug;
use lyon::math::{Box2D, Point, Size, Vector, point};
use serde::Serialize;
use smallvec::SmallVec;
use smartstring::alias::String;

use crate::feature::{serialize_box, serialize_point, serialize_points};
use crate::style::{Pen, SymbolPlacement, TextAnchor, TextTransform};
use crate::text::{Font, TextBlock};

mod path_label;
mod point_label;

#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LabelId(pub usize);

/// Resolved text layout of the layer currently being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TextProperties {
    pub font: Font,
    /// Wrap width in ems.
    pub max_width: f32,
    /// Degrees.
    pub max_angle: f32,
    pub transform: TextTransform,
    pub anchor: TextAnchor,
    pub viewport_alignment: bool,
    pub symbol_placement: SymbolPlacement,
}

impl Default for TextProperties {
    fn default() -> Self {
        TextProperties {
            font: Font::new(16.0),
            max_width: 10.0,
            max_angle: 45.0,
            transform: TextTransform::default(),
            anchor: TextAnchor::default(),
            viewport_alignment: false,
            symbol_placement: SymbolPlacement::default(),
        }
    }
}

/// A sprite that exists in the atlas, with its size in tile pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub name: String,
    pub size: Size,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlacedIcon {
    pub name: String,
    #[serde(serialize_with = "serialize_box")]
    pub rect: Box2D,
}

#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct GlyphPlacement {
    pub glyph: char,
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    /// Degrees counter-clockwise.
    pub angle: f32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LabelGeometry {
    Point {
        #[serde(serialize_with = "serialize_box")]
        rect: Box2D,
        block: TextBlock,
        icon: Option<PlacedIcon>,
    },
    Path {
        #[serde(serialize_with = "serialize_points")]
        path: Vec<Point>,
        glyphs: Vec<GlyphPlacement>,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub text: String,
    pub font: Font,
    pub pen: Option<Pen>,
    pub visible: bool,
    #[serde(flatten)]
    pub geometry: LabelGeometry,
    #[serde(skip)]
    pub shape: LabelShape,
}

/// Convex quadrilateral, corners in winding order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn from_box(b: &Box2D) -> Self {
        Quad([
            b.min,
            point(b.max.x, b.min.y),
            b.max,
            point(b.min.x, b.max.y),
        ])
    }

    /// The segment `from -> to` thickened by `half_width` on both sides.
    pub fn around_segment(from: Point, to: Point, half_width: f32) -> Option<Self> {
        let direction = (to - from).try_normalize()?;
        let normal = Vector::new(-direction.y, direction.x) * half_width;

        Some(Quad([
            from + normal,
            to + normal,
            to - normal,
            from - normal,
        ]))
    }

    fn project(&self, axis: Vector) -> (f32, f32) {
        self.0.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), p| {
            let d = p.to_vector().dot(axis);
            (min.min(d), max.max(d))
        })
    }

    fn axes(&self) -> impl Iterator<Item = Vector> + '_ {
        (0..4).map(move |i| {
            let edge = self.0[(i + 1) % 4] - self.0[i];
            Vector::new(-edge.y, edge.x)
        })
    }

    /// Separating axis test. Quads that only touch do not overlap.
    pub fn overlaps(&self, other: &Quad) -> bool {
        self.axes()
            .chain(other.axes())
            .filter(|axis| axis.square_length() > 0.0)
            .all(|axis| {
                let (a_min, a_max) = self.project(axis);
                let (b_min, b_max) = other.project(axis);
                a_max > b_min && b_max > a_min
            })
    }
}

/// Collision footprint of a label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelShape {
    bounds: Box2D,
    quads: SmallVec<[Quad; 4]>,
}

impl Default for LabelShape {
    fn default() -> Self {
        LabelShape {
            bounds: Box2D::zero(),
            quads: SmallVec::new(),
        }
    }
}

impl LabelShape {
    pub fn from_box(b: Box2D) -> Self {
        let mut quads = SmallVec::new();
        quads.push(Quad::from_box(&b));
        LabelShape { bounds: b, quads }
    }

    pub fn from_quads<I: IntoIterator<Item = Quad>>(quads: I) -> Option<Self> {
        let quads: SmallVec<[Quad; 4]> = quads.into_iter().collect();
        if quads.is_empty() {
            return None;
        }

        let bounds = Box2D::from_points(quads.iter().flat_map(|q| q.0));
        Some(LabelShape { bounds, quads })
    }

    pub fn bounds(&self) -> &Box2D {
        &self.bounds
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn collides(&self, other: &LabelShape) -> bool {
        if !self.bounds.intersects(&other.bounds) {
            return false;
        }

        self.quads
            .iter()
            .any(|a| other.quads.iter().any(|b| a.overlaps(b)))
    }
}

/// Placed labels of one tile.
#[derive(Debug, Clone)]
pub struct LabelSpace {
    bounds: Box2D,
    labels: Vec<PlacedLabel>,
}

impl LabelSpace {
    pub fn new(bounds: Box2D) -> Self {
        LabelSpace {
            bounds,
            labels: Vec::new(),
        }
    }

    pub fn bounds(&self) -> &Box2D {
        &self.bounds
    }

    pub fn labels(&self) -> &[PlacedLabel] {
        &self.labels
    }

    pub fn get(&self, id: LabelId) -> Option<&PlacedLabel> {
        self.labels.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn visible(&self) -> impl Iterator<Item = &PlacedLabel> {
        self.labels.iter().filter(|l| l.visible)
    }

    pub fn into_labels(self) -> Vec<PlacedLabel> {
        self.labels
    }

    fn contains_point(&self, p: Point) -> bool {
        let b = &self.bounds;
        p.x >= b.min.x && p.x <= b.max.x && p.y >= b.min.y && p.y <= b.max.y
    }

    fn contains_box(&self, other: &Box2D) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    fn insert(&mut self, mut label: PlacedLabel) -> LabelId {
        for existing in &mut self.labels {
            if existing.shape.collides(&label.shape) {
                if existing.visible {
                    debug!("label '{}' hidden by '{}'", existing.text, label.text);
                }
                existing.visible = false;
            }
        }

        label.visible = true;
        self.labels.push(label);
        LabelId(self.labels.len() - 1)
    }
}
