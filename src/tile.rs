use log::debug;
use lyon::math::{Box2D, Point, point};
use serde::Serialize;

use crate::feature::{TileFeatures, serialize_parts};
use crate::label::{Icon, LabelId, LabelSpace, PlacedLabel, TextProperties};
use crate::style::{Brush, LayerType, Pen, Style};
use crate::text::TextMetrics;

pub const DEFAULT_TILE_SIZE: f32 = 512.0;

/// Resolved draw parameters of the layer currently being drawn.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Painter {
    pub pen: Option<Pen>,
    pub brush: Option<Brush>,
    pub opacity: f32,
    pub antialias: bool,
}

impl Default for Painter {
    fn default() -> Self {
        Painter {
            pen: None,
            brush: None,
            opacity: 1.0,
            antialias: false,
        }
    }
}

#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct Background {
    pub brush: Brush,
    pub opacity: f32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PathDraw {
    #[serde(flatten)]
    pub painter: Painter,
    pub closed: bool,
    #[serde(serialize_with = "serialize_parts")]
    pub parts: Vec<Vec<Point>>,
}

/// Everything a rasterizer needs to draw one tile, in paint order.
#[derive(Serialize, Debug, Clone)]
pub struct DrawList {
    pub zoom: f32,
    pub size: f32,
    pub background: Option<Background>,
    pub paths: Vec<PathDraw>,
    pub labels: Vec<PlacedLabel>,
}

/// State of one tile render pass.
pub struct Tile<'m, M: TextMetrics + ?Sized> {
    zoom: f32,
    size: f32,
    metrics: &'m M,
    painter: Painter,
    text: TextProperties,
    labels: LabelSpace,
    background: Option<Background>,
    paths: Vec<PathDraw>,
}

impl<'m, M: TextMetrics + ?Sized> Tile<'m, M> {
    pub fn new(zoom: f32, size: f32, metrics: &'m M) -> Self {
        Tile {
            zoom,
            size,
            metrics,
            painter: Painter::default(),
            text: TextProperties::default(),
            labels: LabelSpace::new(Box2D::new(point(0.0, 0.0), point(size, size))),
            background: None,
            paths: Vec::new(),
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn painter(&self) -> &Painter {
        &self.painter
    }

    pub fn text_properties(&self) -> &TextProperties {
        &self.text
    }

    pub fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    pub(crate) fn set_background(&mut self, brush: Brush, opacity: f32) {
        self.background = Some(Background { brush, opacity });
    }

    pub(crate) fn set_painter(&mut self, painter: Painter) {
        self.painter = painter;
    }

    pub(crate) fn set_text_properties(&mut self, text: TextProperties) {
        self.text = text;
    }

    pub(crate) fn draw_path(&mut self, parts: &[Vec<Point>], closed: bool) {
        if self.painter.pen.is_none() && self.painter.brush.is_none() {
            return;
        }

        let parts: Vec<Vec<Point>> = parts.iter().filter(|p| p.len() >= 2).cloned().collect();
        if parts.is_empty() {
            return;
        }

        self.paths.push(PathDraw {
            painter: self.painter.clone(),
            closed,
            parts,
        });
    }

    pub(crate) fn add_point_label(
        &mut self,
        text: &str,
        anchor: Point,
        icon: Option<Icon>,
    ) -> Option<LabelId> {
        let pen = self.painter.pen.clone();
        self.labels
            .place_point(text, anchor, &self.text, pen, icon, self.metrics)
    }

    pub(crate) fn add_path_label(&mut self, text: &str, path: &[Point]) -> Option<LabelId> {
        let pen = self.painter.pen.clone();
        self.labels.place_path(text, path, &self.text, pen, self.metrics)
    }

    pub fn finish(self) -> DrawList {
        DrawList {
            zoom: self.zoom,
            size: self.size,
            background: self.background,
            paths: self.paths,
            labels: self.labels.into_labels(),
        }
    }
}

/// Draws every matching feature of a tile, layer by layer in style order.
pub fn render_tile<M: TextMetrics + ?Sized>(
    style: &Style,
    features: &TileFeatures,
    zoom: f32,
    size: f32,
    metrics: &M,
) -> DrawList {
    let mut tile = Tile::new(zoom, size, metrics);
    style.draw_background(&mut tile);

    for (index, layer) in style.layers().iter().enumerate() {
        if matches!(layer.kind, LayerType::Background | LayerType::Unknown) {
            continue;
        }
        let Some(source_layer) = layer.source_layer() else {
            continue;
        };

        let mut prepared = false;
        for feature in features.get(source_layer) {
            if !style.matches(zoom, index, source_layer, feature.tags()) {
                continue;
            }

            if !prepared {
                style.set_painter(&mut tile, layer);
                style.set_text_properties(&mut tile, layer);
                prepared = true;
            }

            style.draw_feature(&mut tile, layer, feature);
        }

        if !prepared {
            debug!("layer '{}' has nothing to draw at zoom {}", layer.id, zoom);
        }
    }

    tile.finish()
}
