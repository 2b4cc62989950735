use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::feature::{Feature, Geometry, Tags, point_along, polyline_length};
use crate::label::{Icon, TextProperties};
use crate::sprites::SpriteIndex;
use crate::text::TextMetrics;
use crate::tile::{Painter, Tile};

mod color;
mod filter_expression;
mod function;
mod layout;
mod paint;
mod template;

pub use color::{Color, Hsla, Rgba};
pub use filter_expression::{Comparison, FilterExpression};
pub use function::{Discrete, Function, FunctionError, Interpolate};
pub use layout::{
    Layout, LineCap, LineJoin, SymbolPlacement, TextAnchor, TextRotationAlignment,
    TextTransform, Visibility,
};
pub use paint::{Brush, Paint, Pen};
pub use template::Template;

#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("invalid style document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unable to read style: {0}")]
    Io(#[from] std::io::Error),
    #[error("layer '{layer}' requires a source-layer")]
    MissingSourceLayer { layer: String },
    #[error("layer '{layer}' has an empty zoom range [{min}, {max})")]
    InvalidZoomRange { layer: String, min: f32, max: f32 },
}

#[derive(Deserialize)]
struct StyleDocument {
    layers: Vec<Layer>,
}

/// An ordered set of layers, loaded once and shared across tile renders.
#[derive(Debug, Clone, Default)]
pub struct Style {
    layers: Vec<Layer>,
    source_layers: Vec<String>,
    sprites: SpriteIndex,
}

impl Style {
    pub fn load<R: Read>(reader: R) -> Result<Self, StyleError> {
        let document: StyleDocument = serde_json::from_reader(reader)?;
        Self::from_layers(document.layers)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StyleError> {
        let file = std::fs::File::open(path)?;
        Self::load(std::io::BufReader::new(file))
    }

    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, StyleError> {
        let mut source_layers: Vec<String> = Vec::new();

        for layer in &layers {
            layer.validate()?;

            if layer.kind == LayerType::Unknown {
                warn!("layer '{}' has an unsupported type and will not be drawn", layer.id);
            }

            if let Some(source) = layer.source_layer.as_ref() {
                if !source_layers.contains(source) {
                    source_layers.push(source.clone());
                }
            }
        }

        info!(
            "loaded style with {} layers over {} source layers",
            layers.len(),
            source_layers.len()
        );

        Ok(Style {
            layers,
            source_layers,
            sprites: SpriteIndex::default(),
        })
    }

    pub fn with_sprites(mut self, sprites: SpriteIndex) -> Self {
        self.sprites = sprites;
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn sprites(&self) -> &SpriteIndex {
        &self.sprites
    }

    /// Distinct source-layer names in order of first use.
    pub fn source_layers(&self) -> &[String] {
        &self.source_layers
    }

    pub fn matches(&self, zoom: f32, layer: usize, source_layer: &str, tags: &Tags) -> bool {
        let Some(layer) = self.layers.get(layer) else {
            return false;
        };

        if !layer.in_zoom_range(zoom) || !layer.visible() {
            return false;
        }

        match layer.kind {
            LayerType::Background => true,
            LayerType::Unknown => false,
            _ => {
                layer.source_layer.as_deref() == Some(source_layer) && layer.filter.eval(tags)
            }
        }
    }

    pub fn draw_background<M: TextMetrics + ?Sized>(&self, tile: &mut Tile<'_, M>) {
        let zoom = tile.zoom();
        let background = self.layers.iter().find(|layer| {
            layer.kind == LayerType::Background && layer.visible() && layer.in_zoom_range(zoom)
        });

        if let Some(layer) = background {
            if let Some(brush) = layer.paint.brush(LayerType::Background, zoom) {
                tile.set_background(brush, layer.paint.opacity(LayerType::Background, zoom));
            }
        }
    }

    pub fn set_painter<M: TextMetrics + ?Sized>(&self, tile: &mut Tile<'_, M>, layer: &Layer) {
        let zoom = tile.zoom();
        let paint = &layer.paint;

        tile.set_painter(Painter {
            pen: paint.pen(layer.kind, zoom, layer.layout.line_cap, layer.layout.line_join),
            brush: paint.brush(layer.kind, zoom),
            opacity: paint.opacity(layer.kind, zoom),
            antialias: paint.antialias(layer.kind, zoom),
        });
    }

    pub fn set_text_properties<M: TextMetrics + ?Sized>(
        &self,
        tile: &mut Tile<'_, M>,
        layer: &Layer,
    ) {
        let zoom = tile.zoom();
        let layout = &layer.layout;

        tile.set_text_properties(TextProperties {
            font: layout.font(zoom),
            max_width: layout.text_max_width(zoom),
            max_angle: layout.text_max_angle(zoom),
            transform: layout.text_transform,
            anchor: layout.text_anchor(zoom),
            viewport_alignment: layout.viewport_alignment(),
            symbol_placement: layout.symbol_placement(zoom),
        });
    }

    pub fn draw_feature<M: TextMetrics + ?Sized>(
        &self,
        tile: &mut Tile<'_, M>,
        layer: &Layer,
        feature: &Feature,
    ) {
        match (layer.kind, feature.geometry()) {
            (LayerType::Fill, Geometry::Polygon(rings)) => tile.draw_path(rings, true),
            (LayerType::Line, Geometry::LineString(lines)) => tile.draw_path(lines, false),
            (LayerType::Line, Geometry::Polygon(rings)) => tile.draw_path(rings, true),
            (LayerType::Symbol, geometry) => self.draw_symbol(tile, layer, feature.tags(), geometry),
            (kind, geometry) => {
                debug!(
                    "layer '{}' cannot draw {:?} geometry as {:?}",
                    layer.id,
                    geometry.kind(),
                    kind
                );
            }
        }
    }

    fn draw_symbol<M: TextMetrics + ?Sized>(
        &self,
        tile: &mut Tile<'_, M>,
        layer: &Layer,
        tags: &Tags,
        geometry: &Geometry,
    ) {
        let text = layer.layout.text(tags);
        let icon = layer.layout.icon(tags).and_then(|name| self.icon(&name));

        if text.is_none() && icon.is_none() {
            return;
        }

        let text = text.as_deref().unwrap_or("");
        let along_line = {
            let props = tile.text_properties();
            props.symbol_placement != SymbolPlacement::Point && !props.viewport_alignment
        };

        match geometry {
            Geometry::Point(points) => {
                for &anchor in points {
                    tile.add_point_label(text, anchor, icon.clone());
                }
            }
            Geometry::LineString(lines) => {
                for line in lines {
                    if along_line {
                        if !text.is_empty() {
                            tile.add_path_label(text, line);
                        }
                    } else if let Some(anchor) = point_along(line, polyline_length(line) / 2.0) {
                        tile.add_point_label(text, anchor, icon.clone());
                    }
                }
            }
            Geometry::Polygon(_) => {
                if let Some(bounds) = geometry.bounds() {
                    tile.add_point_label(text, bounds.center(), icon);
                }
            }
        }
    }

    fn icon(&self, name: &str) -> Option<Icon> {
        match self.sprites.get(name) {
            Some(sprite) => Some(Icon {
                name: name.into(),
                size: sprite.size(),
            }),
            None => {
                warn!("sprite '{}' not found", name);
                None
            }
        }
    }
}

impl FromStr for Style {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let document: StyleDocument = serde_json::from_str(s)?;
        Self::from_layers(document.layers)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Layer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerType,
    pub source_layer: Option<String>,
    pub minzoom: Option<f32>,
    pub maxzoom: Option<f32>,
    #[serde(default)]
    pub filter: FilterExpression,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub paint: Paint,
}

impl Layer {
    pub fn source_layer(&self) -> Option<&str> {
        self.source_layer.as_deref()
    }

    /// Zoom lies in `[minzoom, maxzoom)`, missing bounds are open.
    pub fn in_zoom_range(&self, zoom: f32) -> bool {
        self.minzoom.is_none_or(|min| zoom >= min) && self.maxzoom.is_none_or(|max| zoom < max)
    }

    pub fn visible(&self) -> bool {
        self.layout.visibility == Visibility::Visible
    }

    fn validate(&self) -> Result<(), StyleError> {
        let needs_source = matches!(
            self.kind,
            LayerType::Fill | LayerType::Line | LayerType::Symbol
        );
        if needs_source && self.source_layer.is_none() {
            return Err(StyleError::MissingSourceLayer {
                layer: self.id.clone(),
            });
        }

        if let (Some(min), Some(max)) = (self.minzoom, self.maxzoom) {
            if !(min < max) {
                return Err(StyleError::InvalidZoomRange {
                    layer: self.id.clone(),
                    min,
                    max,
                });
            }
        }

        Ok(())
    }
}

#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    Background,
    Fill,
    Line,
    Symbol,
    #[serde(other)]
    Unknown,
}
