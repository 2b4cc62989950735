use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Color, Function, LayerType, LineCap, LineJoin};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Paint {
    background_color: Function<Color>,
    line_color: Function<Color>,
    line_opacity: Function<f32>,
    line_width: Function<f32>,
    line_dasharray: SmallVec<[f32; 8]>,
    fill_antialias: Function<bool>,
    fill_color: Function<Color>,
    fill_opacity: Function<f32>,
    fill_outline_color: Function<Color>,
    text_color: Function<Color>,
}

/// Stroke parameters for outlines, lines and label text.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Pen {
    pub color: Color,
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    #[serde(skip_serializing_if = "SmallVec::is_empty")]
    pub dash: SmallVec<[f32; 8]>,
}

impl Pen {
    pub fn solid(color: Color, width: f32) -> Self {
        Pen {
            color,
            width,
            cap: LineCap::default(),
            join: LineJoin::default(),
            dash: SmallVec::new(),
        }
    }
}

#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct Brush {
    pub color: Color,
}

impl Paint {
    pub fn background_color(&self, zoom: f32) -> Option<Color> {
        self.background_color.eval(zoom)
    }

    pub fn fill_color(&self, zoom: f32) -> Option<Color> {
        self.fill_color.eval(zoom)
    }

    pub fn fill_outline_color(&self, zoom: f32) -> Option<Color> {
        self.fill_outline_color.eval(zoom)
    }

    pub fn line_color(&self, zoom: f32) -> Option<Color> {
        self.line_color.eval(zoom)
    }

    pub fn text_color(&self, zoom: f32) -> Option<Color> {
        self.text_color.eval(zoom)
    }

    pub fn line_width(&self, zoom: f32) -> f32 {
        self.line_width.eval_or(zoom, 1.0)
    }

    pub fn line_dasharray(&self) -> &[f32] {
        &self.line_dasharray
    }

    pub fn pen(&self, kind: LayerType, zoom: f32, cap: LineCap, join: LineJoin) -> Option<Pen> {
        match kind {
            LayerType::Line => {
                let color = self.line_color(zoom)?;
                let width = self.line_width(zoom);
                if !(width > 0.0) {
                    return None;
                }

                Some(Pen {
                    color,
                    width,
                    cap,
                    join,
                    dash: self.line_dasharray.clone(),
                })
            }
            LayerType::Fill => {
                let color = self
                    .fill_outline_color(zoom)
                    .or_else(|| self.fill_color(zoom))?;
                Some(Pen::solid(color, 1.0))
            }
            LayerType::Symbol => Some(Pen::solid(self.text_color(zoom).unwrap_or_default(), 1.0)),
            LayerType::Background | LayerType::Unknown => None,
        }
    }

    pub fn brush(&self, kind: LayerType, zoom: f32) -> Option<Brush> {
        let color = match kind {
            LayerType::Fill => self.fill_color(zoom)?,
            LayerType::Background => self.background_color(zoom)?,
            _ => return None,
        };

        Some(Brush { color })
    }

    pub fn opacity(&self, kind: LayerType, zoom: f32) -> f32 {
        match kind {
            LayerType::Fill => self.fill_opacity.eval_or(zoom, 1.0),
            LayerType::Line => self.line_opacity.eval_or(zoom, 1.0),
            _ => 1.0,
        }
    }

    pub fn antialias(&self, kind: LayerType, zoom: f32) -> bool {
        match kind {
            LayerType::Fill => self.fill_antialias.eval_or(zoom, true),
            LayerType::Line => true,
            _ => false,
        }
    }
}
