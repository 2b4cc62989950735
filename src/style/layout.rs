use lyon::math::{Size, Vector, vector};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smartstring::alias::String;

use super::{Discrete, Function, Template};
use crate::feature::Tags;
use crate::text::Font;

#[derive(Deserialize, Default, Debug, Clone)]
#[serde(rename_all = "kebab-case", default)]
pub struct Layout {
    pub visibility: Visibility,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    text_field: Template,
    icon_image: Template,
    text_font: SmallVec<[String; 2]>,
    text_size: Function<f32>,
    text_max_width: Function<f32>,
    text_max_angle: Function<f32>,
    pub text_transform: TextTransform,
    text_anchor: Function<TextAnchor>,
    pub text_rotation_alignment: TextRotationAlignment,
    symbol_placement: Function<SymbolPlacement>,
}

impl Layout {
    pub fn text_size(&self, zoom: f32) -> f32 {
        self.text_size.eval_or(zoom, 16.0)
    }

    /// Wrap width in ems.
    pub fn text_max_width(&self, zoom: f32) -> f32 {
        self.text_max_width.eval_or(zoom, 10.0)
    }

    /// Largest bend between neighbouring path segments, in degrees.
    pub fn text_max_angle(&self, zoom: f32) -> f32 {
        self.text_max_angle.eval_or(zoom, 45.0)
    }

    pub fn text_anchor(&self, zoom: f32) -> TextAnchor {
        self.text_anchor.eval(zoom).unwrap_or_default()
    }

    pub fn symbol_placement(&self, zoom: f32) -> SymbolPlacement {
        self.symbol_placement.eval(zoom).unwrap_or_default()
    }

    pub fn viewport_alignment(&self) -> bool {
        self.text_rotation_alignment == TextRotationAlignment::Viewport
    }

    pub fn text_font(&self) -> &[String] {
        &self.text_font
    }

    pub fn font(&self, zoom: f32) -> Font {
        Font {
            families: self.text_font.clone(),
            size: self.text_size(zoom),
        }
    }

    pub fn text(&self, tags: &Tags) -> Option<String> {
        if self.text_field.is_empty() {
            return None;
        }

        let raw = self.text_field.resolve(tags);
        let mut text = String::new();
        for c in raw.trim().chars() {
            self.text_transform.transform(c, &mut text);
        }

        if text.is_empty() { None } else { Some(text) }
    }

    pub fn icon(&self, tags: &Tags) -> Option<String> {
        let icon = self.icon_image.resolve(tags);
        if icon.trim().is_empty() {
            None
        } else {
            Some(icon)
        }
    }
}

#[derive(Deserialize, Serialize, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    Visible,
    None,
}

#[derive(Deserialize, Serialize, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LineJoin {
    Round,
    #[default]
    Miter,
    Bevel,
}

#[derive(Deserialize, Serialize, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Deserialize, Serialize, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
}

impl TextTransform {
    fn transform(&self, c: char, text: &mut String) {
        match self {
            TextTransform::None => text.push(c),
            TextTransform::Uppercase => text.extend(c.to_uppercase()),
            TextTransform::Lowercase => text.extend(c.to_lowercase()),
        }
    }
}

#[derive(Deserialize, Serialize, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TextAnchor {
    #[default]
    Center,
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TextAnchor {
    /// Offset from the anchor point to the top left corner of a box of `size`.
    pub fn offset(&self, size: Size) -> Vector {
        let (w, h) = (size.width, size.height);
        match self {
            TextAnchor::Center => vector(-w / 2.0, -h / 2.0),
            TextAnchor::Left => vector(0.0, -h / 2.0),
            TextAnchor::Right => vector(-w, -h / 2.0),
            TextAnchor::Top => vector(-w / 2.0, 0.0),
            TextAnchor::Bottom => vector(-w / 2.0, -h),
            TextAnchor::TopLeft => vector(0.0, 0.0),
            TextAnchor::TopRight => vector(-w, 0.0),
            TextAnchor::BottomLeft => vector(0.0, -h),
            TextAnchor::BottomRight => vector(-w, -h),
        }
    }
}

impl Discrete for TextAnchor {}

#[derive(Deserialize, Serialize, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TextRotationAlignment {
    #[default]
    Auto,
    Map,
    Viewport,
}

#[derive(Deserialize, Serialize, Default, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolPlacement {
    #[default]
    Point,
    Line,
    LineCenter,
}

impl Discrete for SymbolPlacement {}
