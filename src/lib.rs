//! Style matching and label placement for vector map tiles.
//!
//! A [`Style`] is loaded once from a MapLibre style document and decides,
//! per feature and zoom, which layers apply and with which paint and layout.
//! [`render_tile`] walks the layers of one tile and produces a [`DrawList`]:
//! filled and stroked paths plus labels placed so that they do not overlap.

pub mod feature;
pub mod label;
pub mod sprites;
pub mod style;
pub mod text;
pub mod tile;

pub use feature::{Feature, Geometry, GeometryType, Tags, TileFeatures, Value};
pub use label::{LabelId, LabelSpace, PlacedLabel, TextProperties};
pub use sprites::{Sprite, SpriteIndex};
pub use style::{Layer, LayerType, Style, StyleError};
pub use text::{FixedMetrics, Font, FontCollection, TextMetrics};
pub use tile::{DEFAULT_TILE_SIZE, DrawList, Tile, render_tile};
