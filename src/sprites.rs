use std::io::Read;
use std::path::Path;

use ahash::HashMap;
use log::info;
use lyon::math::Size;
use serde::Deserialize;

/// One entry of a sprite atlas index.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sprite {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,
}

fn default_pixel_ratio() -> f32 {
    1.0
}

impl Sprite {
    /// Size in tile pixels, scaled down by the atlas pixel ratio.
    pub fn size(&self) -> Size {
        let ratio = if self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        };

        Size::new(self.width as f32 / ratio, self.height as f32 / ratio)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct SpriteIndex {
    sprites: HashMap<String, Sprite>,
}

impl SpriteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        let index: SpriteIndex = serde_json::from_reader(reader)?;
        info!("loaded sprite index with {} entries", index.len());
        Ok(index)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::load(std::io::BufReader::new(file))?)
    }

    pub fn insert(&mut self, name: &str, sprite: Sprite) {
        self.sprites.insert(name.to_string(), sprite);
    }

    pub fn get(&self, name: &str) -> Option<&Sprite> {
        self.sprites.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sprites.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
