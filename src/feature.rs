use std::fmt::Write as _;

use ahash::HashMap;
use lyon::math::{Box2D, Point, point};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeSeq};

/// A single tag value as handed over by the tile decoder.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    String(smartstring::alias::String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            Value::Number(_) => None,
            Value::Bool(_) => None,
        }
    }

    /// Numbers, and strings that read as finite numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Value::Number(n) => Some(*n),
            Value::Bool(_) => None,
        }
    }

    pub(crate) fn write_to(&self, out: &mut smartstring::alias::String) {
        let _ = write!(out, "{}", self);
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => std::fmt::Display::fmt(s, f),
            Value::Number(n) => std::fmt::Display::fmt(n, f),
            Value::Bool(b) => std::fmt::Display::fmt(b, f),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

macro_rules! value_from_number {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(value.into())
                }
            }
        )*
    }
}

value_from_number! {f64, f32, i32, u32, i16, u16, i8, u8}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Tag mapping of one feature. Keys are unique, order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags {
    values: HashMap<smartstring::alias::String, Value>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<Value>
    where
        K: Into<smartstring::alias::String>,
        V: Into<Value>,
    {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<smartstring::alias::String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (key, value) in iter {
            tags.insert(key, value);
        }

        tags
    }
}

impl<'de> serde::Deserialize<'de> for Tags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // null properties carry no information for matching, drop them
        let raw = HashMap::<smartstring::alias::String, Option<Value>>::deserialize(deserializer)?;
        let values = raw
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();

        Ok(Tags { values })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        }
    }
}

/// Feature geometry in tile pixel space. Multi-part geometries keep every
/// part; polygon rings are not classified into exterior and holes.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawGeometry")]
pub enum Geometry {
    Point(Vec<Point>),
    LineString(Vec<Vec<Point>>),
    Polygon(Vec<Vec<Point>>),
}

impl Geometry {
    pub fn point(p: Point) -> Self {
        Geometry::Point(vec![p])
    }

    pub fn line<I: IntoIterator<Item = Point>>(points: I) -> Self {
        Geometry::LineString(vec![points.into_iter().collect()])
    }

    pub fn polygon<I: IntoIterator<Item = Point>>(ring: I) -> Self {
        Geometry::Polygon(vec![ring.into_iter().collect()])
    }

    pub fn kind(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
        }
    }

    pub fn bounds(&self) -> Option<Box2D> {
        let points: Vec<Point> = match self {
            Geometry::Point(points) => points.clone(),
            Geometry::LineString(parts) | Geometry::Polygon(parts) => {
                parts.iter().flatten().copied().collect()
            }
        };

        (!points.is_empty()).then(|| Box2D::from_points(points))
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum RawGeometry {
    Point([f32; 2]),
    MultiPoint(Vec<[f32; 2]>),
    LineString(Vec<[f32; 2]>),
    MultiLineString(Vec<Vec<[f32; 2]>>),
    Polygon(Vec<Vec<[f32; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f32; 2]>>>),
}

impl From<RawGeometry> for Geometry {
    fn from(raw: RawGeometry) -> Self {
        let to_point = |[x, y]: [f32; 2]| point(x, y);
        let to_line = |line: Vec<[f32; 2]>| line.into_iter().map(to_point).collect::<Vec<_>>();

        match raw {
            RawGeometry::Point(p) => Geometry::Point(vec![to_point(p)]),
            RawGeometry::MultiPoint(points) => {
                Geometry::Point(points.into_iter().map(to_point).collect())
            }
            RawGeometry::LineString(line) => Geometry::LineString(vec![to_line(line)]),
            RawGeometry::MultiLineString(lines) => {
                Geometry::LineString(lines.into_iter().map(to_line).collect())
            }
            RawGeometry::Polygon(rings) => {
                Geometry::Polygon(rings.into_iter().map(to_line).collect())
            }
            RawGeometry::MultiPolygon(polygons) => {
                Geometry::Polygon(polygons.into_iter().flatten().map(to_line).collect())
            }
        }
    }
}

/// A decoded feature: geometry plus tags. The geometry kind is readable by
/// filters under the `$type` key.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawFeature")]
pub struct Feature {
    geometry: Geometry,
    tags: Tags,
}

impl Feature {
    pub fn new(geometry: Geometry, mut tags: Tags) -> Self {
        tags.insert("$type", geometry.kind().as_str());
        Feature { geometry, tags }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }
}

#[derive(Deserialize)]
struct RawFeature {
    geometry: Geometry,
    #[serde(default)]
    properties: Tags,
}

impl From<RawFeature> for Feature {
    fn from(raw: RawFeature) -> Self {
        Feature::new(raw.geometry, raw.properties)
    }
}

/// Features of one tile grouped by source-layer name.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct TileFeatures {
    #[serde(default)]
    layers: HashMap<String, Vec<Feature>>,
}

impl TileFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source_layer: &str, feature: Feature) {
        self.layers
            .entry(source_layer.to_string())
            .or_default()
            .push(feature);
    }

    pub fn get(&self, source_layer: &str) -> &[Feature] {
        self.layers
            .get(source_layer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Point `distance` units along a polyline, clamped to its ends.
pub fn point_along(line: &[Point], distance: f32) -> Option<Point> {
    let first = *line.first()?;
    let mut travelled = 0.0;

    for pair in line.windows(2) {
        let length = (pair[1] - pair[0]).length();
        if travelled + length >= distance && length > 0.0 {
            let t = ((distance - travelled) / length).clamp(0.0, 1.0);
            return Some(pair[0].lerp(pair[1], t));
        }
        travelled += length;
    }

    Some(line.last().copied().unwrap_or(first))
}

pub fn polyline_length(line: &[Point]) -> f32 {
    line.windows(2).map(|pair| (pair[1] - pair[0]).length()).sum()
}

pub(crate) fn serialize_point<S: Serializer>(p: &Point, serializer: S) -> Result<S::Ok, S::Error> {
    [p.x, p.y].serialize(serializer)
}

pub(crate) fn serialize_points<S: Serializer>(
    points: &[Point],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(points.len()))?;
    for p in points {
        seq.serialize_element(&[p.x, p.y])?;
    }
    seq.end()
}

pub(crate) fn serialize_parts<S: Serializer>(
    parts: &[Vec<Point>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(parts.len()))?;
    for part in parts {
        let part: Vec<[f32; 2]> = part.iter().map(|p| [p.x, p.y]).collect();
        seq.serialize_element(&part)?;
    }
    seq.end()
}

pub(crate) fn serialize_box<S: Serializer>(b: &Box2D, serializer: S) -> Result<S::Ok, S::Error> {
    [b.min.x, b.min.y, b.max.x, b.max.y].serialize(serializer)
}
