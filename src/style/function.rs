use serde::Deserialize;
use smallvec::SmallVec;

/// Blending of two stop values. `factor` runs from 0 (self) to 1 (other).
pub trait Interpolate: Copy {
    fn interpolate(&self, factor: f32, other: Self) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(&self, factor: f32, other: Self) -> Self {
        self + (other - self) * factor
    }
}

impl<A: Interpolate, B: Interpolate> Interpolate for (A, B) {
    fn interpolate(&self, factor: f32, other: Self) -> Self {
        (
            self.0.interpolate(factor, other.0),
            self.1.interpolate(factor, other.1),
        )
    }
}

/// Values that step to the lower stop instead of blending.
pub trait Discrete: Copy {}

impl<T: Discrete> Interpolate for T {
    fn interpolate(&self, _factor: f32, _other: Self) -> Self {
        *self
    }
}

impl Discrete for bool {}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FunctionError {
    #[error("function has no stops")]
    Empty,
    #[error("function stops are not sorted by zoom ({previous} before {next})")]
    Unsorted { previous: f32, next: f32 },
    #[error("function has more than one stop at zoom {0}")]
    DuplicateZoom(f32),
    #[error("function base must be a positive number, found {0}")]
    InvalidBase(f32),
}

/// A property value keyed by zoom level.
///
/// Stops are kept sorted by zoom with no duplicates. A function without stops
/// evaluates to `None` and the owning property falls back to its default.
#[derive(Debug, Clone, PartialEq)]
pub struct Function<T> {
    base: f32,
    interval: bool,
    stops: SmallVec<[(f32, T); 4]>,
}

impl<T> Default for Function<T> {
    fn default() -> Self {
        Function {
            base: 1.0,
            interval: false,
            stops: SmallVec::new(),
        }
    }
}

impl<T: Interpolate> Function<T> {
    pub fn constant(value: T) -> Self {
        let mut stops = SmallVec::new();
        stops.push((0.0, value));

        Function {
            stops,
            ..Default::default()
        }
    }

    pub fn from_stops<I: IntoIterator<Item = (f32, T)>>(stops: I) -> Result<Self, FunctionError> {
        let stops: SmallVec<[(f32, T); 4]> = stops.into_iter().collect();

        if stops.is_empty() {
            return Err(FunctionError::Empty);
        }

        for pair in stops.windows(2) {
            let (previous, next) = (pair[0].0, pair[1].0);
            if previous == next {
                return Err(FunctionError::DuplicateZoom(next));
            }
            if !(previous < next) {
                return Err(FunctionError::Unsorted { previous, next });
            }
        }

        Ok(Function {
            stops,
            ..Default::default()
        })
    }

    pub fn with_base(mut self, base: f32) -> Result<Self, FunctionError> {
        if !(base > 0.0) || !base.is_finite() {
            return Err(FunctionError::InvalidBase(base));
        }

        self.base = base;
        Ok(self)
    }

    /// Step between stops even for continuous values.
    pub fn with_interval(mut self) -> Self {
        self.interval = true;
        self
    }

    pub fn stops(&self) -> &[(f32, T)] {
        &self.stops
    }

    pub fn eval(&self, zoom: f32) -> Option<T> {
        let first = self.stops.first()?;
        let last = self.stops.last()?;

        if zoom.is_nan() || zoom <= first.0 {
            return Some(first.1);
        }
        if zoom >= last.0 {
            return Some(last.1);
        }

        // first stop with a zoom at or above `zoom`, never the first stop here
        let upper = self.stops.partition_point(|(z, _)| *z < zoom);
        let (z0, v0) = self.stops[upper - 1];
        let (z1, v1) = self.stops[upper];

        if self.interval {
            return Some(v0);
        }

        Some(v0.interpolate(self.factor(zoom, z0, z1), v1))
    }

    pub fn eval_or(&self, zoom: f32, default: T) -> T {
        self.eval(zoom).unwrap_or(default)
    }

    fn factor(&self, zoom: f32, z0: f32, z1: f32) -> f32 {
        let range = z1 - z0;
        let progress = zoom - z0;

        if self.base == 1.0 {
            progress / range
        } else {
            (self.base.powf(progress) - 1.0) / (self.base.powf(range) - 1.0)
        }
    }
}

#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum FunctionType {
    Exponential,
    Interval,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFunction<T> {
    Constant(T),
    Stops {
        base: Option<f32>,
        #[serde(rename = "type")]
        kind: Option<FunctionType>,
        stops: Vec<(f32, T)>,
    },
}

impl<'de, T> serde::Deserialize<'de> for Function<T>
where
    T: Interpolate + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let function = match RawFunction::<T>::deserialize(deserializer)? {
            RawFunction::Constant(value) => Function::constant(value),
            RawFunction::Stops { base, kind, stops } => {
                let mut function = Function::from_stops(stops).map_err(D::Error::custom)?;
                if let Some(base) = base {
                    function = function.with_base(base).map_err(D::Error::custom)?;
                }
                if kind == Some(FunctionType::Interval) {
                    function = function.with_interval();
                }
                function
            }
        };

        Ok(function)
    }
}
