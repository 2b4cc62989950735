use std::str::FromStr;

use serde::Serialize;

use super::Interpolate;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Color {
    Rgba(Rgba),
    Hsla(Hsla),
}

impl Color {
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color::Rgba(Rgba { r, g, b, a })
    }

    pub fn to_rgba(&self) -> Rgba {
        match self {
            Color::Rgba(c) => *c,
            Color::Hsla(c) => c.to_rgba(),
        }
    }

    pub fn with_alpha(&self, alpha: f32) -> Color {
        let mut color = *self;
        match color {
            Color::Rgba(ref mut c) => c.a = alpha,
            Color::Hsla(ref mut c) => c.a = alpha,
        }

        color
    }

    pub fn alpha(&self) -> f32 {
        match self {
            Color::Rgba(c) => c.a,
            Color::Hsla(c) => c.a,
        }
    }
}

impl FromStr for Color {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }

        let (name, args) = s.split_once('(').ok_or("invalid color")?;
        let args = args.strip_suffix(')').ok_or("invalid color")?;
        let channels = args
            .split(',')
            .map(parse_channel)
            .collect::<Result<smallvec::SmallVec<[f32; 4]>, _>>()?;

        let color = match (name.trim(), channels.as_slice()) {
            ("rgb", &[r, g, b]) => Color::rgba(r / 255.0, g / 255.0, b / 255.0, 1.0),
            ("rgba", &[r, g, b, a]) => Color::rgba(r / 255.0, g / 255.0, b / 255.0, a),
            ("hsl", &[h, s, l]) => Color::Hsla(Hsla::from_degrees(h, s, l, 1.0)),
            ("hsla", &[h, s, l, a]) => Color::Hsla(Hsla::from_degrees(h, s, l, a)),
            _ => return Err("invalid color"),
        };

        Ok(color)
    }
}

fn parse_hex(hex: &str) -> Result<Color, &'static str> {
    let digit = |i: usize| {
        hex.get(i..i + 1)
            .and_then(|d| u8::from_str_radix(d, 16).ok())
            .ok_or("invalid hex color")
    };
    let byte = |i: usize| Ok::<_, &'static str>(digit(i)? << 4 | digit(i + 1)?);
    let short = |i: usize| Ok::<_, &'static str>(digit(i)? * 17);

    let [r, g, b, a] = match hex.len() {
        3 => [short(0)?, short(1)?, short(2)?, 0xff],
        4 => [short(0)?, short(1)?, short(2)?, short(3)?],
        6 => [byte(0)?, byte(2)?, byte(4)?, 0xff],
        8 => [byte(0)?, byte(2)?, byte(4)?, byte(6)?],
        _ => return Err("invalid hex color"),
    };

    let channel = |c: u8| c as f32 / 255.0;
    Ok(Color::rgba(channel(r), channel(g), channel(b), channel(a)))
}

fn parse_channel(part: &str) -> Result<f32, &'static str> {
    part.trim()
        .trim_end_matches('%')
        .parse::<f32>()
        .map_err(|_| "invalid color channel")
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;
        Color::from_str(&s).map_err(|e| D::Error::custom(format!("{e} '{s}'")))
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_rgba().serialize(serializer)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::rgba(0.0, 0.0, 0.0, 1.0)
    }
}

impl Interpolate for Color {
    fn interpolate(&self, factor: f32, other: Self) -> Self {
        match (self, other) {
            (Color::Rgba(last), Color::Rgba(next)) => Color::Rgba(last.interpolate(factor, next)),
            (Color::Hsla(last), Color::Hsla(next)) => Color::Hsla(last.interpolate(factor, next)),
            (Color::Rgba(last), Color::Hsla(next)) => {
                Color::Rgba(last.interpolate(factor, next.to_rgba()))
            }
            (Color::Hsla(last), Color::Rgba(next)) => {
                Color::Rgba(last.to_rgba().interpolate(factor, next))
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Interpolate for Rgba {
    fn interpolate(&self, factor: f32, other: Self) -> Self {
        Rgba {
            r: self.r.interpolate(factor, other.r),
            g: self.g.interpolate(factor, other.g),
            b: self.b.interpolate(factor, other.b),
            a: self.a.interpolate(factor, other.a),
        }
    }
}

/// Hue, saturation and lightness normalized to `0..=1`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Hsla {
    h: f32,
    s: f32,
    l: f32,
    a: f32,
}

impl Hsla {
    fn from_degrees(h: f32, s: f32, l: f32, a: f32) -> Self {
        Hsla {
            h: h.rem_euclid(360.0) / 360.0,
            s: s / 100.0,
            l: l / 100.0,
            a,
        }
    }

    fn to_rgba(&self) -> Rgba {
        let h = self.h.clamp(0.0, 1.0) * 360.0;
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let h_prime = h / 60.0;
        let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());
        let (r, g, b) = match h_prime {
            v if v <= 1.0 => (c, x, 0.0),
            v if v <= 2.0 => (x, c, 0.0),
            v if v <= 3.0 => (0.0, c, x),
            v if v <= 4.0 => (0.0, x, c),
            v if v <= 5.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let m = l - (c / 2.0);

        Rgba {
            r: r + m,
            g: g + m,
            b: b + m,
            a: self.a,
        }
    }
}

impl Interpolate for Hsla {
    fn interpolate(&self, factor: f32, other: Self) -> Self {
        Hsla {
            h: self.h.interpolate(factor, other.h),
            s: self.s.interpolate(factor, other.s),
            l: self.l.interpolate(factor, other.l),
            a: self.a.interpolate(factor, other.a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn rgba(s: &str) -> Rgba {
        s.parse::<Color>().unwrap().to_rgba()
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(rgba("#fff"), Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 });
        assert_eq!(rgba("#ff0000"), Rgba { r: 1.0, g: 0.0, b: 0.0, a: 1.0 });
        assert_approx_eq!(f32, rgba("#00000080").a, 128.0 / 255.0);
        assert!("#12345".parse::<Color>().is_err());
        assert!("#ggg".parse::<Color>().is_err());
    }

    #[test]
    fn parses_functional_forms() {
        let c = rgba("rgba(255, 0, 51, 0.5)");
        assert_approx_eq!(f32, c.r, 1.0);
        assert_approx_eq!(f32, c.b, 0.2);
        assert_approx_eq!(f32, c.a, 0.5);

        let c = rgba("hsl(120, 100%, 50%)");
        assert_approx_eq!(f32, c.r, 0.0);
        assert_approx_eq!(f32, c.g, 1.0);
        assert_approx_eq!(f32, c.b, 0.0);

        assert!("rgb(1, 2)".parse::<Color>().is_err());
        assert!("cmyk(1, 2, 3, 4)".parse::<Color>().is_err());
    }

    #[test]
    fn interpolates_each_channel() {
        let black = Color::rgba(0.0, 0.0, 0.0, 1.0);
        let white = Color::rgba(1.0, 1.0, 1.0, 0.0);
        let mid = black.interpolate(0.5, white).to_rgba();
        assert_eq!(mid, Rgba { r: 0.5, g: 0.5, b: 0.5, a: 0.5 });
    }
}
