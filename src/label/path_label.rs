use log::debug;
use lyon::geom::LineSegment;
use lyon::math::{Box2D, Point, point};

use super::{
    GlyphPlacement, LabelGeometry, LabelId, LabelShape, LabelSpace, PlacedLabel, Quad,
    TextProperties,
};
use crate::feature::polyline_length;
use crate::style::Pen;
use crate::text::TextMetrics;

type Segment = LineSegment<f32>;

impl LabelSpace {
    /// Places `text` along the first straight enough stretch of `path` that
    /// can hold it, centered on that stretch and reading left to right.
    pub fn place_path<M: TextMetrics + ?Sized>(
        &mut self,
        text: &str,
        path: &[Point],
        props: &TextProperties,
        pen: Option<Pen>,
        metrics: &M,
    ) -> Option<LabelId> {
        let text = text.trim();
        if path.len() < 2 || text.is_empty() {
            return None;
        }

        let font = &props.font;
        let text_width = metrics.text_width(font, text);
        if text_width > polyline_length(path) {
            debug!("label '{}' is longer than its path", text);
            return None;
        }

        let segments = clip_polyline(path, &self.bounds)?;
        let char_width = metrics.average_char_width(font);
        let Some(mut sub_path) = text_path(
            &segments,
            text_width,
            props.max_angle,
            char_width,
            &self.bounds,
        ) else {
            debug!("no stretch of the path fits label '{}'", text);
            return None;
        };

        if reads_backwards(&sub_path) {
            sub_path.reverse();
        }

        let half_height = metrics.line_height(font) / 2.0;
        let quads = sub_path
            .windows(2)
            .filter_map(|pair| Quad::around_segment(pair[0], pair[1], half_height));
        let shape = LabelShape::from_quads(quads)?;

        if !self.contains_box(shape.bounds()) {
            debug!("label '{}' does not fit inside the tile", text);
            return None;
        }

        let glyphs = lay_glyphs(text, &sub_path, props, metrics);
        let label = PlacedLabel {
            text: text.into(),
            font: font.clone(),
            pen,
            visible: true,
            geometry: LabelGeometry::Path {
                path: sub_path,
                glyphs,
            },
            shape,
        };

        Some(self.insert(label))
    }
}

fn contains(bounds: &Box2D, p: Point) -> bool {
    p.x >= bounds.min.x && p.x <= bounds.max.x && p.y >= bounds.min.y && p.y <= bounds.max.y
}

/// Where `segment` crosses the edge of `bounds`, edges tried top, left,
/// bottom, right. The crossing is clamped onto the tile.
fn boundary_crossing(segment: &Segment, bounds: &Box2D) -> Option<Point> {
    let top_left = bounds.min;
    let top_right = point(bounds.max.x, bounds.min.y);
    let bottom_right = bounds.max;
    let bottom_left = point(bounds.min.x, bounds.max.y);

    [
        (top_left, top_right),
        (top_left, bottom_left),
        (bottom_right, bottom_left),
        (bottom_right, top_right),
    ]
    .into_iter()
    .find_map(|(from, to)| segment.intersection(&Segment { from, to }))
    .map(|p| p.clamp(bounds.min, bounds.max))
}

/// Segments of `path` between its first and last vertex inside `bounds`,
/// extended to the boundary where the path enters or leaves.
fn clip_polyline(path: &[Point], bounds: &Box2D) -> Option<Vec<Segment>> {
    let start = path.iter().position(|p| contains(bounds, *p))?;
    let end = path.iter().rposition(|p| contains(bounds, *p))?;

    let mut segments = Vec::with_capacity(end - start + 2);

    if start > 0 {
        let entering = Segment {
            from: path[start - 1],
            to: path[start],
        };
        if let Some(p) = boundary_crossing(&entering, bounds) {
            segments.push(Segment {
                from: p,
                to: path[start],
            });
        }
    }

    segments.extend(path[start..=end].windows(2).map(|pair| Segment {
        from: pair[0],
        to: pair[1],
    }));

    if end < path.len() - 1 {
        let leaving = Segment {
            from: path[end],
            to: path[end + 1],
        };
        if let Some(p) = boundary_crossing(&leaving, bounds) {
            segments.push(Segment {
                from: path[end],
                to: p,
            });
        }
    }

    if segments.is_empty() { None } else { Some(segments) }
}

/// Splits the segments into runs and returns the centered `text_width` long
/// stretch of the first run that can hold it.
fn text_path(
    segments: &[Segment],
    text_width: f32,
    max_angle: f32,
    char_width: f32,
    bounds: &Box2D,
) -> Option<Vec<Point>> {
    let mut start = 0;
    let mut length = 0.0;
    let mut angle = segment_angle(segments.first()?);

    for (i, segment) in segments.iter().enumerate() {
        let segment_length = segment.length();
        let a = segment_angle(segment);

        let outside = !contains(bounds, segment.to);
        let short = segment_length < char_width;
        let bent = angle_delta(angle, a) > max_angle;

        if outside || short || bent {
            if start < i && length >= text_width {
                return Some(trim_run(&segments[start..i], length - text_width));
            }

            if outside || short {
                start = i + 1;
                length = 0.0;
            } else {
                start = i;
                length = segment_length;
            }
        } else {
            length += segment_length;
        }

        angle = a;
    }

    if start < segments.len() && length >= text_width {
        return Some(trim_run(&segments[start..], length - text_width));
    }

    None
}

/// Removes `cut / 2` from each end of a run.
fn trim_run(run: &[Segment], cut: f32) -> Vec<Point> {
    let half = cut / 2.0;
    let last = run.len() - 1;

    let mut first = 0;
    let mut skipped = 0.0;
    while first < last && skipped + run[first].length() < half {
        skipped += run[first].length();
        first += 1;
    }

    let mut end = last;
    let mut dropped = 0.0;
    while end > first && dropped + run[end].length() < half {
        dropped += run[end].length();
        end -= 1;
    }

    let head = &run[first];
    let tail = &run[end];
    let from = head.sample(fraction(half - skipped, head.length()));
    let to = tail.sample(1.0 - fraction(half - dropped, tail.length()));

    let mut points = Vec::with_capacity(end - first + 2);
    points.push(from);
    points.extend(run[first..end].iter().map(|s| s.to));
    points.push(to);

    points
}

fn fraction(part: f32, whole: f32) -> f32 {
    if whole > 0.0 {
        (part / whole).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Degrees counter-clockwise from the x axis with y growing downwards,
/// in `[0, 360)`.
fn segment_angle(segment: &Segment) -> f32 {
    let d = segment.to_vector();
    let degrees = (-d.y).atan2(d.x).to_degrees().rem_euclid(360.0);
    if degrees >= 360.0 { 0.0 } else { degrees }
}

/// Smallest difference between two angles in degrees.
fn angle_delta(a: f32, b: f32) -> f32 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

/// Text along a path whose start heads left would render upside down.
fn reads_backwards(path: &[Point]) -> bool {
    let angle = segment_angle(&Segment {
        from: path[0],
        to: path[1],
    });
    angle > 90.0 && angle < 270.0
}

fn lay_glyphs<M: TextMetrics + ?Sized>(
    text: &str,
    path: &[Point],
    props: &TextProperties,
    metrics: &M,
) -> Vec<GlyphPlacement> {
    let font = &props.font;
    let segments: Vec<Segment> = path
        .windows(2)
        .map(|pair| Segment {
            from: pair[0],
            to: pair[1],
        })
        .collect();

    let mut glyphs = Vec::new();
    let mut distance = 0.0;
    let mut previous = None;

    for glyph in text.chars() {
        if let Some(previous) = previous {
            distance += metrics.kern(font, previous, glyph);
        }
        let advance = metrics.advance(font, glyph);

        let (position, _) = locate(&segments, distance);
        let (_, segment) = locate(&segments, distance + advance / 2.0);
        glyphs.push(GlyphPlacement {
            glyph,
            position,
            angle: segment_angle(segment),
        });

        distance += advance;
        previous = Some(glyph);
    }

    glyphs
}

/// Point `distance` along the segments and the segment it lies on.
fn locate(segments: &[Segment], distance: f32) -> (Point, &Segment) {
    let mut travelled = 0.0;
    for segment in segments {
        let length = segment.length();
        if travelled + length >= distance {
            return (segment.sample(fraction(distance - travelled, length)), segment);
        }
        travelled += length;
    }

    let last = &segments[segments.len() - 1];
    (last.to, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{FixedMetrics, Font};
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;

    fn space() -> LabelSpace {
        LabelSpace::new(Box2D::new(point(0.0, 0.0), point(100.0, 100.0)))
    }

    fn props() -> TextProperties {
        TextProperties {
            font: Font::new(10.0),
            ..Default::default()
        }
    }

    fn metrics() -> FixedMetrics {
        FixedMetrics {
            advance: 0.5,
            line_height: 1.0,
        }
    }

    fn placed_path(space: &LabelSpace, id: LabelId) -> Vec<Point> {
        match space.get(id).map(|l| &l.geometry) {
            Some(LabelGeometry::Path { path, .. }) => path.clone(),
            other => panic!("expected a path label, got {:?}", other),
        }
    }

    fn assert_points(actual: &[Point], expected: &[Point]) {
        assert_eq!(actual.len(), expected.len(), "{:?} != {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert_approx_eq!(f32, a.x, e.x, epsilon = 1e-3);
            assert_approx_eq!(f32, a.y, e.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn straight_path_label_is_centered() {
        let mut space = space();
        let path = [point(10.0, 50.0), point(90.0, 50.0)];
        let id = space
            .place_path("abcd", &path, &props(), None, &metrics())
            .unwrap();

        assert_points(&placed_path(&space, id), &[point(40.0, 50.0), point(60.0, 50.0)]);

        let label = space.get(id).unwrap();
        assert_eq!(
            label.shape.bounds(),
            &Box2D::new(point(40.0, 45.0), point(60.0, 55.0))
        );
        match &label.geometry {
            LabelGeometry::Path { glyphs, .. } => {
                assert_eq!(glyphs.len(), 4);
                assert_points(&[glyphs[1].position], &[point(45.0, 50.0)]);
                assert_eq!(glyphs[0].angle, 0.0);
            }
            other => panic!("expected a path label, got {:?}", other),
        }
    }

    #[test]
    fn leftward_path_is_reversed() {
        let mut space = space();
        let path = [point(90.0, 50.0), point(10.0, 50.0)];
        let id = space
            .place_path("abcd", &path, &props(), None, &metrics())
            .unwrap();

        assert_points(&placed_path(&space, id), &[point(40.0, 50.0), point(60.0, 50.0)]);
    }

    #[test]
    fn reversal_depends_on_first_segment_angle() {
        assert!(reads_backwards(&[point(10.0, 0.0), point(0.0, 0.0)]));
        assert!(!reads_backwards(&[point(0.0, 0.0), point(10.0, 0.0)]));
        // straight up and straight down are kept
        assert!(!reads_backwards(&[point(0.0, 10.0), point(0.0, 0.0)]));
        assert!(!reads_backwards(&[point(0.0, 0.0), point(0.0, 10.0)]));
    }

    #[test]
    fn angles_are_counter_clockwise_with_y_down() {
        let angle = |x: f32, y: f32| segment_angle(&Segment {
            from: point(0.0, 0.0),
            to: point(x, y),
        });
        assert_approx_eq!(f32, angle(1.0, 0.0), 0.0);
        assert_approx_eq!(f32, angle(0.0, -1.0), 90.0);
        assert_approx_eq!(f32, angle(-1.0, 0.0), 180.0);
        assert_approx_eq!(f32, angle(0.0, 1.0), 270.0);

        assert_approx_eq!(f32, angle_delta(350.0, 10.0), 20.0);
        assert_approx_eq!(f32, angle_delta(90.0, 0.0), 90.0);
    }

    #[test]
    fn rejects_paths_shorter_than_text() {
        let mut space = space();
        let path = [point(10.0, 50.0), point(25.0, 50.0)];
        assert_eq!(space.place_path("abcd", &path, &props(), None, &metrics()), None);
        assert_eq!(space.place_path("abcd", &path[..1], &props(), None, &metrics()), None);
        assert_eq!(
            space.place_path("", &[point(0.0, 50.0), point(90.0, 50.0)], &props(), None, &metrics()),
            None
        );
    }

    #[test]
    fn sharp_bend_ends_the_run() {
        let mut space = space();
        let path = [point(10.0, 50.0), point(30.0, 50.0), point(30.0, 90.0)];
        let id = space
            .place_path("abcd", &path, &props(), None, &metrics())
            .unwrap();

        assert_points(&placed_path(&space, id), &[point(10.0, 50.0), point(30.0, 50.0)]);
    }

    #[test]
    fn run_after_a_bend_starts_with_the_bending_segment() {
        let mut space = space();
        let path = [point(10.0, 50.0), point(20.0, 50.0), point(20.0, 90.0)];
        let id = space
            .place_path("abcd", &path, &props(), None, &metrics())
            .unwrap();

        assert_points(&placed_path(&space, id), &[point(20.0, 60.0), point(20.0, 80.0)]);
    }

    #[test]
    fn gentle_bends_stay_in_one_run() {
        let mut space = space();
        let path = [point(10.0, 50.0), point(50.0, 50.0), point(90.0, 40.0)];
        let id = space
            .place_path("abcdefghijklmn", &path, &props(), None, &metrics())
            .unwrap();

        let placed = placed_path(&space, id);
        assert_eq!(placed.len(), 3);
        assert_approx_eq!(f32, polyline_length(&placed), 70.0, epsilon = 1e-3);
    }

    #[test]
    fn path_is_clipped_to_the_tile() {
        let mut space = space();
        let path = [point(-20.0, 50.0), point(50.0, 50.0), point(120.0, 50.0)];
        let id = space
            .place_path("abcd", &path, &props(), None, &metrics())
            .unwrap();

        assert_points(&placed_path(&space, id), &[point(40.0, 50.0), point(50.0, 50.0), point(60.0, 50.0)]);

        let clipped = clip_polyline(&path, space.bounds()).unwrap();
        assert_eq!(clipped.len(), 2);
        assert_points(&[clipped[0].from, clipped[1].to], &[point(0.0, 50.0), point(100.0, 50.0)]);
    }

    fn tile() -> LabelSpace {
        LabelSpace::new(Box2D::new(point(0.0, 0.0), point(512.0, 512.0)))
    }

    #[test]
    fn crossings_land_on_the_tile_edge() {
        let bounds = *tile().bounds();
        let top = Segment { from: point(301.5, 250.85), to: point(-53.1, -39.0) };
        let left = Segment { from: point(300.3, 200.7), to: point(-47.9, 33.1) };

        let p = boundary_crossing(&top, &bounds).unwrap();
        assert!(contains(&bounds, p), "{:?} is off the tile", p);
        assert_approx_eq!(f32, p.y, 0.0, epsilon = 1e-3);

        let p = boundary_crossing(&left, &bounds).unwrap();
        assert!(contains(&bounds, p), "{:?} is off the tile", p);
        assert_approx_eq!(f32, p.x, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn label_fits_on_path_leaving_through_the_top() {
        let mut space = tile();
        let text = "x".repeat(39);
        let path = [point(301.5, 250.85), point(-53.1, -39.0)];
        let id = space
            .place_path(&text, &path, &props(), None, &metrics())
            .unwrap();

        assert_approx_eq!(f32, polyline_length(&placed_path(&space, id)), 195.0, epsilon = 1e-2);
    }

    #[test]
    fn label_fits_on_path_leaving_through_the_left() {
        let mut space = tile();
        let text = "x".repeat(60);
        let path = [point(300.3, 200.7), point(-47.9, 33.1)];
        let id = space
            .place_path(&text, &path, &props(), None, &metrics())
            .unwrap();

        assert_approx_eq!(f32, polyline_length(&placed_path(&space, id)), 300.0, epsilon = 1e-2);
    }

    #[test]
    fn path_outside_the_tile_is_rejected() {
        let mut space = space();
        let path = [point(110.0, 10.0), point(190.0, 10.0)];
        assert_eq!(space.place_path("abcd", &path, &props(), None, &metrics()), None);
    }

    #[test]
    fn short_segments_break_runs() {
        let segments = [
            Segment { from: point(10.0, 50.0), to: point(30.0, 50.0) },
            Segment { from: point(30.0, 50.0), to: point(32.0, 50.0) },
            Segment { from: point(32.0, 50.0), to: point(62.0, 50.0) },
        ];
        let bounds = Box2D::new(point(0.0, 0.0), point(100.0, 100.0));

        // neither side of the 2px segment holds 35px on its own
        assert_eq!(text_path(&segments, 35.0, 45.0, 5.0, &bounds), None);
        let sub = text_path(&segments, 20.0, 45.0, 5.0, &bounds).unwrap();
        assert_points(&sub, &[point(10.0, 50.0), point(30.0, 50.0)]);
    }

    #[test]
    fn path_labels_collide_with_point_labels() {
        let mut space = space();
        let point_label = space
            .place_point("abcd", point(50.0, 50.0), &props(), None, None, &metrics())
            .unwrap();
        let path_label = space
            .place_path("abcd", &[point(10.0, 52.0), point(90.0, 52.0)], &props(), None, &metrics())
            .unwrap();

        assert!(!space.get(point_label).unwrap().visible);
        assert!(space.get(path_label).unwrap().visible);
    }

    proptest! {
        #[test]
        fn straight_sub_path_has_text_width(
            x0 in 0.0f32..30.0,
            x1 in 60.0f32..100.0,
            y in 10.0f32..90.0,
            chars in 1usize..10,
        ) {
            prop_assume!(chars as f32 * 5.0 <= x1 - x0);

            let text: std::string::String = "x".repeat(chars);
            let mut space = space();
            let id = space.place_path(&text, &[point(x0, y), point(x1, y)], &props(), None, &metrics());

            let id = id.unwrap();
            let placed = placed_path(&space, id);
            let width = chars as f32 * 5.0;
            prop_assert!((polyline_length(&placed) - width).abs() < 1e-3);
            prop_assert!(((placed[0].x + placed[1].x) / 2.0 - (x0 + x1) / 2.0).abs() < 1e-3);
        }
    }
}
