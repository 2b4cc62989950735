use log::debug;
use lyon::math::{Box2D, Point, Size, point};
use smallvec::SmallVec;

use super::{
    Icon, LabelGeometry, LabelId, LabelShape, LabelSpace, PlacedIcon, PlacedLabel, TextProperties,
};
use crate::style::Pen;
use crate::text::{TextBlock, TextMetrics, wrap_text};

impl LabelSpace {
    /// Places wrapped text at `anchor`, or below `icon` when one is given.
    ///
    /// Returns `None` when there is nothing to draw, when the anchor lies
    /// outside the space or when the label would not fit inside it.
    pub fn place_point<M: TextMetrics + ?Sized>(
        &mut self,
        text: &str,
        anchor: Point,
        props: &TextProperties,
        pen: Option<Pen>,
        icon: Option<Icon>,
        metrics: &M,
    ) -> Option<LabelId> {
        let text = text.trim();
        if text.is_empty() && icon.is_none() {
            return None;
        }

        if !self.contains_point(anchor) {
            debug!("label '{}' anchored outside of tile at {:?}", text, anchor);
            return None;
        }

        let block = if text.is_empty() {
            TextBlock {
                lines: SmallVec::new(),
                line_height: metrics.line_height(&props.font),
                size: Size::zero(),
            }
        } else {
            let limit = props.font.size * props.max_width;
            wrap_text(metrics, &props.font, text, limit)
        };

        let (rect, icon) = match icon {
            Some(icon) => {
                let icon_rect = centered(anchor, icon.size);
                let origin = point(anchor.x - block.size.width / 2.0, icon_rect.max.y);
                let rect = Box2D::from_origin_and_size(origin, block.size);
                let placed = PlacedIcon {
                    name: icon.name,
                    rect: icon_rect,
                };
                (rect, Some(placed))
            }
            None => {
                let origin = anchor + props.anchor.offset(block.size);
                (Box2D::from_origin_and_size(origin, block.size), None)
            }
        };

        let footprint = match (&icon, block.lines.is_empty()) {
            (Some(icon), true) => icon.rect,
            (Some(icon), false) => icon.rect.union(&rect),
            (None, _) => rect,
        };

        if !self.contains_box(&footprint) {
            debug!("label '{}' does not fit inside the tile", text);
            return None;
        }

        let label = PlacedLabel {
            text: text.into(),
            font: props.font.clone(),
            pen,
            visible: true,
            geometry: LabelGeometry::Point { rect, block, icon },
            shape: LabelShape::from_box(footprint),
        };

        Some(self.insert(label))
    }
}

fn centered(center: Point, size: Size) -> Box2D {
    let half = size.to_vector() / 2.0;
    Box2D::new(center - half, center + half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextAnchor;
    use crate::text::{FixedMetrics, Font};

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

    fn rect(space: &LabelSpace, id: LabelId) -> Box2D {
        match space.get(id).map(|l| &l.geometry) {
            Some(LabelGeometry::Point { rect, .. }) => *rect,
            other => panic!("expected a point label, got {:?}", other),
        }
    }

    #[test]
    fn box_is_centered_on_anchor() {
        let mut space = space();
        let id = space
            .place_point("abcd", point(50.0, 50.0), &props(), None, None, &metrics())
            .unwrap();

        assert_eq!(rect(&space, id), Box2D::new(point(40.0, 45.0), point(60.0, 55.0)));
        assert!(space.get(id).unwrap().visible);
    }

    #[test]
    fn anchor_kind_moves_the_box() {
        let mut space = space();
        let props = TextProperties {
            anchor: TextAnchor::TopLeft,
            ..props()
        };
        let id = space
            .place_point("abcd", point(50.0, 50.0), &props, None, None, &metrics())
            .unwrap();

        assert_eq!(rect(&space, id), Box2D::new(point(50.0, 50.0), point(70.0, 60.0)));
    }

    #[test]
    fn new_label_hides_overlapping_ones() {
        let mut space = space();
        let a = space
            .place_point("abcd", point(50.0, 50.0), &props(), None, None, &metrics())
            .unwrap();
        let b = space
            .place_point("abcd", point(55.0, 50.0), &props(), None, None, &metrics())
            .unwrap();

        assert_eq!(space.len(), 2);
        assert!(!space.get(a).unwrap().visible);
        assert!(space.get(b).unwrap().visible);
        assert_eq!(space.visible().count(), 1);
    }

    #[test]
    fn overlapping_a_hidden_label_keeps_it_hidden() {
        let mut space = space();
        let a = space
            .place_point("abcd", point(30.0, 50.0), &props(), None, None, &metrics())
            .unwrap();
        // hides a
        space
            .place_point("abcd", point(40.0, 50.0), &props(), None, None, &metrics())
            .unwrap();
        // overlaps only a, which is already hidden, and stays visible itself
        let c = space
            .place_point("ab", point(25.0, 50.0), &props(), None, None, &metrics())
            .unwrap();

        assert!(!space.get(a).unwrap().visible);
        assert!(space.get(c).unwrap().visible);
    }

    #[test]
    fn placement_is_repeatable() {
        let place = || {
            let mut space = space();
            let id = space
                .place_point("Main Street", point(50.0, 50.0), &props(), None, None, &metrics())
                .unwrap();
            space.get(id).unwrap().shape.clone()
        };

        assert_eq!(place(), place());
    }

    #[test]
    fn rejects_empty_text_and_outside_anchor() {
        let mut space = space();
        assert_eq!(
            space.place_point("  ", point(50.0, 50.0), &props(), None, None, &metrics()),
            None
        );
        assert_eq!(
            space.place_point("abcd", point(150.0, 50.0), &props(), None, None, &metrics()),
            None
        );
        assert!(space.is_empty());
    }

    #[test]
    fn rejects_boxes_crossing_the_edge() {
        let mut space = space();
        assert_eq!(
            space.place_point("abcd", point(5.0, 50.0), &props(), None, None, &metrics()),
            None
        );
        // touching the edge is inside
        assert!(space
            .place_point("abcd", point(10.0, 50.0), &props(), None, None, &metrics())
            .is_some());
    }

    #[test]
    fn long_text_wraps_to_max_width() {
        let mut space = space();
        let props = TextProperties {
            max_width: 4.0,
            ..props()
        };
        let id = space
            .place_point("North Main Street", point(50.0, 50.0), &props, None, None, &metrics())
            .unwrap();

        assert_eq!(rect(&space, id).size(), Size::new(30.0, 30.0));
    }

    #[test]
    fn icon_sits_on_anchor_with_text_below() {
        let mut space = space();
        let icon = Icon {
            name: "bus".into(),
            size: Size::new(10.0, 10.0),
        };
        let id = space
            .place_point("ab", point(50.0, 50.0), &props(), None, Some(icon), &metrics())
            .unwrap();

        let label = space.get(id).unwrap();
        match &label.geometry {
            LabelGeometry::Point { rect, icon, .. } => {
                let icon = icon.as_ref().unwrap();
                assert_eq!(icon.rect, Box2D::new(point(45.0, 45.0), point(55.0, 55.0)));
                assert_eq!(*rect, Box2D::new(point(45.0, 55.0), point(55.0, 65.0)));
            }
            other => panic!("expected a point label, got {:?}", other),
        }
        assert_eq!(
            label.shape.bounds(),
            &Box2D::new(point(45.0, 45.0), point(55.0, 65.0))
        );
    }
}
