use std::sync::Arc;

use lyon::math::point;
use tile_labels::label::LabelGeometry;
use tile_labels::{
    Feature, FixedMetrics, Geometry, Sprite, SpriteIndex, Style, Tags, TileFeatures, Value,
    render_tile,
};

const STYLE: &str = r##"{
    "version": 8,
    "name": "test",
    "sources": {"osm": {"type": "vector"}},
    "layers": [
        {"id": "background", "type": "background", "paint": {"background-color": "#f8f4f0"}},
        {
            "id": "park",
            "type": "fill",
            "source-layer": "landuse",
            "filter": ["==", "class", "park"],
            "paint": {"fill-color": "#d8e8c8", "fill-outline-color": "#a0c080"}
        },
        {
            "id": "roads",
            "type": "line",
            "source-layer": "transportation",
            "filter": ["in", "class", "primary", "secondary"],
            "layout": {"line-cap": "round"},
            "paint": {
                "line-color": "#ffffff",
                "line-width": {"base": 1.2, "stops": [[10, 1], [18, 12]]}
            }
        },
        {
            "id": "road-names",
            "type": "symbol",
            "source-layer": "transportation",
            "minzoom": 13,
            "filter": ["has", "name"],
            "layout": {
                "symbol-placement": "line",
                "text-field": "{name}",
                "text-size": 10,
                "text-font": ["Noto Sans Regular"]
            },
            "paint": {"text-color": "#333"}
        },
        {
            "id": "pois",
            "type": "symbol",
            "source-layer": "poi",
            "layout": {"text-field": "{name}", "icon-image": "{class}", "text-size": 10},
            "paint": {"text-color": "#000"}
        },
        {
            "id": "places",
            "type": "symbol",
            "source-layer": "place",
            "layout": {"text-field": "{name}", "text-transform": "uppercase", "text-size": 10}
        }
    ]
}"##;

fn tags<const N: usize>(pairs: [(&str, Value); N]) -> Tags {
    pairs.into_iter().collect()
}

fn features() -> TileFeatures {
    let mut features = TileFeatures::new();

    features.push(
        "landuse",
        Feature::new(
            Geometry::polygon([
                point(10.0, 10.0),
                point(60.0, 10.0),
                point(60.0, 60.0),
                point(10.0, 10.0),
            ]),
            tags([("class", "park".into())]),
        ),
    );
    features.push(
        "landuse",
        Feature::new(
            Geometry::polygon([point(0.0, 0.0), point(5.0, 0.0), point(5.0, 5.0)]),
            tags([("class", "cemetery".into())]),
        ),
    );
    features.push(
        "transportation",
        Feature::new(
            Geometry::line([point(20.0, 200.0), point(300.0, 200.0)]),
            tags([("class", "primary".into()), ("name", "Jasper Avenue".into())]),
        ),
    );
    features.push(
        "transportation",
        Feature::new(
            Geometry::line([point(20.0, 300.0), point(300.0, 300.0)]),
            tags([("class", "path".into())]),
        ),
    );
    features.push(
        "poi",
        Feature::new(
            Geometry::point(point(400.0, 400.0)),
            tags([("class", "bus".into()), ("name", "Central".into())]),
        ),
    );
    features.push(
        "place",
        Feature::new(
            Geometry::point(point(160.0, 202.0)),
            tags([("name", "Downtown".into())]),
        ),
    );

    features
}

fn sprites() -> SpriteIndex {
    let mut sprites = SpriteIndex::new();
    sprites.insert(
        "bus",
        Sprite {
            x: 0,
            y: 0,
            width: 24,
            height: 24,
            pixel_ratio: 2.0,
        },
    );
    sprites
}

#[test]
fn renders_a_tile_in_layer_order() {
    let style: Style = STYLE.parse().unwrap();
    let style = style.with_sprites(sprites());
    let metrics = FixedMetrics {
        advance: 0.5,
        line_height: 1.0,
    };

    let list = render_tile(&style, &features(), 14.0, 512.0, &metrics);

    assert!(list.background.is_some());

    // the park and the primary road, the cemetery and the path are filtered out
    assert_eq!(list.paths.len(), 2);
    assert!(list.paths[0].closed);
    assert!(list.paths[0].painter.brush.is_some());
    let road = &list.paths[1];
    assert!(!road.closed);
    let pen = road.painter.pen.as_ref().unwrap();
    assert!(pen.width > 1.0 && pen.width < 12.0);

    let texts: Vec<&str> = list.labels.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, ["Jasper Avenue", "Central", "DOWNTOWN"]);

    // the place label lands on the road name and wins
    assert!(!list.labels[0].visible);
    assert!(list.labels[1].visible);
    assert!(list.labels[2].visible);

    match &list.labels[0].geometry {
        LabelGeometry::Path { path, glyphs } => {
            assert_eq!(glyphs.len(), "Jasper Avenue".chars().count());
            assert_eq!(path.first().map(|p| p.y), Some(200.0));
        }
        other => panic!("expected a path label, got {:?}", other),
    }

    match &list.labels[1].geometry {
        LabelGeometry::Point { icon, rect, .. } => {
            let icon = icon.as_ref().unwrap();
            assert_eq!(icon.name.as_str(), "bus");
            assert_eq!(icon.rect.size().width, 12.0);
            assert_eq!(rect.min.y, icon.rect.max.y);
        }
        other => panic!("expected a point label, got {:?}", other),
    }
}

#[test]
fn zoom_hides_layers_outside_their_range() {
    let style: Style = STYLE.parse().unwrap();
    let list = render_tile(&style, &features(), 12.0, 512.0, &FixedMetrics::default());

    let texts: Vec<&str> = list.labels.iter().map(|l| l.text.as_str()).collect();
    assert!(!texts.contains(&"Jasper Avenue"));
    // without a sprite index the icon is dropped and the text stands alone
    assert!(texts.contains(&"Central"));
}

#[test]
fn draw_list_serializes_to_json() {
    let style: Style = STYLE.parse().unwrap();
    let list = render_tile(&style, &features(), 14.0, 512.0, &FixedMetrics::default());

    let json = serde_json::to_value(&list).unwrap();
    assert_eq!(json["size"], 512.0);
    assert_eq!(json["labels"][0]["kind"], "path");
    assert!(json["paths"][0]["parts"][0].is_array());
}

#[test]
fn style_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Style>();

    let style = Arc::new(STYLE.parse::<Style>().unwrap());
    let features = Arc::new(features());

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let style = Arc::clone(&style);
            let features = Arc::clone(&features);
            std::thread::spawn(move || {
                render_tile(&style, &features, 14.0, 512.0, &FixedMetrics::default())
                    .labels
                    .len()
            })
        })
        .collect();

    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counts[0], counts[1]);
}
