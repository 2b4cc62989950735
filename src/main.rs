use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use tile_labels::{
    DEFAULT_TILE_SIZE, FixedMetrics, FontCollection, SpriteIndex, Style, TextMetrics,
    TileFeatures, render_tile,
};

/// Match tile features against a MapLibre style and place their labels
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a MapLibre style document
    style: PathBuf,
    /// Path to the tile features, grouped by source layer
    features: PathBuf,
    /// Zoom level the tile is rendered at
    #[arg(short, long, default_value_t = 14.0)]
    zoom: f32,
    /// Tile edge length in pixels
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: f32,
    /// Path to a MapLibre sprite index
    #[arg(long)]
    sprites: Option<PathBuf>,
    /// Write the draw list here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Measure text with fixed advances instead of the bundled fonts
    #[arg(long)]
    monospace: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut style = Style::open(&args.style)
        .with_context(|| format!("unable to load style {}", args.style.display()))?;
    if let Some(path) = args.sprites.as_ref() {
        let sprites = SpriteIndex::open(path)
            .with_context(|| format!("unable to load sprites {}", path.display()))?;
        style = style.with_sprites(sprites);
    }

    let features: TileFeatures = {
        let file = std::fs::File::open(&args.features)
            .with_context(|| format!("unable to open features {}", args.features.display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("unable to parse features {}", args.features.display()))?
    };

    let metrics: Box<dyn TextMetrics> = if args.monospace {
        Box::new(FixedMetrics::default())
    } else {
        let fonts = FontCollection::new()?;
        for layer in style.layers() {
            fonts.check_families(layer.layout.text_font());
        }
        Box::new(fonts)
    };

    let list = render_tile(&style, &features, args.zoom, args.tile_size, metrics.as_ref());
    info!(
        "rendered {} paths and {} labels ({} visible)",
        list.paths.len(),
        list.labels.len(),
        list.labels.iter().filter(|l| l.visible).count()
    );

    match args.output.as_ref() {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("unable to create {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &list)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &list)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}
