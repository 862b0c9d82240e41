use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use christmas_glow::prelude::*;
use christmas_glow::DEFAULT_MESSAGE;

// ------------------------- CLI -------------------------

#[derive(Parser)]
#[command(name = "christmas-glow")]
#[command(about = "Render a particle Christmas tree as a greeting card")]
struct Args {
    /// Tree configuration (.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory cards are written to
    #[arg(short, long, default_value = "cards")]
    out: PathBuf,

    /// Which card to export
    #[arg(short, long, value_enum, default_value_t = CardKind::Both)]
    kind: CardKind,

    /// View width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// View height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Seed for a reproducible tree
    #[arg(long)]
    seed: Option<u64>,

    /// Pointer position in pixels, e.g. `640,360`
    #[arg(long, value_parser = parse_pointer)]
    pointer: Option<(f32, f32)>,

    /// Card title
    #[arg(short, long, default_value = DEFAULT_MESSAGE)]
    message: String,

    /// Seconds the tree spends forming before the export starts
    #[arg(long, default_value_t = 2.0)]
    warmup: f32,

    /// Leave the snowfall out
    #[arg(long)]
    no_snow: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CardKind {
    Still,
    Animated,
    Both,
}

fn parse_pointer(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let x = x.trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f32>().map_err(|e| e.to_string())?;
    Ok((x, y))
}

// ------------------------- Main -------------------------

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TreeConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => TreeConfig::default(),
    };
    config.validate().context("invalid tree configuration")?;

    let backend = SoftwareBackend::new(args.width, args.height).with_pixel_ratio(1.0, 1.0);
    let seed = args.seed.unwrap_or_else(rand_seed);
    let mut scene = TreeScene::with_seed(config, backend, seed, 1.0 / 60.0);
    if args.no_snow {
        scene = scene.without_snow();
    }
    if let Some((x, y)) = args.pointer {
        scene.set_pointer(Pointer::from_pixels(x, y, args.width, args.height));
    }

    info!(seed, width = args.width, height = args.height, "tree ready");
    scene.set_formed(true);
    scene.wait(Duration::from_secs_f32(args.warmup.max(0.0)));

    let mut exporter = CardExporter::new(NeuQuantizer::default(), GifSink::new());
    let mut progress = ConsoleProgress::default();
    let mut sink = DirectorySink::new(&args.out);

    let kinds: &[ExportKind] = match args.kind {
        CardKind::Still => &[ExportKind::Still],
        CardKind::Animated => &[ExportKind::Animated],
        CardKind::Both => &[ExportKind::Still, ExportKind::Animated],
    };
    for &kind in kinds {
        let request = ExportRequest::new(kind).with_message(args.message.clone());
        exporter
            .export(&mut scene, &mut progress, &mut sink, &request)
            .with_context(|| format!("exporting {kind:?} card"))?;
    }

    for path in sink.written() {
        println!("{}", path.display());
    }
    Ok(())
}

fn rand_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Logs progress every tenth of the way.
#[derive(Default)]
struct ConsoleProgress {
    last_decile: Option<u8>,
}

impl ProgressSink for ConsoleProgress {
    fn report(&mut self, progress: Option<u8>) {
        match progress {
            Some(p) => {
                let decile = p / 10;
                if self.last_decile != Some(decile) {
                    self.last_decile = Some(decile);
                    info!("recording {p}%");
                }
            }
            None => self.last_decile = None,
        }
    }
}
