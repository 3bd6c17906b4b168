//! Binary entrypoint for the hex compositor.
//!
//! Decodes one image, lays it out around the supplied faces, composes a
//! treatment and writes the result as PNG.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use hex_compositor::Compositor;
use hex_compositor::config::TreatmentSelection;
use hex_compositor::faces::FaceData;
use hex_compositor::render::pipeline::create_hidpi_surface;
use hex_compositor::render::surface::SourceImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "hex-compositor", about = "Hexagon-masked face compositor")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Source photograph
    #[arg(short, long, value_name = "FILE")]
    image: PathBuf,

    /// Face-detection output (JSON)
    #[arg(short, long, value_name = "FILE")]
    faces: PathBuf,

    /// Where to write the composed PNG
    #[arg(short, long, value_name = "FILE", default_value = "composed.png")]
    output: PathBuf,

    /// Override the configured treatment selection (a name or `random`)
    #[arg(long, value_name = "NAME")]
    treatment: Option<String>,

    /// Seed for random treatment selection
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("hex_compositor={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = hex_compositor::config::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(name) = &cli.treatment {
        cfg.treatments.selection = serde_yaml::from_str::<TreatmentSelection>(name)
            .with_context(|| format!("parsing treatment override '{name}'"))?;
    }
    cfg.validate().context("validating configuration")?;

    let faces: FaceData = serde_json::from_str(
        &fs::read_to_string(&cli.faces)
            .with_context(|| format!("reading faces from {}", cli.faces.display()))?,
    )
    .with_context(|| format!("parsing faces from {}", cli.faces.display()))?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let (name, treatment) = cfg.treatments.select(&mut rng)?;
    let (name, treatment) = (name.to_string(), treatment.clone());
    info!(treatment = %name, "selected treatment");

    let surface = create_hidpi_surface(cfg.canvas.width, cfg.canvas.height, cfg.device_pixel_ratio)?;
    let mut compositor = Compositor::new(surface, cfg)?;

    let decoded = image::open(&cli.image)
        .map(|img| img.to_rgba8())
        .map_err(|err| hex_compositor::Error::ImageUnavailable(format!("{}: {err}", cli.image.display())))
        .and_then(|rgba| SourceImage::from_rgba_image(&rgba));

    let outcome = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&outcome);
    compositor.load_image(faces, decoded, move |result| {
        slot.borrow_mut().replace(result);
    });
    outcome
        .borrow_mut()
        .take()
        .context("image load did not report back")?
        .with_context(|| format!("laying out {}", cli.image.display()))?;

    compositor.compose(&treatment)?;

    let out = compositor.into_surface().to_rgba_image();
    out.save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!(path = %cli.output.display(), width = out.width(), height = out.height(), "wrote image");
    Ok(())
}
