//! Render one textual snapshot of a configured sky scene.
//!
//! Loads a scene config, optionally overrides time, projection or field
//! of view from the command line, and prints where every body lands in
//! the viewport.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use skysim::{ProjectionKind, Scene, SimConfig};

#[derive(Parser)]
#[command(name = "sky_snapshot", about = "Project the configured sky onto a viewport")]
struct Args {
    /// Scene configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the simulated Julian day
    #[arg(long)]
    jd: Option<f64>,

    /// Override the projection mapping
    #[arg(long, value_enum)]
    projection: Option<ProjectionKind>,

    /// Override the field of view, degrees
    #[arg(long)]
    fov: Option<f64>,

    /// Override the observer latitude, degrees north
    #[arg(long)]
    lat: Option<f64>,

    /// Override the observer longitude, degrees east
    #[arg(long)]
    lon: Option<f64>,

    /// Additional satellite catalog (JSON) to load into the scene
    #[arg(long)]
    tle_file: Option<PathBuf>,

    /// Simulated seconds to step before taking the snapshot
    #[arg(long, default_value_t = 0.0)]
    advance: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = SimConfig::from_path(&args.config)?;
    if let Some(projection) = args.projection {
        config.view.projection = projection;
    }
    if let Some(fov) = args.fov {
        config.view.fov_deg = fov;
    }
    if let Some(jd) = args.jd {
        config.time.start_jd = Some(jd);
    }
    if let Some(lat) = args.lat {
        config.observer.latitude_deg = lat;
    }
    if let Some(lon) = args.lon {
        config.observer.longitude_deg = lon;
    }

    let mut scene = Scene::from_config(&config)?;
    if let Some(path) = &args.tle_file {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading satellite catalog {}", path.display()))?;
        let added = scene.load_satellites(&json)?;
        log::info!("loaded {added} satellites from {}", path.display());
    }
    if args.advance != 0.0 {
        scene.clock_mut().step_seconds(args.advance);
    }

    let entries = scene.snapshot();
    println!(
        "jd {:.6}  fov {:.1} deg  {} bodies",
        scene.clock().jd(),
        scene.projector().fov_deg(),
        entries.len()
    );
    println!(
        "{:<24} {:>9} {:>8} {:>9} {:>9} {:>6}  placement",
        "name", "az", "alt", "x", "y", "mag"
    );
    for entry in &entries {
        let mag = entry
            .magnitude
            .map_or_else(|| "-".to_owned(), |m| format!("{m:.1}"));
        let placement = if entry.on_screen {
            "on-screen"
        } else if entry.valid {
            "off-screen"
        } else {
            "out-of-zone"
        };
        println!(
            "{:<24} {:9.3} {:8.3} {:9.1} {:9.1} {:>6}  {placement}",
            entry.name,
            entry.azimuth_deg,
            entry.altitude_deg,
            entry.window.x,
            entry.window.y,
            mag
        );
    }
    Ok(())
}
