use anyhow::Context;
use pitchflow::video::read_video;
use pitchflow::{cache, Pipeline, PipelineConfig, Tracks};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let video = args.next().context("expected video file name")?;
    let tracks_file = args.next().context("expected tracks json file")?;
    let config = match args.next() {
        Some(path) => PipelineConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => PipelineConfig::default(),
    };

    let frames = read_video(&video)?;
    // loading the json stands in for running the detector and tracker
    let tracks = cache::cached(config.cache.tracks.as_ref(), || Tracks::load(&tracks_file))?;
    tracing::info!(provenance = ?tracks.provenance, "tracks ready");

    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(&frames, tracks.value)?;

    let last_share = output.shares.iter().rev().flatten().next();
    let report = serde_json::json!({
        "frames": output.possession.len(),
        "camera_provenance": output.camera_provenance,
        "moving_frames": output.camera_movement.iter().filter(|m| !m.is_zero()).count(),
        "possession": output.possession,
        "team_possession": output.team_possession,
        "final_share": last_share,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
