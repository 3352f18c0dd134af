use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use playback::PlayheadSource;
use renderer::{Renderer, RendererConfig, TextSource};
use trackdata::{DriveSeries, NormalizeMode, TrackSet};
use vizconfig::EffectConfig;

use crate::cli::RunArgs;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn list_tracks(data: &Path) -> Result<()> {
    let set = TrackSet::load(data)?;
    for track in &set.tracks {
        println!(
            "{:<32} {:>8.1}s  {} samples",
            track.title,
            track.duration,
            track.frames.aggression.len()
        );
    }
    Ok(())
}

pub fn run(mut args: RunArgs) -> Result<()> {
    let data = args
        .data
        .take()
        .ok_or_else(|| anyhow!("a track data file is required; see --help"))?;

    let params = match &args.config {
        Some(path) => EffectConfig::load(path)
            .with_context(|| format!("failed to load effect config {}", path.display()))?,
        None => EffectConfig::default(),
    };

    let set = TrackSet::load(&data)?;
    let track = match &args.track {
        Some(title) => set.find(title)?,
        None => set
            .tracks
            .first()
            .ok_or_else(|| anyhow!("data file contains no tracks"))?,
    };
    tracing::info!(
        title = %track.title,
        duration = track.duration,
        samples = track.frames.aggression.len(),
        "selected track"
    );

    let drive = shape_drive(track, &params, &args);

    let text = match &args.text_mask {
        Some(path) => TextSource::MaskPng(path.clone()),
        None => TextSource::Label(
            args.text
                .clone()
                .unwrap_or_else(|| track.title.clone()),
        ),
    };

    let playhead = if args.scrub {
        PlayheadSource::Pointer
    } else {
        PlayheadSource::Clock
    };

    let config = RendererConfig {
        surface_size: args.size,
        text,
        drive,
        duration: track.duration,
        params,
        antialiasing: args.antialias,
        target_fps: args.fps.filter(|fps| *fps > 0.0),
        playhead,
        export_dir: args.export_dir,
    };

    Renderer::new(config).run()
}

/// Applies the shaping pipeline to a track's raw aggression series:
/// normalize, per-track scale, then adaptive smoothing.
fn shape_drive(track: &trackdata::Track, params: &EffectConfig, args: &RunArgs) -> Vec<f32> {
    let mode = if args.raw || !params.normalize {
        NormalizeMode::Raw
    } else if args.peak {
        NormalizeMode::Peak
    } else {
        NormalizeMode::DeadZone
    };

    let mut series = DriveSeries::new(track.frames.aggression.clone()).normalized(mode);

    let scale = params.scale_for(&track.title);
    if scale != 1.0 {
        tracing::debug!(title = %track.title, scale, "applying per-track scale");
        series = series.scaled(scale);
    }

    if params.smoothing_window > 0 {
        series = series.smoothed(params.smoothing_window);
    }

    series.into_samples()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackdata::{FrameSeries, Track};

    fn test_track() -> Track {
        Track {
            title: "TEST".to_string(),
            duration: 120.0,
            frames: FrameSeries {
                aggression: vec![0.0, 0.5, 1.0, 2.0],
            },
        }
    }

    fn base_args() -> RunArgs {
        use clap::Parser;
        RunArgs::parse_from(["typestorm", "tracks.json"])
    }

    #[test]
    fn raw_flag_bypasses_normalization() {
        let track = test_track();
        let mut params = EffectConfig::default();
        params.smoothing_window = 0;
        let mut args = base_args();
        args.raw = true;
        let drive = shape_drive(&track, &params, &args);
        // Raw mode clamps but never rescales.
        assert_eq!(drive, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn peak_flag_scales_by_the_maximum() {
        let track = test_track();
        let mut params = EffectConfig::default();
        params.smoothing_window = 0;
        let mut args = base_args();
        args.peak = true;
        let drive = shape_drive(&track, &params, &args);
        assert_eq!(drive, vec![0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn args_stay_usable_after_the_data_path_is_taken() {
        // run() takes the data path out of the arguments and keeps using
        // the remaining flags for shaping.
        let track = test_track();
        let mut params = EffectConfig::default();
        params.smoothing_window = 0;
        let mut args = base_args();
        args.raw = true;
        let data = args.data.take().expect("positional data argument");
        assert_eq!(data, std::path::PathBuf::from("tracks.json"));
        let drive = shape_drive(&track, &params, &args);
        assert_eq!(drive, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn per_track_scale_is_applied() {
        let track = test_track();
        let mut params = EffectConfig::default();
        params.smoothing_window = 0;
        params
            .scales
            .insert("TEST".to_string(), 0.5);
        let mut args = base_args();
        args.peak = true;
        let drive = shape_drive(&track, &params, &args);
        assert_eq!(drive, vec![0.0, 0.125, 0.25, 0.5]);
    }
}
