//! Track analysis data: loading, validation, and drive-signal shaping.
//!
//! A track file is a JSON document produced by an offline audio analysis
//! pass. Each track carries a per-frame `aggression` series that the
//! renderer turns into effect intensities. This crate owns the series
//! transformations (normalization, smoothing, per-track scaling) and the
//! time-to-index mapping; it knows nothing about the GPU.

mod drive;
mod track;

use std::path::PathBuf;

use thiserror::Error;

pub use drive::{
    sample_index, DriveSeries, NormalizeMode, DEAD_ZONE_THRESHOLD, DEFAULT_SMOOTHING_WINDOW,
};
pub use track::{FrameSeries, Track, TrackSet};

#[derive(Debug, Error)]
pub enum TrackDataError {
    #[error("failed to read track data at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse track data at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid track data: {0}")]
    Invalid(String),
    #[error("no track titled '{title}' in data file; available tracks: {available}")]
    UnknownTrack { title: String, available: String },
}
