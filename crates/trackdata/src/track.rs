use std::path::Path;

use serde::Deserialize;

use crate::TrackDataError;

/// Top-level shape of an analysis data file.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackSet {
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub title: String,
    /// Track length in seconds.
    pub duration: f64,
    pub frames: FrameSeries,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameSeries {
    /// Raw per-frame drive samples, one per analysis hop. Unbounded
    /// non-negative floats; normalization happens downstream.
    pub aggression: Vec<f32>,
}

impl TrackSet {
    /// Loads and validates a track data file. Any failure here is fatal
    /// for the caller: there is nothing to visualize without a series.
    pub fn load(path: &Path) -> Result<Self, TrackDataError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TrackDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let set: TrackSet =
            serde_json::from_str(&raw).map_err(|source| TrackDataError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let problems = set.validate();
        if !problems.is_empty() {
            return Err(TrackDataError::Invalid(problems.join("; ")));
        }

        tracing::debug!(
            path = %path.display(),
            tracks = set.tracks.len(),
            "loaded track data"
        );
        Ok(set)
    }

    /// Collects structural problems without short-circuiting so a bad
    /// file reports everything wrong with it at once.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.tracks.is_empty() {
            problems.push("data file contains no tracks".to_string());
        }
        for track in &self.tracks {
            if track.title.trim().is_empty() {
                problems.push("track with empty title".to_string());
            }
            if track.duration <= 0.0 {
                problems.push(format!(
                    "track '{}' has non-positive duration {}",
                    track.title, track.duration
                ));
            }
            if track.frames.aggression.is_empty() {
                problems.push(format!("track '{}' has an empty aggression series", track.title));
            }
            if track
                .frames
                .aggression
                .iter()
                .any(|value| !value.is_finite())
            {
                problems.push(format!(
                    "track '{}' contains non-finite aggression samples",
                    track.title
                ));
            }
        }
        problems
    }

    /// Looks up a track by title. Unknown titles are an error that lists
    /// what the file actually contains.
    pub fn find(&self, title: &str) -> Result<&Track, TrackDataError> {
        self.tracks
            .iter()
            .find(|track| track.title == title)
            .ok_or_else(|| TrackDataError::UnknownTrack {
                title: title.to_string(),
                available: self.titles().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|track| track.title.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "tracks": [
            {
                "title": "CEILING",
                "duration": 241.5,
                "frames": { "aggression": [0.0, 0.4, 1.2, 0.8] }
            },
            {
                "title": "UNDERTOW",
                "duration": 188.0,
                "frames": { "aggression": [0.2, 0.9] }
            }
        ]
    }"#;

    #[test]
    fn parses_sample_data() {
        let set: TrackSet = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(set.tracks.len(), 2);
        assert_eq!(set.tracks[0].title, "CEILING");
        assert_eq!(set.tracks[0].frames.aggression.len(), 4);
        assert!(set.validate().is_empty());
    }

    #[test]
    fn load_round_trips_through_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let set = TrackSet::load(file.path()).unwrap();
        assert_eq!(set.tracks[1].title, "UNDERTOW");
    }

    #[test]
    fn load_fails_on_missing_file() {
        let err = TrackSet::load(Path::new("/nonexistent/tracks.json")).unwrap_err();
        assert!(matches!(err, TrackDataError::Io { .. }));
    }

    #[test]
    fn load_fails_on_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = TrackSet::load(file.path()).unwrap_err();
        assert!(matches!(err, TrackDataError::Parse { .. }));
    }

    #[test]
    fn validation_catches_structural_problems() {
        let set: TrackSet = serde_json::from_str(
            r#"{
                "tracks": [
                    { "title": "", "duration": 0.0, "frames": { "aggression": [] } }
                ]
            }"#,
        )
        .unwrap();
        let problems = set.validate();
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn empty_track_list_is_invalid() {
        let set: TrackSet = serde_json::from_str(r#"{ "tracks": [] }"#).unwrap();
        assert_eq!(set.validate(), vec!["data file contains no tracks".to_string()]);
    }

    #[test]
    fn unknown_title_lists_available_tracks() {
        let set: TrackSet = serde_json::from_str(SAMPLE).unwrap();
        let err = set.find("MISSING").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("MISSING"));
        assert!(message.contains("CEILING"));
        assert!(message.contains("UNDERTOW"));
    }
}
