use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::Antialiasing;

#[derive(Parser, Debug)]
#[command(
    name = "typestorm",
    author,
    version,
    about = "Drive-driven generative typography visualizer",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Track analysis data file (JSON).
    #[arg(value_name = "DATA")]
    pub data: Option<PathBuf>,

    /// Title of the track to visualize; defaults to the first track.
    #[arg(long, value_name = "TITLE")]
    pub track: Option<String>,

    /// Text to render; defaults to the track title.
    #[arg(long, value_name = "STRING")]
    pub text: Option<String>,

    /// Use a prepared PNG mask instead of the built-in font.
    #[arg(long, value_name = "FILE", conflicts_with = "text")]
    pub text_mask: Option<PathBuf>,

    /// Effect parameter file (TOML); built-in defaults when omitted.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "1280x720")]
    pub size: (u32, u32),

    /// Optional FPS cap (0 = uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_antialias,
        default_value = "auto"
    )]
    pub antialias: Antialiasing,

    /// Disable drive normalization and use raw samples.
    #[arg(long)]
    pub raw: bool,

    /// Normalize against the series peak instead of the dead-zone floor.
    #[arg(long, conflicts_with = "raw")]
    pub peak: bool,

    /// Scrub the timeline with the pointer instead of the media clock.
    #[arg(long)]
    pub scrub: bool,

    /// Directory PNG exports are written into.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub export_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the track titles in a data file.
    Tracks(TracksArgs),
}

#[derive(Parser, Debug)]
pub struct TracksArgs {
    /// Track analysis data file (JSON).
    #[arg(value_name = "DATA")]
    pub data: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height".to_string())?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_variants() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size("640X480").unwrap(), (640, 480));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
    }

    #[test]
    fn parses_antialias_variants() {
        assert_eq!(parse_antialias("auto").unwrap(), Antialiasing::Auto);
        assert_eq!(parse_antialias("off").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("1").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("4").unwrap(), Antialiasing::Samples(4));
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias("").is_err());
    }

    #[test]
    fn cli_parses_a_full_invocation() {
        let cli = Cli::try_parse_from([
            "typestorm",
            "tracks.json",
            "--track",
            "CEILING",
            "--text",
            "TYPESTORM",
            "--size",
            "800x600",
            "--fps",
            "60",
            "--scrub",
        ])
        .expect("parse cli");
        assert_eq!(cli.run.data.as_deref(), Some(std::path::Path::new("tracks.json")));
        assert_eq!(cli.run.track.as_deref(), Some("CEILING"));
        assert_eq!(cli.run.size, (800, 600));
        assert_eq!(cli.run.fps, Some(60.0));
        assert!(cli.run.scrub);
        assert!(!cli.run.raw);
    }

    #[test]
    fn tracks_subcommand_parses() {
        let cli = Cli::try_parse_from(["typestorm", "tracks", "tracks.json"]).expect("parse cli");
        assert!(matches!(cli.command, Some(Command::Tracks(_))));
    }

    #[test]
    fn raw_and_peak_conflict() {
        assert!(Cli::try_parse_from(["typestorm", "tracks.json", "--raw", "--peak"]).is_err());
    }
}
