use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use image::{Rgba, RgbaImage};

use vr180::{PlayerConfig, PreviewConfig, SetupError, SyntheticMedia, init_logger, media};

/// Preview a side-by-side stereo frame in a simulated headset.
#[derive(Debug, Parser)]
#[command(name = "vr180", version, about)]
struct Args {
    /// Side-by-side image to play. A test pattern is used when omitted.
    source: Option<PathBuf>,

    /// Length of the simulated clip in seconds.
    #[arg(long, default_value_t = 120.0)]
    duration: f64,

    /// JSON file overriding player defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// TrueType font for the panel title.
    #[arg(long)]
    font: Option<PathBuf>,

    #[arg(long, default_value_t = 1600)]
    width: u32,

    #[arg(long, default_value_t = 800)]
    height: u32,
}

fn main() -> ExitCode {
    init_logger();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), SetupError> {
    let config = match &args.config {
        Some(path) => PlayerConfig::from_json_file(path)?,
        None => PlayerConfig::default(),
    };

    let (frame, title) = match &args.source {
        Some(path) => {
            if media::needs_transcode(path) {
                return Err(SetupError::NeedsTranscode(path.clone()));
            }
            let frame = image::open(path)
                .map_err(|source| SetupError::Image {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8();
            log::info!("loaded {} ({}x{})", path.display(), frame.width(), frame.height());
            (frame, media::title_from_path(path))
        }
        None => (test_pattern(2048, 1024), "test pattern".to_string()),
    };

    let mut preview = PreviewConfig::new()
        .title(format!("vr180 - {title}"))
        .size(args.width, args.height);
    if let Some(font) = args.font {
        preview = preview.font(font);
    }

    let media = SyntheticMedia::new(Some(frame), args.duration);
    vr180::run(config, preview, media, title)
}

/// Side-by-side grid with a red left half and a blue right half, so a wrong
/// eye mapping is obvious.
fn test_pattern(width: u32, height: u32) -> RgbaImage {
    let half = width / 2;
    RgbaImage::from_fn(width, height, |x, y| {
        let local_x = x % half.max(1);
        let line = local_x % 64 < 2 || y % 64 < 2;
        let shade = if line { 230 } else { 60 };
        if x < half {
            Rgba([shade, 40, 40, 255])
        } else {
            Rgba([40, 40, shade, 255])
        }
    })
}
