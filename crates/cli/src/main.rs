use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use faceveil_core::detection::domain::face_detector::FaceDetector;
use faceveil_core::detection::infrastructure::execution_provider::ExecutionBackend;
use faceveil_core::detection::infrastructure::model_resolver;
use faceveil_core::detection::infrastructure::onnx_centerface_detector::OnnxCenterfaceDetector;
use faceveil_core::pipeline::batch_driver::{classify, BatchConfig, BatchDriver, MediaKind};
use faceveil_core::pipeline::item_error::ItemError;
use faceveil_core::pipeline::stream_job::{derived_output_path, InputTarget, StreamJob};
use faceveil_core::pipeline::stream_processor::{CancelFlag, StreamProcessor};
use faceveil_core::redaction::region_redactor::RedactionMode;
use faceveil_core::shared::constants::{CENTERFACE_MODEL_NAME, CENTERFACE_MODEL_URL};
use faceveil_core::video::domain::frame_source::FrameSource;
use faceveil_core::video::domain::preview_window::PreviewWindow;
use faceveil_core::video::domain::video_writer::VideoWriter;
use faceveil_core::video::infrastructure::ffmpeg_video_source::FfmpegVideoSource;
use faceveil_core::video::infrastructure::ffmpeg_video_writer::FfmpegVideoWriter;
use faceveil_core::video::infrastructure::image_file_source::ImageFileSource;
use faceveil_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Video anonymization by face detection.
#[derive(Parser)]
#[command(name = "faceveil")]
struct Cli {
    /// Video/image/directory path, or camera device (`<videoN>`).
    #[arg(default_value = "<video0>")]
    input: String,

    /// Output file name (defaults to the input path with an
    /// "_anonymized" suffix).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Detection threshold (tune to trade off false positives against
    /// false negatives).
    #[arg(short = 't', long = "thresh", default_value = "0.2")]
    threshold: f32,

    /// Downscale frames for network inference to this size (format: WxH,
    /// example: 640x360).
    #[arg(short, long, value_name = "WxH")]
    scale: Option<String>,

    /// Disable the preview window. Only applies to single video or
    /// camera input; batch mode never previews.
    #[arg(short = 'q', long)]
    disable_gui: bool,

    /// Draw detection numbers and scores into the output.
    #[arg(short = 'e', long)]
    enable_enum: bool,

    /// Use filled boxes instead of ellipse masks.
    #[arg(long)]
    enable_boxes: bool,

    /// Scale factor for face masks, to make sure that masks cover the
    /// complete face.
    #[arg(long, default_value = "1.3")]
    mask_scale: f32,

    /// Anonymization filter mode for face regions: solid, blur or none.
    #[arg(long, default_value = "blur")]
    replacewith: String,

    /// Detector execution backend: auto, accelerated or reference.
    #[arg(long, default_value = "auto")]
    backend: String,

    /// Filter by file extension. Only applies if the input is a
    /// directory; `*` matches everything.
    #[arg(long, default_value = "*")]
    ext: String,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mode = parse_mode(&cli.replacewith)?;
    let backend = parse_backend(&cli.backend)?;
    let scale = cli.scale.as_deref().map(parse_scale).transpose()?;

    let cancelled: CancelFlag = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        ctrlc::set_handler(move || cancelled.store(true, Ordering::Relaxed))?;
    }

    let mut detector = build_detector(scale, backend)?;

    if let Some(index) = parse_camera_index(&cli.input) {
        return run_camera(&cli, mode, index, detector.as_mut(), cancelled);
    }

    let input = PathBuf::from(&cli.input);
    if input.is_dir() {
        return run_batch(&cli, mode, &input, detector.as_mut(), cancelled);
    }
    if !input.is_file() {
        return Err(format!("{} not found", input.display()).into());
    }

    match classify(&input) {
        MediaKind::Image => run_image(&cli, mode, input, detector.as_mut(), cancelled),
        MediaKind::Video => run_video(&cli, mode, input, detector.as_mut(), cancelled),
        MediaKind::Unknown => Err(ItemError::UnknownContentType(input).into()),
    }
}

fn base_job(cli: &Cli, mode: RedactionMode, input: InputTarget) -> StreamJob {
    StreamJob {
        input,
        output: None,
        threshold: cli.threshold,
        mode,
        mask_scale: cli.mask_scale,
        ellipse: !cli.enable_boxes,
        annotate: cli.enable_enum,
        preview: false,
        nested: false,
    }
}

fn run_image(
    cli: &Cli,
    mode: RedactionMode,
    input: PathBuf,
    detector: &mut dyn FaceDetector,
    cancelled: CancelFlag,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| derived_output_path(&input));
    let mut job = base_job(cli, mode, InputTarget::ImageFile(input.clone()));
    job.output = Some(output.clone());

    let mut source = ImageFileSource::new(&input);
    let writer = ImageFileWriter::new();

    let mut processor = StreamProcessor::new(detector, cancelled);
    processor.process_image(&job, &mut source, &writer, &output)?;
    log::info!("Output saved to {}", output.display());
    Ok(())
}

fn run_video(
    cli: &Cli,
    mode: RedactionMode,
    input: PathBuf,
    detector: &mut dyn FaceDetector,
    cancelled: CancelFlag,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| derived_output_path(&input));
    let mut job = base_job(cli, mode, InputTarget::VideoFile(input.clone()));
    job.output = Some(output.clone());
    job.preview = !cli.disable_gui;

    let mut source = FfmpegVideoSource::new(&input);
    let mut writer = FfmpegVideoWriter::new();
    let mut preview = if job.preview { create_preview() } else { None };

    let mut processor = StreamProcessor::new(detector, cancelled);
    let outcome = processor.process_stream(
        &job,
        &mut source,
        Some(&mut writer),
        preview.as_deref_mut(),
        None,
    )?;

    if outcome.cancelled {
        log::info!(
            "Stopped early after {} frames; partial output saved to {}",
            outcome.frames_written,
            output.display()
        );
    } else {
        log::info!("Output saved to {}", output.display());
    }
    Ok(())
}

fn run_camera(
    cli: &Cli,
    mode: RedactionMode,
    index: u32,
    detector: &mut dyn FaceDetector,
    cancelled: CancelFlag,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut job = base_job(cli, mode, InputTarget::Camera(index));
    job.output = cli.output.clone();
    job.preview = !cli.disable_gui;

    let mut preview = if job.preview { create_preview() } else { None };
    if job.output.is_none() && preview.is_none() {
        return Err("camera input needs --output, a preview window, or both".into());
    }

    let mut source = open_camera(index)?;
    let mut writer = job.output.as_ref().map(|_| FfmpegVideoWriter::new());

    let mut processor = StreamProcessor::new(detector, cancelled);
    let outcome = processor.process_stream(
        &job,
        source.as_mut(),
        writer.as_mut().map(|w| w as &mut dyn VideoWriter),
        preview.as_deref_mut(),
        None,
    )?;

    if let Some(output) = &job.output {
        log::info!(
            "Captured {} frames to {}",
            outcome.frames_written,
            output.display()
        );
    }
    Ok(())
}

fn run_batch(
    cli: &Cli,
    mode: RedactionMode,
    input: &std::path::Path,
    detector: &mut dyn FaceDetector,
    cancelled: CancelFlag,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = BatchConfig {
        threshold: cli.threshold,
        mode,
        mask_scale: cli.mask_scale,
        ellipse: !cli.enable_boxes,
        annotate: cli.enable_enum,
        extension: match cli.ext.as_str() {
            "*" => None,
            ext => Some(ext.trim_start_matches('.').to_string()),
        },
    };

    // Per-item failures are reported inside the driver; attempting the
    // whole batch is success.
    let summary = BatchDriver::new(detector, cancelled).run(input, &config);
    log::info!(
        "{} completed, {} skipped, {} failed",
        summary.completed,
        summary.skipped,
        summary.failed
    );
    Ok(())
}

fn build_detector(
    scale: Option<(u32, u32)>,
    backend: ExecutionBackend,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {CENTERFACE_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        CENTERFACE_MODEL_NAME,
        CENTERFACE_MODEL_URL,
        None,
        Some(Box::new(download_progress)),
    )?;

    Ok(Box::new(OnnxCenterfaceDetector::new(
        &model_path,
        scale,
        backend,
    )?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.threshold) {
        return Err(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            cli.threshold
        )
        .into());
    }
    if cli.mask_scale <= 0.0 {
        return Err(format!("Mask scale must be positive, got {}", cli.mask_scale).into());
    }
    Ok(())
}

fn parse_mode(mode: &str) -> Result<RedactionMode, Box<dyn std::error::Error>> {
    match mode {
        "solid" => Ok(RedactionMode::Solid),
        "blur" => Ok(RedactionMode::Blur),
        "none" => Ok(RedactionMode::None),
        other => Err(format!("Replace mode must be solid, blur or none, got '{other}'").into()),
    }
}

fn parse_backend(backend: &str) -> Result<ExecutionBackend, Box<dyn std::error::Error>> {
    match backend {
        "auto" => Ok(ExecutionBackend::Auto),
        "accelerated" => Ok(ExecutionBackend::Accelerated),
        "reference" => Ok(ExecutionBackend::Reference),
        other => {
            Err(format!("Backend must be auto, accelerated or reference, got '{other}'").into())
        }
    }
}

/// `640x360` → `(640, 360)`.
fn parse_scale(scale: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (w, h) = scale
        .split_once('x')
        .ok_or_else(|| format!("Scale must look like WxH, got '{scale}'"))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

/// `<video0>` → `Some(0)`; anything else is a path.
fn parse_camera_index(input: &str) -> Option<u32> {
    input
        .strip_prefix("<video")
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(|n| n.parse().ok())
}

#[cfg(feature = "gui")]
fn create_preview() -> Option<Box<dyn PreviewWindow>> {
    use faceveil_core::video::infrastructure::highgui_preview::HighguiPreview;
    Some(Box::new(HighguiPreview::new("faceveil")))
}

#[cfg(not(feature = "gui"))]
fn create_preview() -> Option<Box<dyn PreviewWindow>> {
    log::warn!("This build has no preview support (enable the `gui` feature)");
    None
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use faceveil_core::video::infrastructure::opencv_camera_source::OpencvCameraSource;
    Ok(Box::new(OpencvCameraSource::new(index)))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let _ = index;
    Err("this build has no live-capture support (enable the `camera` feature)".into())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camera_index() {
        assert_eq!(parse_camera_index("<video0>"), Some(0));
        assert_eq!(parse_camera_index("<video12>"), Some(12));
        assert_eq!(parse_camera_index("video0"), None);
        assert_eq!(parse_camera_index("clip.mp4"), None);
        assert_eq!(parse_camera_index("<videoX>"), None);
    }

    #[test]
    fn test_parse_scale() {
        assert_eq!(parse_scale("640x360").unwrap(), (640, 360));
        assert!(parse_scale("640").is_err());
        assert!(parse_scale("ax b").is_err());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("solid").unwrap(), RedactionMode::Solid);
        assert_eq!(parse_mode("blur").unwrap(), RedactionMode::Blur);
        assert_eq!(parse_mode("none").unwrap(), RedactionMode::None);
        assert!(parse_mode("mosaic").is_err());
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("auto").unwrap(), ExecutionBackend::Auto);
        assert_eq!(
            parse_backend("reference").unwrap(),
            ExecutionBackend::Reference
        );
        assert!(parse_backend("cuda").is_err());
    }
}
