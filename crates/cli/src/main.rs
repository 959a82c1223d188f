use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use facelens_core::codec::{image_codec, image_file};
use facelens_core::detection::domain::face_locator::FaceLocator;
use facelens_core::gallery::domain::gallery_store::{CaptureMetadata, GalleryEntry, GalleryStore};
use facelens_core::gallery::infrastructure::csv_gallery_store::CsvGalleryStore;
use facelens_core::pipeline::analysis_report::{AnalysisReport, HealthReport};
use facelens_core::pipeline::capture_use_case::CaptureUseCase;
use facelens_core::pipeline::debug_faces_use_case::{DebugFacesResult, DebugFacesUseCase};
use facelens_core::pipeline::engine_registry::EngineRegistry;
use facelens_core::pipeline::frame_analyzer::FrameAnalyzer;
use facelens_core::shared::config::AppConfig;
use facelens_core::shared::frame::Frame;

/// Face analysis (emotion, age, gender) for single frames, plus a local
/// capture gallery.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    /// JSON config file (default: platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the cascade and ONNX model files.
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Gallery directory for captured frames and metadata.
    #[arg(long, global = true)]
    captures_dir: Option<PathBuf>,

    /// Detection window growth between scales (> 1.0).
    #[arg(long, global = true)]
    scale_factor: Option<f64>,

    /// Raw hits a detection needs to be reported.
    #[arg(long, global = true)]
    min_neighbors: Option<usize>,

    /// Smallest reported face side, in pixels.
    #[arg(long, global = true)]
    min_face_size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report which engines loaded.
    Health,
    /// Analyze every face in an image.
    Analyze {
        /// Image file, or `-` to read a base64 payload from stdin.
        input: String,
    },
    /// Outline detected faces without classifying them.
    DebugFaces {
        /// Image file, or `-` to read a base64 payload from stdin.
        input: String,
        /// Write the annotated image here instead of embedding it.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Analyze an image and save it to the gallery.
    Capture {
        /// Image file, or `-` to read a base64 payload from stdin.
        input: String,
        /// JSON metadata stored when no face is detected.
        #[arg(long)]
        metadata: Option<PathBuf>,
    },
    /// Inspect or modify the capture gallery.
    #[command(subcommand)]
    Gallery(GalleryCommand),
}

#[derive(Subcommand)]
enum GalleryCommand {
    /// List captures in the order they were taken.
    List {
        /// Embed each image as a data URL.
        #[arg(long)]
        with_images: bool,
    },
    /// Delete one capture by filename.
    Delete { filename: String },
    /// Delete every capture.
    Clear,
}

#[derive(Serialize)]
struct GalleryListing {
    photos: Vec<GalleryEntry>,
    count: usize,
}

#[derive(Serialize)]
struct GalleryAck {
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct DebugFacesOutput<'a> {
    #[serde(flatten)]
    result: &'a DebugFacesResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
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
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Health => {
            let registry = EngineRegistry::load(&config.models_dir);
            print_json(&HealthReport::new(registry.status()))
        }
        Command::Analyze { input } => {
            let frame = read_input(&input)?;
            let analyzer = build_analyzer(&config, &EngineRegistry::load(&config.models_dir));
            let result = analyzer
                .analyze(&frame)
                .map_err(|e| format!("Analysis failed: {e}"))?;
            print_json(&AnalysisReport::from(&result))
        }
        Command::DebugFaces { input, output } => run_debug_faces(&config, &input, output.as_deref()),
        Command::Capture { input, metadata } => {
            let frame = read_input(&input)?;
            let fallback = read_fallback_metadata(metadata.as_deref())?;
            let analyzer = build_analyzer(&config, &EngineRegistry::load(&config.models_dir));
            let gallery = CsvGalleryStore::new(&config.captures_dir);
            let result = CaptureUseCase::new(&analyzer, &gallery).execute(&frame, fallback)?;
            print_json(&result)
        }
        Command::Gallery(command) => run_gallery(&config, command),
    }
}

fn run_debug_faces(
    config: &AppConfig,
    input: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_input(input)?;
    let registry = EngineRegistry::load(&config.models_dir);
    let locator = FaceLocator::new(registry.face.clone(), config.detector, config.sort_faces);
    let result = DebugFacesUseCase::new(locator, registry.status())
        .execute(&frame)
        .map_err(|e| format!("Debug failed: {e}"))?;

    let image = match output {
        Some(path) => {
            image_file::write_frame(path, &result.annotated)?;
            log::info!("Annotated image written to {}", path.display());
            None
        }
        None => Some(image_codec::encode_data_url(&result.annotated)?),
    };
    print_json(&DebugFacesOutput {
        result: &result,
        image,
        output,
    })
}

fn run_gallery(config: &AppConfig, command: GalleryCommand) -> Result<(), Box<dyn std::error::Error>> {
    let store = CsvGalleryStore::new(&config.captures_dir);
    match command {
        GalleryCommand::List { with_images } => {
            let photos = if with_images {
                store.list_with_images()?
            } else {
                store.list()?
            };
            print_json(&GalleryListing {
                count: photos.len(),
                photos,
            })
        }
        GalleryCommand::Delete { filename } => {
            store.delete(&filename)?;
            print_json(&GalleryAck {
                success: true,
                message: format!("Photo {filename} deleted successfully"),
            })
        }
        GalleryCommand::Clear => {
            store.clear()?;
            print_json(&GalleryAck {
                success: true,
                message: "Gallery cleared successfully".into(),
            })
        }
    }
}

/// Config file values, overridden by any flags given on the command line.
fn resolve_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.models_dir {
        config.models_dir = dir.clone();
    }
    if let Some(dir) = &cli.captures_dir {
        config.captures_dir = dir.clone();
    }
    if let Some(v) = cli.scale_factor {
        config.detector.scale_factor = v;
    }
    if let Some(v) = cli.min_neighbors {
        config.detector.min_neighbors = v;
    }
    if let Some(v) = cli.min_face_size {
        config.detector.min_face_size = v;
    }
    config.detector.validate()?;
    Ok(config)
}

fn build_analyzer(config: &AppConfig, registry: &EngineRegistry) -> FrameAnalyzer {
    FrameAnalyzer::from_registry(registry, config.detector, config.sort_faces)
}

/// Decodes an image file, or a base64 / data-URL payload from stdin for `-`.
fn read_input(input: &str) -> Result<Frame, Box<dyn std::error::Error>> {
    let frame = if input == "-" {
        let mut payload = String::new();
        io::stdin().read_to_string(&mut payload)?;
        image_codec::decode_base64(&payload).map_err(|e| format!("Invalid image data: {e}"))?
    } else {
        let path = Path::new(input);
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
        image_file::read_frame(path).map_err(|e| format!("Invalid image data: {e}"))?
    };
    Ok(frame)
}

fn read_fallback_metadata(
    path: Option<&Path>,
) -> Result<CaptureMetadata, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            let json = fs::read_to_string(p)?;
            serde_json::from_str(&json)
                .map_err(|e| format!("Invalid metadata in {}: {e}", p.display()).into())
        }
        None => Ok(CaptureMetadata::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
