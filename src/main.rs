use clap::{Parser, Subcommand};
use media_forge::config::MediaConfig;
use media_forge::generator::DerivativeGenerator;
use media_forge::geometry;
use media_forge::imaging::{ImageCodec, RustCodec};
use media_forge::model::{Locator, SourceMedia};
use media_forge::store::Catalog;
use std::path::PathBuf;

/// Release builds report the crate version, everything else the commit.
fn version_string() -> &'static str {
    if env!("MEDIA_FORGE_ON_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("MEDIA_FORGE_GIT_HASH") {
        "" => "dev@unknown",
        // leaked once, at startup
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "media-forge")]
#[command(about = "Media catalog and image derivative pipeline")]
#[command(long_about = "\
Media catalog and image derivative pipeline

Renders the family of sizes a responsive front end needs from one source
image: aspect-corrected crops per orientation, retina @2x siblings,
non-cropped scales and a thumbnail. Size labels (610x381, 160nc@2x, ...)
are embedded in file names and stay stable across runs.

Run 'media-forge gen-config' to print a config.toml with stock defaults.")]
#[command(version = version_string())]
struct Cli {
    /// Configuration file (stock defaults when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the derivative plan for a source of the given dimensions
    Plan {
        width: u32,
        height: u32,
    },
    /// Print an image's dimensions and detected format
    Identify { file: PathBuf },
    /// Render the full derivative family for one image file
    Generate { file: PathBuf },
    /// Print a stock config.toml with all options
    GenConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<MediaConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(MediaConfig::from_toml_str(&std::fs::read_to_string(p)?)?),
        None => Ok(MediaConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Plan { width, height } => {
            let plan = geometry::plan_derivatives(
                width,
                height,
                config.horizontal_aspect.as_tuple(),
                config.vertical_aspect.as_tuple(),
                &config.plan_widths(),
            );
            println!(
                "crop box: {}x{} ({:?})",
                plan.crop_width,
                plan.crop_height,
                geometry::orientation(width, height)
            );
            for t in &plan.targets {
                println!("  {:<16} {}x{}", t.label, t.width, t.height);
            }
            let t = &plan.thumbnail;
            println!("  {:<16} {}x{}", t.label, t.width, t.height);
        }
        Command::Identify { file } => {
            let info = RustCodec::new().identify(&file)?;
            println!(
                "{}: {}x{} ({})",
                file.display(),
                info.width,
                info.height,
                info.format.as_deref().unwrap_or("unknown")
            );
        }
        Command::Generate { file } => {
            let file = file.canonicalize()?;
            let media_root = file
                .parent()
                .ok_or("file has no parent directory")?
                .to_path_buf();
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or("file name is not valid UTF-8")?
                .to_string();

            let mut catalog = Catalog::new();
            let mut element = SourceMedia {
                file_name: Some(file_name.clone()),
                locator: Some(Locator::Local {
                    path: format!("/{file_name}"),
                }),
                ..SourceMedia::new(0)
            };
            element.id = catalog.insert_media(element.clone());

            std::fs::create_dir_all(media_root.join(&config.resize_directory))?;
            let codec = RustCodec::new();
            let generator = DerivativeGenerator::new(&codec, &config, &media_root);
            let outcome = generator.generate(&mut catalog, &mut element);
            if !outcome.success {
                return Err(outcome.message.into());
            }

            println!("==> {}", outcome.message);
            for d in catalog.derivatives_for_source(0, element.id) {
                println!("  {:<16} {}x{}  {}", d.size, d.width, d.height, d.file_name);
            }
        }
        Command::GenConfig => {
            print!("{}", toml::to_string_pretty(&MediaConfig::default())?);
        }
    }

    Ok(())
}
