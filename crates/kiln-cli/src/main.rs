//! Kiln CLI - Batch converter for meshes with loose texture maps

mod bundle;
mod pipeline;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use kiln_asset::{CollisionPolicy, KilnConfig};
use kiln_core::ExportTarget;
use kiln_import::SceneImporter;
use kiln_material::{FileImageLoader, MetallicRoughness};
use pipeline::{ConversionReport, ConversionRequest, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(
    about = "Give a mesh a PBR material built from the texture maps next to it, then re-export it",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Mesh file to convert (.obj, .gltf, .glb)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Zip archive holding one .obj at its root plus texture maps
    #[arg(long, value_name = "ZIP", conflicts_with = "input")]
    bundle: Option<PathBuf>,

    /// Zip the converted files next to the bundle
    #[arg(long, requires = "bundle")]
    package: bool,

    /// Output format: obj or gltf [default: obj]
    #[arg(short = 'o', long = "output-format", alias = "outputFormat", value_name = "FORMAT")]
    output_format: Option<String>,

    /// Load settings from this file instead of the global and project configs
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fail when two textures match the same role
    #[arg(long)]
    strict_textures: bool,

    /// Wire the ORM red channel to an occlusion input
    #[arg(long)]
    wire_occlusion: bool,

    /// Accepted texture extension (repeatable; replaces the configured set)
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Write a .asset.toml sidecar next to the output
    #[arg(long)]
    sidecar: bool,

    /// JPEG quality for glTF textures
    #[arg(long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: Option<u8>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Command-line flags take precedence over every config layer
    fn apply_to(&self, config: &mut KilnConfig) {
        if self.strict_textures {
            config.discovery.on_collision = CollisionPolicy::Error;
        }
        if self.wire_occlusion {
            config.material.wire_occlusion = true;
        }
        if !self.extensions.is_empty() {
            config.discovery.extensions = self.extensions.clone();
        }
        if self.sidecar {
            config.export.sidecar = true;
        }
        if let Some(quality) = self.jpeg_quality {
            config.export.jpeg_quality = quality;
        }
    }

    fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn main() -> ExitCode {
    // No arguments at all: show usage and succeed
    if std::env::args_os().len() <= 1 {
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(outcome) => {
            print_report(&outcome.report);
            if let Some(package) = &outcome.package {
                println!("Package: {}", package.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!();
            eprintln!("{}", Cli::command().render_usage());
            ExitCode::FAILURE
        }
    }
}

const MISSING_INPUT: &str = "--input <PATH> or --bundle <ZIP> is required";

#[derive(Debug)]
struct Outcome {
    report: ConversionReport,
    package: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<Outcome> {
    // An explicit format is checked before any file is touched
    let requested = cli
        .output_format
        .as_deref()
        .map(|format| format.parse::<ExportTarget>())
        .transpose()?;
    if cli.input.is_none() && cli.bundle.is_none() {
        anyhow::bail!(MISSING_INPUT);
    }

    let mut config = match &cli.config {
        Some(path) => KilnConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => KilnConfig::load()?,
    };
    cli.apply_to(&mut config);

    let target = match requested {
        Some(target) => target,
        None => config.default_target()?,
    };

    let input = match (&cli.input, &cli.bundle) {
        (Some(input), _) => input.clone(),
        (None, Some(archive)) => bundle::extract_bundle(archive, &bundle::extract_dir(archive)?)?,
        (None, None) => anyhow::bail!(MISSING_INPUT),
    };

    let importer = SceneImporter::new();
    let discovery = config.texture_discovery();
    let shader = MetallicRoughness::new().with_occlusion(config.material.wire_occlusion);
    let pipeline =
        Pipeline::new(&importer, &discovery, &FileImageLoader, &shader).with_config(&config);

    let report = pipeline.run(&ConversionRequest::new(input, target.extension()))?;

    let package = match (&cli.bundle, cli.package) {
        (Some(archive), true) => {
            let mut files = report.outputs.clone();
            files.extend(report.sidecar.clone());
            Some(bundle::package_outputs(&files, &bundle::package_path(archive)?)?)
        }
        _ => None,
    };

    Ok(Outcome { report, package })
}

fn print_report(report: &ConversionReport) {
    println!(
        "Converted {} object(s), {} polygon(s) total, as {}",
        report.object_count, report.polygon_count, report.target
    );
    if report.textures.is_empty() {
        println!("  No texture maps matched");
    }
    for texture in report.textures.iter() {
        println!("  {:<7} {}", texture.role().as_str(), texture.path().display());
    }
    for path in &report.outputs {
        println!("Output: {}", path.display());
    }
    if let Some(sidecar) = &report.sidecar {
        println!("Sidecar: {}", sidecar.display());
    }
}
