//! danmaku2ass CLI Tool
//!
//! Command-line interface for converting danmaku XML files into ASS subtitles.

mod config_file;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config_file::ConfigFile;
use danmaku_converter::config::DEFAULT_COMMENT_HEIGHT;
use danmaku_converter::{
    BlockedType, ConverterConfig, DanmakuConverter, DurationFn, GlyphMetrics, MalformedPolicy,
};
use danmaku_core::{DanmakuType, Resolution, XmlDanmakuDocument};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "danmaku2ass")]
#[command(about = "Convert danmaku XML into ASS subtitles with collision-free placement")]
#[command(version)]
struct Cli {
    /// Log every placement decision
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a danmaku XML file to an ASS script
    Convert {
        /// Input XML file path
        input: PathBuf,

        /// Output ASS file path ("-" for stdout, default: input with .ass extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ConvertOptions,
    },

    /// Show statistics about a danmaku XML file
    Info {
        /// Input XML file path
        input: PathBuf,
    },

    /// Write a copy of a danmaku XML file without blocked comments
    Filter {
        /// Input XML file path
        input: PathBuf,

        /// Output XML file path
        #[arg(short, long)]
        output: PathBuf,

        /// Comment type to drop (name, code or "color"), repeatable
        #[arg(long, value_name = "TYPE")]
        block: Vec<BlockedType>,

        /// Skip malformed records instead of failing
        #[arg(long)]
        skip_malformed: bool,
    },
}

#[derive(Args, Debug, Default)]
struct ConvertOptions {
    /// JSON file with default settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Script title (default: input file name)
    #[arg(long)]
    title: Option<String>,

    /// Font family name
    #[arg(long)]
    font: Option<String>,

    /// Transparency from 0.0 (opaque) to 1.0
    #[arg(long)]
    alpha: Option<f64>,

    /// Use bold text
    #[arg(long, overrides_with = "no_bold")]
    bold: bool,

    /// Use regular weight, even if the config file asks for bold
    #[arg(long, overrides_with = "bold")]
    no_bold: bool,

    /// Script width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Script height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Fraction of the screen height kept free at the bottom (0.0 - 1.0)
    #[arg(long)]
    bottom_margin: Option<f64>,

    /// Seconds a scrolling comment takes to cross the screen
    #[arg(long)]
    scroll_duration: Option<f64>,

    /// Seconds a top or bottom comment stays on screen
    #[arg(long)]
    stationary_duration: Option<f64>,

    /// Comment type to drop (name, code or "color"), repeatable
    #[arg(long, value_name = "TYPE")]
    block: Vec<BlockedType>,

    /// TrueType/OpenType font used to measure comment widths
    #[arg(long)]
    font_file: Option<PathBuf>,

    /// Skip malformed records instead of failing
    #[arg(long)]
    skip_malformed: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            output,
            options,
        } => convert_file(&input, output, &options)?,

        Commands::Info { input } => {
            let xml = read_input(&input)?;
            let document = XmlDanmakuDocument::parse(&xml).context("Failed to parse danmaku XML")?;
            print_info(&document);
        }

        Commands::Filter {
            input,
            output,
            block,
            skip_malformed,
        } => filter_file(&input, &output, block, skip_malformed)?,
    }

    Ok(())
}

/// Logs go to stderr so `-o -` output stays clean. `RUST_LOG` overrides `--verbose`.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn read_input(input: &Path) -> Result<String> {
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

/// Merges defaults, the config file and command-line flags, in that order
fn build_config(
    input: &Path,
    options: &ConvertOptions,
    file: &ConfigFile,
) -> Result<ConverterConfig> {
    let defaults = ConverterConfig::default();

    let title = options
        .title
        .clone()
        .or_else(|| file.title.clone())
        .or_else(|| input.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or(defaults.title);

    let resolution = Resolution::new(
        options
            .width
            .or(file.width)
            .unwrap_or(defaults.resolution.width),
        options
            .height
            .or(file.height)
            .unwrap_or(defaults.resolution.height),
    );

    let duration = match (
        options.scroll_duration.or(file.scroll_duration),
        options.stationary_duration.or(file.stationary_duration),
    ) {
        (None, None) => defaults.duration,
        (scrolling, stationary) => {
            DurationFn::by_kind(scrolling.unwrap_or(6.0), stationary.unwrap_or(4.0))
        }
    };

    let mut blocked_types = file
        .block
        .iter()
        .map(|s| s.parse::<BlockedType>().map_err(anyhow::Error::msg))
        .collect::<Result<Vec<_>>>()
        .context("Invalid block list in config file")?;
    for blocked in &options.block {
        if !blocked_types.contains(blocked) {
            blocked_types.push(*blocked);
        }
    }

    let alpha = options.alpha.or(file.alpha).unwrap_or(defaults.alpha);
    anyhow::ensure!((0.0..=1.0).contains(&alpha), "alpha must be between 0.0 and 1.0");
    let bottom_margin = options
        .bottom_margin
        .or(file.bottom_margin)
        .unwrap_or(defaults.bottom_margin);
    anyhow::ensure!(
        (0.0..=1.0).contains(&bottom_margin),
        "bottom margin must be between 0.0 and 1.0"
    );

    let bold = if options.no_bold {
        false
    } else {
        options.bold || file.bold.unwrap_or(defaults.bold)
    };
    let skip_malformed = options.skip_malformed || file.skip_malformed.unwrap_or(false);

    Ok(ConverterConfig {
        title,
        font: options.font.clone().or_else(|| file.font.clone()).unwrap_or(defaults.font),
        alpha,
        bold,
        duration,
        blocked_types,
        resolution,
        bottom_margin,
        malformed: if skip_malformed {
            MalformedPolicy::Skip
        } else {
            MalformedPolicy::Abort
        },
        ..defaults
    })
}

fn convert_file(input: &Path, output: Option<PathBuf>, options: &ConvertOptions) -> Result<()> {
    info!("Converting danmaku: {}", input.display());

    let file_config = match &options.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = build_config(input, options, &file_config)?;

    let converter = match options.font_file.as_ref().or(file_config.font_file.as_ref()) {
        Some(font_file) => {
            let metrics = GlyphMetrics::open(font_file, DEFAULT_COMMENT_HEIGHT)
                .context("Failed to load font file")?;
            DanmakuConverter::with_metrics(config, metrics)
        }
        None => DanmakuConverter::new(config),
    };

    let xml = read_input(input)?;
    let conversion = converter.convert(&xml).context("Failed to convert danmaku")?;
    let report = conversion.report;
    let document = converter.to_document(conversion);

    let output = output.unwrap_or_else(|| input.with_extension("ass"));
    if output.as_os_str() == "-" {
        let stdout = std::io::stdout();
        document
            .write(stdout.lock())
            .context("Failed to write ASS script")?;
    } else {
        let file = File::create(&output).context("Failed to create output file")?;
        document
            .write(BufWriter::new(file))
            .context("Failed to write ASS script")?;
        info!("Wrote {}", output.display());
    }

    info!(
        "{} of {} comments shown, {} hidden, {} filtered, {} malformed",
        report.displayed,
        report.total,
        report.off_screen + report.unsupported,
        report.filtered,
        report.malformed
    );

    Ok(())
}

fn filter_file(
    input: &Path,
    output: &Path,
    block: Vec<BlockedType>,
    skip_malformed: bool,
) -> Result<()> {
    let config = ConverterConfig {
        blocked_types: block,
        malformed: if skip_malformed {
            MalformedPolicy::Skip
        } else {
            MalformedPolicy::Abort
        },
        ..Default::default()
    };
    let converter = DanmakuConverter::new(config);

    let xml = read_input(input)?;
    let (document, _) = converter.parse(&xml).context("Failed to parse danmaku XML")?;
    let kept: Vec<_> = document
        .danmakus
        .iter()
        .filter(|d| converter.accepts(d))
        .cloned()
        .collect();
    info!("Keeping {} of {} comments", kept.len(), document.len());

    let mut writer = BufWriter::new(File::create(output).context("Failed to create output file")?);
    writer
        .write_all(XmlDanmakuDocument::new(kept).to_xml().as_bytes())
        .context("Failed to write XML")?;
    writer.flush()?;
    Ok(())
}

fn print_info(document: &XmlDanmakuDocument) {
    println!("\n=== Danmaku File Information ===");
    println!("Comments: {}", document.len());
    if document.is_empty() {
        return;
    }

    let first = document
        .danmakus
        .iter()
        .map(|d| d.start_time)
        .fold(f64::INFINITY, f64::min);
    let last = document
        .danmakus
        .iter()
        .map(|d| d.start_time)
        .fold(f64::NEG_INFINITY, f64::max);
    println!(
        "Time span: {} - {}",
        danmaku_core::seconds_to_timecode(first),
        danmaku_core::seconds_to_timecode(last)
    );

    let white = document.danmakus.iter().filter(|d| d.is_white()).count();
    println!("White: {}, colored: {}", white, document.len() - white);

    let mut by_type: BTreeMap<DanmakuType, usize> = BTreeMap::new();
    for danmaku in &document.danmakus {
        *by_type.entry(danmaku.danmaku_type).or_default() += 1;
    }
    println!("\n=== Types ===");
    for (danmaku_type, count) in by_type {
        println!("  {} ({}): {}", danmaku_type, danmaku_type.code(), count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<i>
<d p="1.0,1,25,16777215,1600000000,0,aaaa,1">hello</d>
<d p="2.0,5,25,255,1600000001,0,bbbb,2">blue top</d>
<d p="3.0,4,18,16777215,1600000002,0,cccc,3">bottom</d>
</i>"#;

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(
            Path::new("/videos/episode-01.xml"),
            &ConvertOptions::default(),
            &ConfigFile::default(),
        )
        .unwrap();
        assert_eq!(config.title, "episode-01");
        assert_eq!(config.resolution, Resolution::new(1920, 1080));
        assert_eq!(config.malformed, MalformedPolicy::Abort);
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = ConfigFile::parse(
            r#"{"title": "From file", "width": 1280, "height": 720, "block": ["top"], "skip_malformed": true}"#,
        )
        .unwrap();
        let options = ConvertOptions {
            title: Some("From flag".to_string()),
            block: vec![BlockedType::Color],
            ..Default::default()
        };
        let config = build_config(Path::new("a.xml"), &options, &file).unwrap();
        assert_eq!(config.title, "From flag");
        assert_eq!(config.resolution, Resolution::new(1280, 720));
        assert_eq!(
            config.blocked_types,
            vec![BlockedType::Type(DanmakuType::Top), BlockedType::Color]
        );
        assert_eq!(config.malformed, MalformedPolicy::Skip);
    }

    #[test]
    fn test_no_bold_overrides_config_file() {
        let file = ConfigFile::parse(r#"{"bold": true}"#).unwrap();
        let config = build_config(Path::new("a.xml"), &ConvertOptions::default(), &file).unwrap();
        assert!(config.bold);

        let options = ConvertOptions {
            no_bold: true,
            ..Default::default()
        };
        let config = build_config(Path::new("a.xml"), &options, &file).unwrap();
        assert!(!config.bold);
    }

    #[test]
    fn test_last_bold_flag_wins() {
        let cli = Cli::parse_from(["danmaku2ass", "convert", "a.xml", "--no-bold", "--bold"]);
        let Commands::Convert { options, .. } = cli.command else {
            panic!("expected convert");
        };
        assert!(options.bold);
        assert!(!options.no_bold);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let options = ConvertOptions {
            alpha: Some(1.5),
            ..Default::default()
        };
        assert!(build_config(Path::new("a.xml"), &options, &ConfigFile::default()).is_err());
    }

    #[test]
    fn test_convert_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sample.xml");
        std::fs::write(&input, SAMPLE).unwrap();

        convert_file(&input, None, &ConvertOptions::default()).unwrap();

        let script = std::fs::read_to_string(dir.path().join("sample.ass")).unwrap();
        assert!(script.contains("Title: sample"));
        assert_eq!(script.matches("Dialogue:").count(), 3);
        assert!(script.contains("{\\pos(960,30)\\c&HFF0000&}blue top"));
    }

    #[test]
    fn test_filter_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sample.xml");
        let output = dir.path().join("filtered.xml");
        std::fs::write(&input, SAMPLE).unwrap();

        filter_file(&input, &output, vec![BlockedType::Color], false).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let filtered = XmlDanmakuDocument::parse(&written).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.danmakus.iter().all(|d| d.is_white()));
        assert_eq!(filtered.danmakus[1].raw_p, "3.0,4,18,16777215,1600000002,0,cccc,3");
    }
}
