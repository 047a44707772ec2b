//! Command-line interface for labscan.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use labscan::{ExtractionConfig, ExtractionMode, ExtractionResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "labscan",
    version,
    about = "Extract structured, unit-normalized lab values from medical documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract lab values from a PDF or image
    Extract {
        /// Document to process
        file: PathBuf,

        /// Extraction mode
        #[arg(long, value_enum, default_value = "auto")]
        mode: Mode,

        /// OCR language code(s), `+`-separated (e.g. "eng", "eng+deu")
        #[arg(long, default_value = "eng")]
        language: String,

        /// Declared media type; detected from content/extension when omitted
        #[arg(long)]
        media_type: Option<String>,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        output: Output,
    },

    /// Report whether a file format and the OCR backend are supported
    Probe {
        /// File to check
        file: PathBuf,
    },

    /// List the lab tests the catalog recognizes
    Tests,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Auto,
    LabValues,
    TextOnly,
}

impl From<Mode> for ExtractionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => ExtractionMode::Auto,
            Mode::LabValues => ExtractionMode::LabValues,
            Mode::TextOnly => ExtractionMode::TextOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Json,
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            file,
            mode,
            language,
            media_type,
            config,
            output,
        } => {
            let mut extraction_config = match config {
                Some(path) => ExtractionConfig::from_toml_file(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?,
                None => ExtractionConfig::default(),
            };
            extraction_config.mode = mode.into();
            extraction_config.ocr.language = language;

            let result = labscan::extract_file(&file, media_type.as_deref(), &extraction_config).await;

            match output {
                Output::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                Output::Summary => print_summary(&result),
            }

            // A failed extraction is still reported, but signals via exit code
            if result.requires_manual_review && result.lab_values.is_empty() {
                std::process::exit(1);
            }
        }

        Command::Probe { file } => {
            let format_supported = labscan::is_supported_format(&file);
            let ocr_available = labscan::ocr_backend_available();

            println!("file:           {}", file.display());
            println!("format support: {}", if format_supported { "yes" } else { "no" });
            println!("ocr backend:    {}", if ocr_available { "available" } else { "unavailable" });

            if !format_supported {
                std::process::exit(1);
            }
        }

        Command::Tests => {
            for test in labscan::catalog().tests() {
                println!(
                    "{:<20} {:<8} {}",
                    test.name,
                    test.canonical_unit,
                    test.range.display_with_unit(test.canonical_unit)
                );
            }
        }
    }

    Ok(())
}

fn print_summary(result: &ExtractionResult) {
    println!("method:     {}", result.method);
    println!("confidence: {:.3}", result.overall_confidence);
    println!("review:     {}", if result.requires_manual_review { "required" } else { "no" });

    if !result.lab_values.is_empty() {
        println!();
        println!(
            "{:<20} {:>10} {:<8} {:<16} {:>6}  {}",
            "test", "value", "unit", "reference", "conf", "flag"
        );
        for value in &result.lab_values {
            println!(
                "{:<20} {:>10} {:<8} {:<16} {:>6.2}  {}",
                value.test_name,
                value.value,
                value.unit,
                value.reference_range,
                value.confidence,
                match value.is_abnormal {
                    Some(true) => "ABNORMAL",
                    Some(false) => "",
                    None => "?",
                }
            );
        }
    }

    if let Some(content) = &result.content {
        println!();
        println!("{}", content);
    }

    for error in &result.errors {
        eprintln!("warning: {}", error);
    }
}
