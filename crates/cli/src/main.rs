//! CLI tool for generating personalized storybook decks and PDFs.

mod pipeline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pipeline::{GenerateRequest, Pipeline};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use storybook_convert::{ConversionJob, Converter, ConverterOptions};
use storybook_core::{page_images, Gender, Replacements, StoryCatalog};
use storybook_pptx::{PptxDocument, DEFAULT_PATTERN};

/// Personalize storybook templates and render them to PDF.
#[derive(Parser, Debug)]
#[command(name = "storybook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the story templates
    #[arg(long, global = true, env = "STORYBOOK_TEMPLATES", default_value = "story_book")]
    templates_dir: PathBuf,

    /// Directory for generated artifacts and page images
    #[arg(long, global = true, env = "STORYBOOK_MEDIA", default_value = "media")]
    media_dir: PathBuf,

    /// LibreOffice binary (default: search PATH and common install locations)
    #[arg(long, global = true, env = "STORYBOOK_CONVERTER")]
    converter: Option<PathBuf>,

    /// Conversion timeout in seconds
    #[arg(long, global = true, env = "STORYBOOK_CONVERT_TIMEOUT", default_value = "300")]
    timeout: u64,

    /// Skip PowerPoint automation and always use LibreOffice
    #[arg(long, global = true)]
    no_native: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the placeholder tokens in a deck
    Scan {
        /// Deck to scan (.pptx)
        deck: PathBuf,
    },

    /// Fill placeholders in a template, one deck per name
    Personalize {
        /// Template deck (.pptx)
        template: PathBuf,

        /// Child name; repeat for several decks
        #[arg(short, long = "name")]
        names: Vec<String>,

        /// Extra replacement, e.g. --set '{{TITLE}}=Winter'
        #[arg(long = "set", value_parser = parse_pair)]
        pairs: Vec<(String, String)>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Output filename; `{name}` is replaced with the child name
        #[arg(long, default_value = DEFAULT_PATTERN)]
        pattern: String,

        /// Also convert each deck to PDF
        #[arg(long)]
        pdf: bool,
    },

    /// Convert a deck to PDF
    Convert {
        /// Deck to convert
        input: PathBuf,

        /// Output PDF (default: next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate the content and cover PDFs for one child
    Generate {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        story_id: u32,

        /// male or female
        #[arg(short, long)]
        gender: Gender,
    },

    /// Check that every expected template exists
    Verify,

    /// List the image files for a story page
    Images {
        #[arg(short, long)]
        story_id: u32,

        #[arg(short, long)]
        gender: Gender,

        #[arg(short, long)]
        page: usize,
    },
}

/// Parse `TOKEN=VALUE`.
fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    let (token, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TOKEN=VALUE, got '{}'", s))?;
    if token.is_empty() {
        return Err("token must not be empty".to_string());
    }
    Ok((token.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &cli.command {
        Command::Scan { deck } => scan(deck),
        Command::Personalize {
            template,
            names,
            pairs,
            output_dir,
            pattern,
            pdf,
        } => {
            let entries = build_entries(names, pairs);
            personalize(&cli, template, &entries, output_dir, pattern, *pdf).await
        }
        Command::Convert { input, output } => {
            let job = match output {
                Some(output) => ConversionJob::new(input, output),
                None => ConversionJob::beside(input),
            };
            let pdf = converter(&cli)
                .convert(&job.with_timeout(timeout(&cli)))
                .await
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            println!("{}", pdf.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Generate {
            name,
            story_id,
            gender,
        } => {
            let pipeline = Pipeline::new(
                StoryCatalog::new(&cli.templates_dir),
                &cli.media_dir,
                Arc::new(converter(&cli)),
                timeout(&cli),
            );
            let request = GenerateRequest {
                name: name.clone(),
                story_id: *story_id,
                gender: *gender,
            };
            let outcome = pipeline.generate(&request).await?;
            println!("{}", serde_json::to_string_pretty(&outcome.summary())?);

            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Verify => {
            let statuses = StoryCatalog::new(&cli.templates_dir).verify();
            for status in &statuses {
                let mark = if status.exists { "ok" } else { "missing" };
                println!("{:8} {} ({})", mark, status.label, status.path.display());
            }
            let missing = statuses.iter().filter(|s| !s.exists).count();
            if missing > 0 {
                eprintln!("{} of {} templates missing", missing, statuses.len());
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Images {
            story_id,
            gender,
            page,
        } => {
            let templates = StoryCatalog::new(&cli.templates_dir).resolve(*story_id, *gender)?;
            let images = page_images(&cli.media_dir, *page, &templates.asset_folder);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "asset_folder": templates.asset_folder,
                    "images": images,
                }))?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn timeout(cli: &Cli) -> Duration {
    Duration::from_secs(cli.timeout)
}

fn converter(cli: &Cli) -> Converter {
    Converter::detect(&ConverterOptions {
        converter: cli.converter.clone(),
        native: !cli.no_native,
        ..ConverterOptions::default()
    })
}

/// One entry per name with the `--set` pairs layered on top; a single entry
/// of just the pairs when no names are given.
fn build_entries(names: &[String], pairs: &[(String, String)]) -> Vec<Replacements> {
    let with_pairs = |mut replacements: Replacements| {
        for (token, value) in pairs {
            replacements.insert(token.clone(), value.clone());
        }
        replacements
    };

    if names.is_empty() {
        vec![with_pairs(Replacements::new())]
    } else {
        names
            .iter()
            .map(|name| with_pairs(Replacements::for_child(name)))
            .collect()
    }
}

/// Print the placeholder tokens of a deck, one per line.
fn scan(deck: &Path) -> Result<ExitCode> {
    let doc = PptxDocument::open(deck).with_context(|| format!("Failed to load {}", deck.display()))?;

    let structure = doc.deck().structure();
    log::debug!(
        "{}: {} slides, {} shapes, {} paragraphs, {} runs",
        deck.display(),
        structure.slides,
        structure.shapes,
        structure.paragraphs,
        structure.runs
    );

    for token in doc.placeholders() {
        println!("{}", token);
    }
    Ok(ExitCode::SUCCESS)
}

async fn personalize(
    cli: &Cli,
    template: &Path,
    entries: &[Replacements],
    output_dir: &Path,
    pattern: &str,
    pdf: bool,
) -> Result<ExitCode> {
    let created = storybook_pptx::personalize_batch(template, entries, output_dir, pattern)
        .with_context(|| format!("Failed to personalize {}", template.display()))?;

    for (path, report) in &created {
        println!(
            "{} ({} replacements on {}/{} slides)",
            path.display(),
            report.total_replacements,
            report.slides_modified,
            report.slide_count
        );
    }

    if !pdf {
        return Ok(ExitCode::SUCCESS);
    }

    let converter = converter(cli);
    let mut failed = 0;
    for (path, _) in &created {
        let job = ConversionJob::beside(path).with_timeout(timeout(cli));
        match converter.convert(&job).await {
            Ok(pdf) => println!("{}", pdf.display()),
            Err(e) => {
                eprintln!("Error converting {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
