//! docoutline CLI - PDF outline extraction, training and prediction

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docoutline::detect::find_pdfs;
use docoutline::labeling::{self, UpgradeStatus};
use docoutline::{
    render, Bundle, ExtractOptions, JsonFormat, Outliner, OutlinerOptions, PageSelection,
    ParseOptions, WhatlangDetector, SCHEMA_VERSION,
};

#[derive(Parser)]
#[command(name = "docoutline")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Infer PDF titles and heading outlines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text blocks from a PDF into a JSON file for labeling
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Skip language identification
        #[arg(long)]
        no_language: bool,
    },

    /// Train a classifier bundle from a directory of labeled block files
    Train {
        /// Directory of labeled JSON block files
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output bundle file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Also write the feature dataset as JSON
        #[arg(long, value_name = "FILE")]
        dataset: Option<PathBuf>,
    },

    /// Predict the outline of a single PDF
    Predict {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Classifier bundle
        #[arg(short, long, value_name = "FILE", env = "DOCOUTLINE_MODEL")]
        model: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Predict outlines for every PDF in a directory
    Batch {
        /// Directory containing PDF files
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Classifier bundle
        #[arg(short, long, value_name = "FILE", env = "DOCOUTLINE_MODEL")]
        model: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Process documents one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Add language codes to labeled block files written by older versions
    Upgrade {
        /// Directory of labeled JSON block files
        #[arg(value_name = "DIR")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            pages,
            no_language,
        } => cmd_extract(&input, output.as_deref(), pages.as_deref(), no_language),
        Commands::Train {
            input,
            output,
            dataset,
        } => cmd_train(&input, &output, dataset.as_deref()),
        Commands::Predict {
            input,
            model,
            output,
            compact,
            pages,
        } => cmd_predict(&input, &model, output.as_deref(), compact, pages.as_deref()),
        Commands::Batch {
            input,
            model,
            output,
            sequential,
        } => cmd_batch(&input, &model, &output, sequential),
        Commands::Upgrade { input } => cmd_upgrade(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn parse_options(pages: Option<&str>) -> Result<ParseOptions, Box<dyn std::error::Error>> {
    let page_selection = match pages {
        Some(p) => PageSelection::parse(p)?,
        None => PageSelection::All,
    };
    Ok(ParseOptions::new().with_pages(page_selection).with_parallel(true))
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    pages: Option<&str>,
    no_language: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let parse = parse_options(pages)?;
    let extract = ExtractOptions::new().with_language_detection(!no_language);
    let blocks = docoutline::extract_blocks_with_options(input, parse, extract)?;

    let json = serde_json::to_string_pretty(&blocks)?;
    write_or_print(output, &json)?;

    if output.is_some() {
        println!(
            "{} {} blocks extracted",
            "Done!".green().bold(),
            blocks.len()
        );
        println!(
            "{}",
            "Next: add a \"label\" key (TITLE, H1-H4 or NONE) to each block, then run `docoutline train`."
                .dimmed()
        );
    }
    Ok(())
}

fn cmd_train(
    input: &Path,
    output: &Path,
    dataset_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = spinner("Loading labeled data...");
    let documents = labeling::load_labeled_dir(input)?;

    pb.set_message("Training...");
    let (dataset, bundle) = docoutline::classify::train(&documents)?;

    pb.set_message("Saving bundle...");
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    bundle.save(output)?;
    if let Some(path) = dataset_path {
        dataset.save(path)?;
    }
    pb.finish_and_clear();

    println!(
        "{} {} samples from {} documents, {} features",
        "Trained on".green().bold(),
        dataset.len(),
        documents.len(),
        dataset.feature_names.len()
    );
    for (label, count) in dataset.class_counts() {
        println!("  {} {:<6} {}", "├─".dimmed(), label, count);
    }
    println!("{} {}", "Saved bundle to".green(), output.display());
    if let Some(path) = dataset_path {
        println!("{} {}", "Saved dataset to".green(), path.display());
    }
    Ok(())
}

fn cmd_predict(
    input: &Path,
    model: &Path,
    output: Option<&Path>,
    compact: bool,
    pages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = Bundle::load(model)?;
    let options = OutlinerOptions::new().with_parse_options(parse_options(pages)?);
    let outliner = Outliner::from_bundle_with_options(bundle, options);

    let result = outliner.process_file(input)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = render::to_json(&result, format)?;
    write_or_print(output, &json)
}

fn cmd_batch(
    input: &Path,
    model: &Path,
    output: &Path,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // The bundle is verified before any document is opened.
    let bundle = Bundle::load(model)?;
    let pdfs = find_pdfs(input)?;
    if pdfs.is_empty() {
        println!("{} {}", "No PDF files found in".yellow(), input.display());
        return Ok(());
    }
    fs::create_dir_all(output)?;
    log::info!("Found {} PDF files in {}", pdfs.len(), input.display());

    let options = OutlinerOptions::new().with_parallel_batch(!sequential);
    let outliner = Outliner::from_bundle_with_options(bundle, options);

    let pb = ProgressBar::new(pdfs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    let report = outliner.process_batch_with_progress(&pdfs, |id, _| {
        pb.set_message(id.to_string());
        pb.inc(1);
    });
    pb.finish_with_message("Done!");

    for doc in &report.succeeded {
        let stem = Path::new(&doc.id)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| doc.id.clone());
        let path = output.join(format!("{}.json", stem));
        fs::write(&path, render::to_json(&doc.result, JsonFormat::Pretty)?)?;
        println!(
            "  {} {} ({} headings)",
            "├─".dimmed(),
            path.display(),
            doc.result.heading_count()
        );
    }
    for failure in &report.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.id,
            failure.error.red()
        );
    }

    println!(
        "\n{} {} succeeded, {} failed",
        "Batch complete:".green().bold(),
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(())
}

fn cmd_upgrade(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = labeling::upgrade_dir(input, &WhatlangDetector)?;

    for (path, status) in &report.files {
        let name = path.display();
        match status {
            UpgradeStatus::Upgraded(n) => {
                println!("{} {} ({} blocks)", "Upgraded".green(), name, n)
            }
            UpgradeStatus::Unchanged => println!("{} {}", "Unchanged".dimmed(), name),
            UpgradeStatus::Skipped(reason) => {
                println!("{} {}: {}", "Skipped".yellow(), name, reason)
            }
            UpgradeStatus::Failed(reason) => println!("{} {}: {}", "Failed".red(), name, reason),
        }
    }

    println!(
        "\n{} {} upgraded, {} skipped, {} failed",
        "Done!".green().bold(),
        report.upgraded(),
        report.skipped(),
        report.failed()
    );
    println!(
        "Backups are in {}",
        input.join(labeling::BACKUP_DIR).display()
    );
    Ok(())
}

fn cmd_version() {
    println!(
        "{} {}",
        "docoutline".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("PDF outline inference tool");
    println!();
    println!("Feature schema: {}", SCHEMA_VERSION.dimmed());
    println!("License: MIT");
}
