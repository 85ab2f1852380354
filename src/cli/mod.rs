//! # CLI Module
//!
//! Command-line interface for the similar image finder.
//!
//! ## Usage
//! ```bash
//! # Find similar images under a directory
//! image-pairs scan ~/Pictures
//!
//! # Only the visual list, pairs split across folders
//! image-pairs scan ~/Pictures --list visual --folder different
//!
//! # JSON output
//! image-pairs scan ~/Pictures --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use similar_image_finder::core::codec::ImageCodec;
use similar_image_finder::core::pair::{humanize_distance, humanize_duration, ImagePair};
use similar_image_finder::core::pipeline::{
    FolderFilter, MaxAge, PairFilter, Pipeline, PipelineResult, ResultSet,
};
use similar_image_finder::core::scorer::Category;
use similar_image_finder::error::{ImagePairError, Result};
use similar_image_finder::events::{CompareEvent, Event, EventChannel, PipelineEvent, ScanEvent};
use std::path::{Path, PathBuf};
use std::thread;

/// Similar Image Finder - near-duplicates by pixels, time and place
#[derive(Parser, Debug)]
#[command(name = "image-pairs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan directories for similar images
    Scan {
        /// Directories or files to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Comparison threads (0 = one per CPU)
        #[arg(short, long, default_value = "0")]
        workers: usize,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Lists to print (repeatable, default all)
        #[arg(short, long)]
        list: Vec<ListArg>,

        /// Where the two images of a pair may live
        #[arg(long, default_value = "any")]
        folder: FolderArg,

        /// How recently the newer file of a pair must have changed
        #[arg(long, default_value = "unlimited")]
        max_age: AgeArg,

        /// Maximum pairs printed per list
        #[arg(long)]
        limit: Option<usize>,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ListArg {
    Visual,
    Temporal,
    Geospatial,
    Combined,
}

impl From<ListArg> for Category {
    fn from(list: ListArg) -> Self {
        match list {
            ListArg::Visual => Category::Visual,
            ListArg::Temporal => Category::Temporal,
            ListArg::Geospatial => Category::Geospatial,
            ListArg::Combined => Category::Combined,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FolderArg {
    /// No restriction
    Any,
    /// Both images in the same folder
    Same,
    /// Images in different folders
    Different,
}

impl From<FolderArg> for FolderFilter {
    fn from(folder: FolderArg) -> Self {
        match folder {
            FolderArg::Any => FolderFilter::Any,
            FolderArg::Same => FolderFilter::Same,
            FolderArg::Different => FolderFilter::Different,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AgeArg {
    Unlimited,
    Year,
    Month,
    Week,
    Day,
}

impl From<AgeArg> for MaxAge {
    fn from(age: AgeArg) -> Self {
        match age {
            AgeArg::Unlimited => MaxAge::Unlimited,
            AgeArg::Year => MaxAge::Year,
            AgeArg::Month => MaxAge::Month,
            AgeArg::Week => MaxAge::Week,
            AgeArg::Day => MaxAge::Day,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output, one tab-separated pair per line
    Minimal,
}

/// What to print once the run is over
struct View {
    output: OutputFormat,
    lists: Vec<Category>,
    filter: PairFilter,
    limit: Option<usize>,
    verbose: bool,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            paths,
            workers,
            output,
            list,
            folder,
            max_age,
            limit,
            include_hidden,
            verbose,
        } => {
            let lists = if list.is_empty() {
                Category::ALL.to_vec()
            } else {
                Category::ALL
                    .into_iter()
                    .filter(|c| list.iter().any(|l| Category::from(*l) == *c))
                    .collect()
            };
            let view = View {
                output,
                lists,
                filter: PairFilter {
                    folder: folder.into(),
                    max_age: max_age.into(),
                },
                limit,
                verbose,
            };
            run_scan(paths, workers, include_hidden, view)
        }
    }
}

fn run_scan(
    paths: Vec<PathBuf>,
    workers: usize,
    include_hidden: bool,
    view: View,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(view.output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Similar Image Finder").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let pipeline = Pipeline::builder()
        .paths(paths)
        .workers(workers)
        .include_hidden(include_hidden)
        .build();

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(view.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_message(format!("Scanning ({} images)", p.images_found));
                }
                Event::Compare(CompareEvent::Started {
                    total_comparisons, ..
                }) => {
                    pb.set_length(total_comparisons as u64);
                    pb.set_position(0);
                }
                Event::Compare(CompareEvent::Progress(p)) => {
                    pb.set_position(p.comparisons_completed as u64);
                    pb.set_message(format!("{} pairs", p.pairs_found));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Cancelled)
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let outcome = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = outcome?;
    let shown = result
        .results
        .filtered(&view.filter, chrono::Utc::now());

    match view.output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, &shown, &view),
        OutputFormat::Json => print_json_results(&result, &shown, &view)?,
        OutputFormat::Minimal => print_minimal_results(&shown, &view),
    }

    Ok(())
}

fn limited<'a>(list: &'a [ImagePair], view: &View) -> &'a [ImagePair] {
    match view.limit {
        Some(limit) => &list[..limit.min(list.len())],
        None => list,
    }
}

fn print_pretty_results(term: &Term, result: &PipelineResult, shown: &ResultSet, view: &View) {
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images compared in {:.1}s ({} pairs)",
        style(result.total_images).cyan(),
        result.duration_ms as f64 / 1000.0,
        result.comparisons
    ))
    .ok();

    if !result.failed_images.is_empty() {
        term.write_line(&format!(
            "  {} images could not be read",
            style(result.failed_images.len()).yellow()
        ))
        .ok();
        if view.verbose {
            for path in &result.failed_images {
                term.write_line(&format!("    {} {}", style("!").yellow(), display_path(path)))
                    .ok();
            }
        }
    }

    if view.verbose {
        for error in &result.scan_errors {
            term.write_line(&format!("  {} {}", style("!").red(), error)).ok();
        }
    }

    if !view.filter.is_unrestricted() {
        term.write_line(&format!(
            "  {}",
            style(format!(
                "Showing pairs: folder {:?}, max age {:?}",
                view.filter.folder, view.filter.max_age
            ))
            .dim()
        ))
        .ok();
    }
    term.write_line("").ok();

    let codec = ImageCodec::new();

    for category in &view.lists {
        let list = shown.get(*category);
        term.write_line(&format!(
            "{} ({})",
            style(heading(*category)).bold().underlined(),
            list.len()
        ))
        .ok();

        if list.is_empty() {
            term.write_line(&format!("  {}", style("No pairs").dim())).ok();
            term.write_line("").ok();
            continue;
        }

        let pairs = limited(list, view);

        // identical-content marks need a re-read of every file shown
        let marks: Vec<Option<&'static str>> = if view.verbose {
            pairs.par_iter().map(|pair| identity_mark(pair, &codec)).collect()
        } else {
            vec![None; pairs.len()]
        };

        for (pair, mark) in pairs.iter().zip(marks) {
            term.write_line(&format!(
                "  {} {}",
                style(format_distance(*category, pair.distance)).yellow(),
                mark.map(|m| style(m).green().to_string()).unwrap_or_default()
            ))
            .ok();
            term.write_line(&format!("    {} {}", style("○").dim(), display_path(pair.first().path())))
                .ok();
            term.write_line(&format!("    {} {}", style("○").dim(), display_path(pair.second().path())))
                .ok();
            if view.verbose {
                term.write_line(&format!("    {}", style(pair.description()).dim()))
                    .ok();
            }
        }

        if pairs.len() < list.len() {
            term.write_line(&format!(
                "  {}",
                style(format!("... {} more", list.len() - pairs.len())).dim()
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("No files were changed. Review pairs before deleting anything.").dim()
    ))
    .ok();
}

fn print_json_results(result: &PipelineResult, shown: &ResultSet, view: &View) -> Result<()> {
    let lists: serde_json::Map<String, serde_json::Value> = view
        .lists
        .iter()
        .map(|category| {
            let pairs = limited(shown.get(*category), view);
            let value = serde_json::to_value(pairs)
                .map_err(|e| ImagePairError::Output(e.to_string()))?;
            Ok((category.to_string(), value))
        })
        .collect::<Result<_>>()?;

    let output = serde_json::json!({
        "total_images": result.total_images,
        "comparisons": result.comparisons,
        "failed_images": result.failed_images,
        "scan_errors": result.scan_errors,
        "duration_ms": result.duration_ms,
        "lists": lists,
    });

    let text =
        serde_json::to_string_pretty(&output).map_err(|e| ImagePairError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_minimal_results(shown: &ResultSet, view: &View) {
    for category in &view.lists {
        for pair in limited(shown.get(*category), view) {
            println!(
                "{}\t{}\t{}\t{}",
                category,
                pair.distance,
                pair.first().path().display(),
                pair.second().path().display()
            );
        }
    }
}

fn heading(category: Category) -> &'static str {
    match category {
        Category::Visual => "Visually similar",
        Category::Temporal => "Taken at about the same time",
        Category::Geospatial => "Taken at about the same place",
        Category::Combined => "Similar overall",
    }
}

/// Distance in the units of its list
fn format_distance(category: Category, distance: f64) -> String {
    match category {
        Category::Visual | Category::Combined => format!("{:.3}", distance),
        Category::Temporal => {
            humanize_duration(chrono::Duration::milliseconds((distance * 1000.0) as i64))
        }
        Category::Geospatial => humanize_distance(distance),
    }
}

fn identity_mark(pair: &ImagePair, codec: &ImageCodec) -> Option<&'static str> {
    let a = pair.first().fingerprints(codec)?;
    let b = pair.second().fingerprints(codec)?;
    if a.content == b.content {
        Some("identical files")
    } else if a.pixels == b.pixels {
        Some("identical pixels")
    } else {
        None
    }
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}
