//! CLI binary for pagexml2ds.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExportConfig`, writes records to disk (PNG crops plus JSONL metadata),
//! and prints the run summary.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagexml2ds::{DataSource, ExportConfig, ExportMode, Exporter, LayoutParser};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pagexml2ds",
    version,
    about = "Convert PAGE XML layout exports into ML-ready image/text records"
)]
struct Cli {
    /// ZIP archive or folder containing PAGE XML files and images
    source: PathBuf,

    /// Export mode
    #[arg(long, value_enum, default_value_t = ExportMode::Text)]
    mode: ExportMode,

    /// PAGE XML namespace URI override
    #[arg(long)]
    namespace: Option<String>,

    /// Lines per window (window mode only)
    #[arg(long, default_value_t = 2)]
    window_size: usize,

    /// Lines shared between consecutive windows (window mode only)
    #[arg(long, default_value_t = 0)]
    overlap: usize,

    /// Mask crops to the exact polygon, painting everything outside white
    #[arg(long)]
    mask_crop: bool,

    /// Minimum width of cropped regions/lines in pixels
    #[arg(long)]
    min_width: Option<u32>,

    /// Keep regions and lines without transcribed text
    #[arg(long)]
    allow_empty: bool,

    /// Only show statistics, don't export
    #[arg(long)]
    stats_only: bool,

    /// Directory to write the dataset to (default: ./pagexml_dataset_<mode>)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Train split ratio, between 0 and 1 (e.g. 0.8 for 80% train).
    /// No split when absent.
    #[arg(long)]
    split_train: Option<f64>,

    /// Random seed for the train/test split
    #[arg(long, default_value_t = 42)]
    split_seed: u64,

    /// Shuffle records before splitting
    #[arg(long)]
    split_shuffle: bool,

    /// Remote image fetch timeout in seconds
    #[arg(long, default_value_t = 20)]
    fetch_timeout: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(ratio) = cli.split_train {
        if !(0.0..1.0).contains(&ratio) || ratio == 0.0 {
            bail!("--split-train must be between 0 and 1 (exclusive), got {ratio}");
        }
    }
    if cli.min_width == Some(0) {
        bail!("--min-width must be a positive integer");
    }

    let source = DataSource::open(&cli.source)
        .with_context(|| format!("cannot open source '{}'", cli.source.display()))?;

    let parser = LayoutParser::new(cli.namespace.as_deref());
    let pages = parser.parse_source(&source)?;

    if cli.stats_only {
        print_stats(&pages, &cli);
        return Ok(());
    }

    let config = ExportConfig::builder()
        .mode(cli.mode)
        .window_size(cli.window_size)
        .overlap(cli.overlap)
        .mask(cli.mask_crop)
        .allow_empty(cli.allow_empty)
        .fetch_timeout_secs(cli.fetch_timeout);
    let config = match cli.min_width {
        Some(px) => config.min_width(px),
        None => config,
    };
    let config = config.build()?;

    let output_dir = cli.output_dir.clone().unwrap_or_else(|| {
        let mut suffix = format!("pagexml_dataset_{}", cli.mode);
        if cli.mode == ExportMode::Window {
            suffix.push_str(&format!("_w{}_o{}", cli.window_size, cli.overlap));
        }
        PathBuf::from(suffix)
    });

    let count = write_dataset(&source, config, &pages, &cli, &output_dir)?;

    println!(
        "{} {} records written to {}",
        green("✓"),
        bold(&count.to_string()),
        output_dir.display()
    );
    Ok(())
}

// ── Dataset writing ──────────────────────────────────────────────────────────

/// Export all records, saving one PNG per record plus JSONL metadata.
///
/// Returns the number of records written.
fn write_dataset(
    source: &DataSource,
    config: ExportConfig,
    pages: &[pagexml2ds::Page],
    cli: &Cli,
    output_dir: &PathBuf,
) -> Result<usize> {
    let images_dir = output_dir.join("images");
    std::fs::create_dir_all(&images_dir)
        .with_context(|| format!("cannot create '{}'", images_dir.display()))?;

    let exporter = Exporter::new(source.clone(), config)?;

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {pos} records  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut rows: Vec<serde_json::Value> = Vec::new();
    for (idx, record) in exporter.export(pages).enumerate() {
        let image_rel = format!("images/{idx:06}.png");
        let mut row = serde_json::to_value(&record).context("serializing record metadata")?;
        let serde_json::Value::Object(ref mut fields) = row else {
            bail!("record metadata did not serialize to a JSON object");
        };
        fields.insert("image".into(), serde_json::Value::String(image_rel.clone()));

        record
            .into_image()
            .save(output_dir.join(&image_rel))
            .with_context(|| format!("cannot write '{image_rel}'"))?;

        rows.push(row);
        bar.inc(1);
    }
    bar.finish_and_clear();

    exporter.log_summary();

    match cli.split_train {
        Some(ratio) => {
            let mut indices: Vec<usize> = (0..rows.len()).collect();
            if cli.split_shuffle {
                let mut rng = StdRng::seed_from_u64(cli.split_seed);
                indices.shuffle(&mut rng);
            }
            let train_len = (rows.len() as f64 * ratio).round() as usize;
            write_jsonl(&output_dir.join("train.jsonl"), &rows, &indices[..train_len])?;
            write_jsonl(&output_dir.join("test.jsonl"), &rows, &indices[train_len..])?;
            println!(
                "{}",
                dim(&format!(
                    "  split: {} train / {} test (seed {}, shuffle: {})",
                    train_len,
                    rows.len() - train_len,
                    cli.split_seed,
                    cli.split_shuffle
                ))
            );
        }
        None => {
            let all: Vec<usize> = (0..rows.len()).collect();
            write_jsonl(&output_dir.join("metadata.jsonl"), &rows, &all)?;
        }
    }

    Ok(rows.len())
}

fn write_jsonl(path: &PathBuf, rows: &[serde_json::Value], indices: &[usize]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    for &idx in indices {
        writeln!(writer, "{}", rows[idx]).with_context(|| format!("writing '{}'", path.display()))?;
    }
    Ok(())
}

// ── Statistics ───────────────────────────────────────────────────────────────

fn print_stats(pages: &[pagexml2ds::Page], cli: &Cli) {
    let total_regions: usize = pages.iter().map(|p| p.regions.len()).sum();
    let total_lines: usize = pages.iter().map(|p| p.line_count()).sum();
    let projects: BTreeSet<&str> = pages.iter().map(|p| p.project_name.as_str()).collect();

    println!("{}", bold("Dataset Statistics:"));
    println!("  Total pages: {}", pages.len());
    println!("  Total regions: {total_regions}");
    println!("  Total lines: {total_lines}");
    println!(
        "  Projects: {}",
        projects.iter().copied().collect::<Vec<_>>().join(", ")
    );
    if !pages.is_empty() {
        println!(
            "  Avg regions per page: {:.1}",
            total_regions as f64 / pages.len() as f64
        );
        println!(
            "  Avg lines per page: {:.1}",
            total_lines as f64 / pages.len() as f64
        );
    }

    if cli.mode == ExportMode::Window && cli.overlap < cli.window_size && cli.window_size > 0 {
        let step = cli.window_size - cli.overlap;
        let windows: usize = pages
            .iter()
            .flat_map(|p| p.regions.iter())
            .map(|r| window_count(r.lines.len(), cli.window_size, step))
            .sum();
        println!(
            "  Windows (window_size={}, overlap={}): {windows}",
            cli.window_size, cli.overlap
        );
    }
}

/// Number of sliding windows over `n` lines (trailing partial included).
fn window_count(n: usize, window_size: usize, step: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1 + (n.saturating_sub(window_size) + step - 1) / step
}
