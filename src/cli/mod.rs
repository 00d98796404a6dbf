//! airfuse CLI Module
//!
//! Command-line interface for fusing, labeling and inspecting air-quality data.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::labeling::{LabelingOutcome, SourceLabel};
use crate::pipeline::{FusionOutput, FusionPipeline, LabelingStage, PipelineConfig};
use crate::preprocessing::DataQualityScorer;
use crate::schema::SchemaDescriptor;
use crate::utils::DataLoader;

// ─── Output styling ────────────────────────────────────────────────────────────

fn faint(s: &str) -> ColoredString { s.truecolor(110, 110, 110) }
fn label_text(s: &str) -> ColoredString { s.truecolor(150, 150, 150) }
fn good(s: &str) -> ColoredString { s.truecolor(90, 200, 140) }
fn caution(s: &str) -> ColoredString { s.truecolor(235, 180, 80) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", faint(&"─".repeat(56)));
}

fn note_ok(msg: &str) {
    println!("  {} {}", good("✓"), msg);
}

fn note_warn(msg: &str) {
    println!("  {} {}", caution("!"), msg);
}

/// One timed step line: `› Fusing... done 5 rows in 12ms`
struct Progress {
    start: Instant,
}

impl Progress {
    fn start(msg: &str) -> Self {
        print!("  {} {}... ", "›".truecolor(120, 170, 255), msg);
        Self { start: Instant::now() }
    }

    fn done(self, detail: &str) {
        println!("{} {} {}", good("done"), faint(detail), faint(&format!("({:?})", self.start.elapsed())));
    }
}

/// Framed key/value table sized to its widest row
fn summary_box(title: &str, rows: &[(&str, String)]) {
    let key_width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let inner = rows
        .iter()
        .map(|(_, v)| key_width + 1 + v.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0)
        + 2;

    let edge = |l: &str, r: &str| println!("  {}", faint(&format!("{l}{}{r}", "─".repeat(inner))));
    let row = |text: String, visible: usize| {
        println!("  {} {}{} {}", faint("│"), text, " ".repeat(inner - 2 - visible), faint("│"));
    };

    edge("┌", "┐");
    row(title.white().bold().to_string(), title.chars().count());
    edge("├", "┤");
    for (key, value) in rows {
        let visible = key_width + 1 + value.chars().count();
        row(format!("{} {}", label_text(&format!("{key:<key_width$}")), value.white()), visible);
    }
    edge("└", "┘");
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "airfuse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Air-quality data fusion and pollution source labeling")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the pipeline commands
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Directory holding the source tables
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving the outputs (defaults to the data directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl PipelineArgs {
    /// Config file (or defaults) with directory flags applied on top
    pub fn resolve(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.paths.data_dir = dir.clone();
            if self.output_dir.is_none() {
                config.paths.output_dir = dir.clone();
            }
        }
        if let Some(dir) = &self.output_dir {
            config.paths.output_dir = dir.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fuse pollutant, weather and geographic tables into the processed table
    Process(PipelineArgs),

    /// Label the processed table with pollution sources
    Label(PipelineArgs),

    /// Process, then label
    Run(PipelineArgs),

    /// Show schema and quality of a data file
    Info {
        /// Input data file (CSV or Parquet)
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_process(args: &PipelineArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    section("Process");
    process(config)?;
    println!();
    Ok(())
}

pub fn cmd_label(args: &PipelineArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    section("Label");
    label(config)?;
    println!();
    Ok(())
}

pub fn cmd_run(args: &PipelineArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    section("Process");
    let output = process(config.clone())?;
    section("Label");
    let outcome = label(config)?;
    print_summary(&output, &outcome);
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::new().load_auto(data_path)?;
    let schema = SchemaDescriptor::describe(&df);
    let quality = DataQualityScorer::from_frame(&df)?;

    println!("  {:<12} {}", label_text("File"), data_path.display());
    println!("  {:<12} {}", label_text("Rows"), df.height());
    println!("  {:<12} {}", label_text("Columns"), df.width());
    println!("  {:<12} {:.3}", label_text("Quality"), quality.overall_score);
    println!();

    println!(
        "  {:<26} {:<12} {:>6} {:>8}",
        label_text("Column"),
        label_text("Role"),
        label_text("Nulls"),
        label_text("Unique")
    );
    println!("  {}", faint(&"─".repeat(56)));

    for (col, q) in schema.columns.iter().zip(&quality.per_column) {
        println!(
            "  {:<26} {:<12} {:>6} {:>8}",
            col.name,
            format!("{:?}", col.semantic_type).truecolor(140, 140, 140),
            col.null_count,
            q.distinct_count
        );
    }

    if !quality.warnings.is_empty() {
        println!();
        for warning in &quality.warnings {
            note_warn(&format!("{warning:?}"));
        }
    }

    println!();
    Ok(())
}

fn process(config: PipelineConfig) -> anyhow::Result<FusionOutput> {
    let pipeline = FusionPipeline::new(config);
    let paths = pipeline.config().paths.clone();

    let step = Progress::start("Loading inputs");
    let inputs = pipeline.load_inputs()?;
    step.done(&format!(
        "{} readings, {} weather rows, geography {}",
        inputs.measurements.height(),
        inputs.weather.height(),
        if inputs.geography.is_some() { "present" } else { "absent" },
    ));

    let step = Progress::start("Fusing");
    let mut output = pipeline.run(inputs)?;
    step.done(&format!(
        "{} rows × {} cols",
        output.processed.height(),
        output.processed.width(),
    ));

    let step = Progress::start(&format!("Saving → {}", paths.output_dir.display()));
    pipeline.write_outputs(&mut output)?;
    step.done(&paths.processed_file);

    note_ok(&format!("join strategy {:?}", output.manifest.join_strategy));
    for warning in &output.report.warnings {
        note_warn(&warning.to_string());
    }
    Ok(output)
}

fn label(config: PipelineConfig) -> anyhow::Result<LabelingOutcome> {
    let labeled_file = config.paths.labeled_file.clone();
    let stage = LabelingStage::new(config);

    let step = Progress::start("Labeling");
    let (_, outcome) = stage.run_from_paths()?;
    step.done(&format!("{} rows → {}", outcome.distribution.total, labeled_file));

    if outcome.dropped_rows > 0 {
        note_warn(&format!("{} rows without coordinates dropped", outcome.dropped_rows));
    }
    if outcome.rebalanced {
        note_warn("Natural labels dominated; rules re-applied as batch policy");
    }

    println!();
    for label in SourceLabel::PRIORITY {
        let count = outcome.distribution.count(label);
        println!(
            "  {:<14} {:>6}  {}",
            label_text(label.as_str()),
            count.to_string().white().bold(),
            faint(&format!("{:.1}%", outcome.distribution.fraction(label) * 100.0))
        );
    }
    if outcome.distribution.distinct() < 2 {
        note_warn("only one pollution source class present");
    }
    Ok(outcome)
}

fn print_summary(output: &FusionOutput, outcome: &LabelingOutcome) {
    println!();
    summary_box(
        "airfuse run",
        &[
            ("Fused rows", output.processed.height().to_string()),
            ("Features", output.manifest.features.len().to_string()),
            ("Model features", output.manifest.model_features.len().to_string()),
            ("Quality", format!("{:.3}", output.quality.overall_score)),
            ("Labeled rows", outcome.distribution.total.to_string()),
            ("Warnings", output.report.warnings.len().to_string()),
        ],
    );
    println!();
}
