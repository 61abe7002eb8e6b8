//! cryptic-ip: screening for buried inositol-phosphate binding sites
//!
//! Pocket detection (fpocket), SASA (FreeSASA) and electrostatics (APBS)
//! run upstream; this tool consumes their per-pocket measurements as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Score one structure
//! cryptic-ip score --input measurements/AF-P78563-F1.json
//!
//! # Screen a directory of measurement files with resume support
//! cryptic-ip screen --input-dir measurements/ --output candidates.csv \
//!     --checkpoint screen.ckpt.json --jobs 8
//!
//! # Check the configuration against control proteins
//! cryptic-ip validate --controls controls.json --measurements measurements/
//!
//! # Compare a predicted model with a crystal structure
//! cryptic-ip rmsd --model AF-P78563-F1.pdb --reference 1ZY7.pdb \
//!     --residues 376,519,522,651,672 --ca-only
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use cryptic_core::{AnalysisResult, ScoredPocket};
use cryptic_scoring::{
    by_max_score, collect_candidates, read_measurements, write_candidates_csv_file,
    BatchCoordinator, CheckpointStore, JsonDirectorySource, JsonFileCheckpointStore,
    MemoryCheckpointStore, PocketAnalyzer, ScreenConfig,
};
use cryptic_validation::{
    calculate_rmsd, ControlKind, ControlSet, ResidueSelection, StructureCoords, ValidationReport,
    ValidationSuite,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Structures listed by best score in the screen summary
const TOP_STRUCTURES: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "cryptic-ip")]
#[command(version = VERSION)]
#[command(about = "Composite scoring and screening of cryptic inositol-phosphate binding sites")]
#[command(long_about = r#"
Scores protein pockets for buried inositol-phosphate (IP) binding sites.

Each pocket's volume, depth, SASA, electrostatic potential and basic-residue
count are normalized, combined into a weighted composite score, thresholded
and ranked. Control proteins with known sites check the configuration
before it is used on a proteome.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score the pockets of one structure
    Score(ScoreArgs),

    /// Screen every measurement file in a directory
    Screen(ScreenArgs),

    /// Run positive and negative controls through the scoring pipeline
    Validate(ValidateArgs),

    /// Superposed RMSD between a model and a reference structure
    Rmsd(RmsdArgs),
}

#[derive(Parser, Debug)]
struct ScoreArgs {
    /// Measurement JSON (a structure record or a bare pocket list)
    #[arg(short, long)]
    input: PathBuf,

    /// Screening configuration (TOML)
    #[arg(short, long, env = "CRYPTIC_CONFIG")]
    config: Option<PathBuf>,

    /// Override the score threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Print the analysis result as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ScreenArgs {
    /// Directory of <structure_id>.json measurement files
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Candidate table (CSV)
    #[arg(short, long)]
    output: PathBuf,

    /// Checkpoint file; an existing file resumes the screen
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Worker threads (overrides the configuration)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Override the score threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Screening configuration (TOML)
    #[arg(short, long, env = "CRYPTIC_CONFIG")]
    config: Option<PathBuf>,

    /// Passing pockets exported per structure
    #[arg(long, default_value = "3")]
    per_structure: usize,

    /// Accept structures added since the checkpoint was written
    #[arg(long)]
    extend: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Control set (JSON); the built-in catalog when omitted
    #[arg(long)]
    controls: Option<PathBuf>,

    /// Directory holding the controls' measurement files
    #[arg(short, long)]
    measurements: PathBuf,

    /// Screening configuration (TOML)
    #[arg(short, long, env = "CRYPTIC_CONFIG")]
    config: Option<PathBuf>,

    /// Also write the full report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RmsdArgs {
    /// Predicted model (PDB)
    #[arg(long)]
    model: PathBuf,

    /// Experimental reference (PDB)
    #[arg(long)]
    reference: PathBuf,

    /// Residue numbers to superpose, comma separated; all when omitted
    #[arg(long, value_delimiter = ',')]
    residues: Vec<i32>,

    /// Restrict to one chain
    #[arg(long)]
    chain: Option<char>,

    /// Only Cα atoms
    #[arg(long)]
    ca_only: bool,
}

fn load_config(path: Option<&Path>, threshold: Option<f64>) -> Result<ScreenConfig> {
    let mut config = match path {
        Some(path) => ScreenConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ScreenConfig::default(),
    };
    if let Some(threshold) = threshold {
        config.score_threshold = threshold;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn structure_id_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("structure")
        .to_string()
}

fn cmd_score(args: ScoreArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.threshold)?;
    let analyzer = PocketAnalyzer::new(&config)?;

    let measured = read_measurements(&args.input, &structure_id_of(&args.input))
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let result = analyzer.analyze(measured);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &AnalysisResult) {
    let name = result.structure.protein_name.as_deref().unwrap_or("");
    println!();
    println!("  {} {}", result.structure.accession, name);
    println!("  {}", "─".repeat(96));
    println!(
        "  {:>4} {:>6} {:>6}  {:>7} {:>6} {:>6} {:>6} {:>5}  {}",
        "Rank", "Pocket", "Score", "Vol", "Depth", "SASA", "Pot", "Basic", "Class"
    );
    for pocket in &result.pockets {
        print_pocket(pocket);
    }
    for rejected in &result.rejected {
        println!("  {:>4} {:>6}  rejected: {}", "-", rejected.pocket_id, rejected.reason);
    }
    println!("  {}", "─".repeat(96));
    println!(
        "  Verdict: {:?} (threshold {:.2}, {} passing)",
        result.verdict,
        result.score_threshold,
        result.passing().count()
    );
    println!();
}

fn print_pocket(pocket: &ScoredPocket) {
    let m = &pocket.measurement;
    let mut flags = Vec::new();
    if pocket.passed_threshold {
        flags.push("PASS");
    }
    if pocket.low_confidence {
        flags.push("low pLDDT");
    }
    if pocket.meets_criteria == Some(false) {
        flags.push("criteria");
    }
    println!(
        "  {:>4} {:>6} {:>6.3}  {:>7.1} {:>6.1} {:>6.1} {:>6} {:>5}  {} [{}]",
        pocket.rank,
        m.id,
        pocket.score,
        m.volume,
        m.depth,
        m.sasa,
        m.potential.map(|p| format!("{:.1}", p)).unwrap_or_else(|| "-".to_string()),
        m.basic_residues,
        pocket.classification.as_str(),
        flags.join(", ")
    );
}

fn cmd_screen(args: ScreenArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), args.threshold)?;
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if args.extend {
        config.allow_checkpoint_extension = true;
    }
    config.validate().context("Invalid configuration")?;

    let source = JsonDirectorySource::new(&args.input_dir);
    let ids = source
        .discover()
        .with_context(|| format!("Failed to list {}", args.input_dir.display()))?;
    if ids.is_empty() {
        anyhow::bail!("No measurement files found in {}", args.input_dir.display());
    }

    let mut store: Box<dyn CheckpointStore> = match &args.checkpoint {
        Some(path) => Box::new(
            JsonFileCheckpointStore::open(path)
                .with_context(|| format!("Failed to open checkpoint {}", path.display()))?,
        ),
        None => Box::new(MemoryCheckpointStore::new()),
    };

    let coordinator = BatchCoordinator::new(&config)?;
    let report = coordinator
        .screen(&ids, &source, store.as_mut())
        .context("Screen aborted")?;

    let rows = collect_candidates(report.results(), args.per_structure);
    write_candidates_csv_file(&args.output, &rows)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Wrote {} candidates to {}", rows.len(), args.output.display());

    let summary = report.summary();
    println!();
    println!("  SCREEN SUMMARY");
    println!("  {}", "─".repeat(60));
    println!("  Requested:    {:>8}", summary.requested);
    println!("  Done:         {:>8}  ({} from checkpoint)", summary.done, summary.skipped);
    println!("  Failed:       {:>8}", summary.failed);
    println!("  Not reached:  {:>8}", summary.not_reached);
    println!("  Candidates:   {:>8}", summary.candidates);
    for (class, count) in summary.top_by_class {
        println!("    {:<52} {:>5}", class.as_str(), count);
    }
    let mut ranked: Vec<&AnalysisResult> = report
        .results()
        .filter(|r| r.max_score().is_some())
        .collect();
    ranked.sort_by(|a, b| by_max_score(a, b));
    if !ranked.is_empty() {
        println!("  Top structures:");
        for result in ranked.iter().take(TOP_STRUCTURES) {
            println!(
                "    {:<44} {:>7.3}  {:?}",
                result.structure.accession,
                result.max_score().unwrap_or_default(),
                result.verdict
            );
        }
    }
    println!("  Elapsed:      {:>8.1} s", summary.elapsed_secs);
    if summary.cancelled {
        println!("  Screen was cancelled; rerun with the same checkpoint to resume.");
    }
    for failed in report.failed() {
        if let Some(failure) = failed.outcome.failure() {
            println!("  ✗ {} ({:?}): {}", failed.structure_id, failure.stage, failure.cause);
        }
    }
    println!();
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), None)?;
    let controls = match &args.controls {
        Some(path) => ControlSet::from_file(path)
            .with_context(|| format!("Failed to load controls {}", path.display()))?,
        None => ControlSet::builtin(),
    };

    let source = JsonDirectorySource::new(&args.measurements);
    let suite = ValidationSuite::new(&config)?;
    let report = suite.validate(&controls.positives, &controls.negatives, &source);

    print_validation(&report);
    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let failed = report.failed().count();
    if failed > 0 {
        anyhow::bail!("{} of {} controls failed", failed, report.records.len());
    }
    Ok(())
}

fn print_validation(report: &ValidationReport) {
    println!();
    println!("  CONTROL VALIDATION (threshold {:.2})", report.score_threshold);
    println!("  {}", "─".repeat(72));
    for record in &report.records {
        let score = record
            .top_score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "-".to_string());
        let expected = record
            .expected_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {:<10} {:<8} top {:>6}  expected {:>5}",
            if record.passed { "✓" } else { "✗" },
            record.name,
            match record.kind {
                ControlKind::Positive => "positive",
                ControlKind::Negative => "negative",
            },
            score,
            expected
        );
        if let Some(overlap) = record.overlap {
            println!("      residue overlap {:.0}%", overlap * 100.0);
        }
        for check in &record.criteria {
            println!("      {} {}", if check.passed { "✓" } else { "✗" }, check.name);
        }
        if let Some(rmsd) = record.rmsd {
            println!("      RMSD {:.2} Å", rmsd);
        }
        if let Some(error) = &record.error {
            println!("      error: {}", error);
        }
    }
    println!("  {}", "─".repeat(72));
    match report.separation.separation {
        Some(s) => println!("  Separation (min positive - max negative): {:+.3}", s),
        None => println!("  Separation: n/a"),
    }
    if let Some(mean) = &report.mean_separation {
        println!(
            "  Mean positive {:.3}, mean negative {:.3}, difference {:.3}{}",
            mean.positive_mean,
            mean.negative_mean,
            mean.difference,
            if mean.clear_separation { " (clear)" } else { "" }
        );
    }
    println!();
}

fn cmd_rmsd(args: RmsdArgs) -> Result<()> {
    let model = StructureCoords::from_pdb_file(&args.model)
        .with_context(|| format!("Failed to read {}", args.model.display()))?;
    let reference = StructureCoords::from_pdb_file(&args.reference)
        .with_context(|| format!("Failed to read {}", args.reference.display()))?;

    let mut selection = ResidueSelection::residues(args.residues);
    if let Some(chain) = args.chain {
        selection = selection.chain(chain);
    }
    if args.ca_only {
        selection = selection.ca_only();
    }

    let atoms = model.select(&selection).len();
    let rmsd = calculate_rmsd(&model, &reference, &selection)?;
    println!("RMSD: {:.3} Å over {} atoms", rmsd, atoms);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score(args) => cmd_score(args),
        Commands::Screen(args) => cmd_screen(args),
        Commands::Validate(args) => cmd_validate(args),
        Commands::Rmsd(args) => cmd_rmsd(args),
    }
}
