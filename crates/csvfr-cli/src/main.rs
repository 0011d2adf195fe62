//! csvfr CLI
//!
//! Command-line tool for bulk find-and-replace across the cells of a CSV file.

use clap::{Parser, Subcommand};
use csvfr_core::{bootstrap, load_patterns, rewrite_cell, run, Config, RunSummary};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csvfr")]
#[command(about = "Bulk find-and-replace across CSV cells", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a find-replace file to every cell of an input file
    Run {
        /// Config file (default: <work_dir>/config.toml, created if missing)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input CSV file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Find-replace CSV file (pattern, replacement)
        #[arg(short, long)]
        find_replace: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Per-pattern statistics CSV file
        #[arg(short, long)]
        stats: Option<PathBuf>,

        /// Match patterns ignoring letter case
        #[arg(long)]
        ignore_case: bool,

        /// Verbosity level, 0 (quiet) to 3 (debug)
        #[arg(short, long)]
        verbose: Option<u8>,

        /// Log throughput every N lines
        #[arg(long)]
        throughput_every: Option<u64>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// Write the effective configuration (after flag overrides) to a file
        #[arg(long, value_name = "PATH")]
        save_config: Option<PathBuf>,
    },

    /// Load a find-replace file and list its patterns in matching order
    Patterns {
        /// Find-replace CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Apply a find-replace file to a single text
    Rewrite {
        /// Find-replace CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Text to rewrite
        text: String,

        /// Match patterns ignoring letter case
        #[arg(long)]
        ignore_case: bool,
    },

    /// Write the default config file
    InitConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    if let Err(e) = run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_cli() -> csvfr_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            input,
            find_replace,
            output,
            stats,
            ignore_case,
            verbose,
            throughput_every,
            json,
            save_config,
        } => {
            let (mut cfg, config_path) = bootstrap(config.as_deref())?;

            if let Some(path) = input {
                cfg.file_paths.input_file = path_setting(&path);
            }
            if let Some(path) = find_replace {
                cfg.file_paths.find_replace_file = path_setting(&path);
            }
            if let Some(path) = output {
                cfg.file_paths.output_file = path_setting(&path);
            }
            if let Some(path) = stats {
                cfg.file_paths.find_replace_sorted_file = path_setting(&path);
            }
            if ignore_case {
                cfg.common.case_insensitive = true;
            }
            if let Some(level) = verbose {
                cfg.common.verbose = level;
            }
            if let Some(every) = throughput_every {
                cfg.common.throughput_every = every;
            }

            init_logging(cfg.common.verbose);
            info!("using configuration {}", config_path.display());
            if let Some(path) = save_config {
                cfg.save(&path)?;
                info!("saved effective configuration to {}", path.display());
            }
            cmd_run(&cfg, json)
        }
        Commands::Patterns { file } => {
            init_logging(1);
            cmd_patterns(&file)
        }
        Commands::Rewrite {
            file,
            text,
            ignore_case,
        } => {
            init_logging(1);
            cmd_rewrite(&file, &text, ignore_case)
        }
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over `verbose`
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    }
}

fn path_setting(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn cmd_run(config: &Config, json: bool) -> csvfr_core::Result<()> {
    let summary = run(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let stats = &summary.statistics;
    println!("{} lines processed", stats.lines_processed);
    println!("{} cells processed", stats.cells_processed);
    println!("{} changed cells", stats.cells_changed);
    println!("{} find-and-replace operations", stats.replacements_made);
    println!();
    println!(
        "Patterns: {} ({} rows skipped)",
        summary.patterns, summary.skipped_patterns
    );
    println!("Input file: {}", summary.input_file.display());
    println!("Output file: {}", summary.output_file.display());
    println!("Statistics file: {}", summary.stats_file.display());
    println!("Elapsed: {} ms", summary.elapsed_ms);
}

fn cmd_patterns(file: &Path) -> csvfr_core::Result<()> {
    let table = load_patterns(file)?;

    println!("File: {}", file.display());
    println!("Patterns: {}", table.len());
    println!("Skipped rows: {}", table.skipped());
    println!();

    println!("#\tlen\tpattern\treplacement");
    println!("{}", "-".repeat(48));
    for (i, entry) in table.entries().iter().enumerate() {
        println!(
            "{}\t{}\t{}\t{}",
            i + 1,
            entry.pattern_len(),
            entry.pattern,
            entry.replacement
        );
    }

    Ok(())
}

fn cmd_rewrite(file: &Path, text: &str, ignore_case: bool) -> csvfr_core::Result<()> {
    let mut table = load_patterns(file)?;
    let outcome = rewrite_cell(text, &mut table, ignore_case);

    println!("{}", outcome.text);
    println!();
    println!("Replacements: {}", outcome.replacements);
    for entry in table.entries().iter().filter(|e| e.match_count > 0) {
        println!("  {} -> {} ({})", entry.pattern, entry.replacement, entry.match_count);
    }

    Ok(())
}

fn cmd_init_config(output: &Path) -> csvfr_core::Result<()> {
    std::fs::write(output, csvfr_core::config::DEFAULT_CONFIG)?;

    println!("Created config file: {}", output.display());
    println!();
    println!("Edit the file to configure your run, then run:");
    println!("  csvfr run --config {}", output.display());

    Ok(())
}
