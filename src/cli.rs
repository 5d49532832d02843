//! Command-line interface module for dirsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Loading the category rules
//! - Running the organizer in the background
//! - Presenting the result

use crate::background::spawn_organize;
use crate::category_rules::CategoryRules;
use crate::config::CategoryConfig;
use crate::organizer::OrganizeResult;
use crate::output::OutputFormatter;
use clap::Parser;
use log::debug;
use std::path::{Path, PathBuf};

/// Sort the files of a directory into category folders by extension.
#[derive(Parser, Debug, Clone)]
#[command(name = "dirsort", version, about)]
pub struct Cli {
    /// Directory whose files should be organized
    pub directory: PathBuf,

    /// Category rules file (JSON, or TOML when it ends in .toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show what would be moved without touching anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// List every moved file and enable info logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runs the CLI application with parsed arguments.
///
/// # Examples
///
/// ```no_run
/// use dirsort::cli::{run_cli, Cli};
/// use clap::Parser;
///
/// let cli = Cli::parse_from(["dirsort", "/path/to/directory", "--dry-run"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), String> {
    let result = run_cli_with_config(&cli.directory, cli.config.as_deref(), cli.dry_run)?;
    if cli.verbose {
        print_operations(&result);
    }
    Ok(())
}

/// Organizes `dir_path` and prints the outcome.
///
/// This function:
/// 1. Loads the category rules (explicit file, discovered file or built-in)
/// 2. Warns about extensions claimed by several categories
/// 3. Runs the organizer on a background thread behind a spinner
/// 4. Prints the summary, or "nothing to organize" when nothing happened
///
/// Configuration and path errors are returned before any file is touched.
/// Files that fail to move are reported but do not make this function fail.
pub fn run_cli_with_config(
    dir_path: &Path,
    config_path: Option<&Path>,
    dry_run: bool,
) -> Result<OrganizeResult, String> {
    let (config, loaded_from) = CategoryConfig::locate_and_load(config_path)
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let rules = CategoryRules::from_config(config)
        .map_err(|e| format!("Error in configuration: {}", e))?
        .with_dry_run(dry_run);

    for duplicate in rules.duplicate_extensions() {
        OutputFormatter::warning(&format!(
            "Extension {} is listed in both {} and {}; using {}",
            duplicate.extension, duplicate.overridden, duplicate.winner, duplicate.winner
        ));
    }

    if rules.is_dry_run() {
        OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", dir_path.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", dir_path.display()));
    }

    let handle = spawn_organize(dir_path, rules, excluded_paths(loaded_from))
        .map_err(|e| e.to_string())?;

    let spinner = OutputFormatter::create_spinner("Sorting files...");
    let outcome = handle.wait();
    spinner.finish_and_clear();

    let result = outcome.map_err(|e| e.to_string())?;
    print_result(&result);
    Ok(result)
}

/// Files that must stay put even if they live in the target directory.
fn excluded_paths(config_file: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = config_file.into_iter().collect();
    match std::env::current_exe() {
        Ok(exe) => paths.push(exe),
        Err(e) => debug!("Could not locate own executable: {}", e),
    }
    paths
}

/// Prints the tally of a finished run.
pub fn print_result(result: &OrganizeResult) {
    if result.is_empty() {
        OutputFormatter::info("Nothing to organize: no files were found.");
        return;
    }

    if !result.category_counts.is_empty() {
        OutputFormatter::summary_table(&result.category_counts, result.moved);
    }

    if !result.created_categories.is_empty() {
        OutputFormatter::header(if result.dry_run {
            "FOLDERS THAT WOULD BE USED"
        } else {
            "FOLDERS CREATED"
        });
        for category in &result.created_categories {
            OutputFormatter::plain(&format!("  {}/", category));
        }
    }

    OutputFormatter::status(result.moved, result.failed, result.dry_run);

    for failure in &result.failures {
        OutputFormatter::error(&format!("{}: {}", failure.path.display(), failure.reason));
    }

    if result.dry_run {
        OutputFormatter::dry_run_notice("No files were modified.");
    } else if result.failed == 0 {
        OutputFormatter::success("Organization complete!");
    } else {
        OutputFormatter::warning("Some files could not be organized. Please review errors above.");
    }
}

fn print_operations(result: &OrganizeResult) {
    if result.operations.is_empty() {
        return;
    }
    OutputFormatter::header("FILES");
    let arrow = if result.dry_run { "would move to" } else { "→" };
    for operation in &result.operations {
        OutputFormatter::plain(&format!(
            "  {} {} {}",
            operation.original_path.display(),
            arrow,
            operation.new_path.display()
        ));
    }
}
