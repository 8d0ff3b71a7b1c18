//! Main entry point for the zipguard CLI application.
//!
//! This binary provides a command-line interface for listing and safely
//! extracting local ZIP archives.

use anyhow::{Context, Result};
use clap::Parser;

use zipguard::{Cli, Diagnostics, Unzipper, ZipFileEntry};

/// Application entry point.
///
/// Parses command-line arguments, sets up logging, and dispatches to
/// listing or extraction.
fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbosity.as_filter())
        .parse_default_env()
        .init();

    let unzipper = Unzipper::new(cli.extract_options());

    // List mode: display archive contents and exit
    if cli.is_listing() {
        let entries = unzipper
            .list(&cli.file)
            .with_context(|| format!("cannot read {}", cli.file.display()))?;
        list_files(&entries, cli.verbose);
        return Ok(());
    }

    log::info!("Starting extraction of archive {:?}", cli.file);
    let mut diagnostics = Diagnostics::new();
    let result = match unzipper.extract(&cli.file, &mut diagnostics) {
        Ok(result) => result,
        Err(e) => {
            eprint!("{}", diagnostics.error_string("zipguard: ", "\n"));
            return Err(e).with_context(|| format!("failed to extract {}", cli.file.display()));
        }
    };

    if !cli.quiet {
        for file in &result.files {
            println!("  inflated: {}", file.display());
        }
    }
    log::info!(
        "Archive {:?} extracted: {} files written, {} entries skipped",
        cli.file,
        result.files.len(),
        result.skipped
    );

    Ok(())
}

/// List files in the ZIP archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
fn list_files(entries: &[ZipFileEntry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    // Track totals for summary line
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        // Accumulate totals (excluding directories)
        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );
}

/// Compression ratio as percentage saved, right-aligned to five columns.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return "   0%".to_string();
    }
    format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
}
