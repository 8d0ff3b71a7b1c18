use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::extract::{DEFAULT_DIR_MODE, ExtractOptions};

#[derive(Parser, Debug)]
#[command(name = "zipguard")]
#[command(version)]
#[command(about = "Extract ZIP archives without letting them escape the target directory", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipguard data1.zip -d out            extract data1.zip into out/\n  \
  zipguard photos.zip -j -a png jpg    extract only images, flattened\n  \
  zipguard -v data1.zip                list archive contents verbosely")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with sizes and timestamps
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files into exdir (default: the archive's directory)
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<PathBuf>,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Only extract files with these extensions
    #[arg(short = 'a', value_name = "EXT", num_args = 1..)]
    pub allow: Vec<String>,

    /// Octal mode for created directories (subject to umask)
    #[arg(long = "dir-mode", value_name = "MODE", value_parser = parse_octal_mode)]
    pub dir_mode: Option<u32>,

    /// Skip CRC-32 verification of extracted data
    #[arg(long = "no-crc")]
    pub no_crc: bool,

    /// Quiet mode, do not print extracted paths
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Verbosity level for logging
    #[arg(long, value_name = "LEVEL", value_enum, default_value = "warn")]
    pub verbosity: Verbosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Verbosity {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            Verbosity::Off => log::LevelFilter::Off,
            Verbosity::Error => log::LevelFilter::Error,
            Verbosity::Warn => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Trace => log::LevelFilter::Trace,
        }
    }
}

fn parse_octal_mode(value: &str) -> Result<u32, String> {
    let digits = value.strip_prefix("0o").unwrap_or(value);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        Ok(_) => Err(format!("mode {value} is out of range")),
        Err(_) => Err(format!("{value} is not an octal mode")),
    }
}

impl Cli {
    pub fn is_listing(&self) -> bool {
        self.list || self.verbose
    }

    /// Extraction options described by the flags.
    pub fn extract_options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::default()
            .with_preserve_filepath(!self.junk_paths)
            .with_directory_creation_mode(Some(self.dir_mode.unwrap_or(DEFAULT_DIR_MODE)))
            .with_crc_check(!self.no_crc);
        if let Some(dir) = &self.extract_dir {
            options = options.with_target_dir(dir);
        }
        if !self.allow.is_empty() {
            options = options.with_allowed_extensions(self.allow.iter().cloned());
        }
        options
    }
}
