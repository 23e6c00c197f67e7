use crate::generator::Generator;
use crate::merge::apply_overrides;
use crate::parser::{AstParser, ParsedFile};
use crate::scanner::FileScanner;
use crate::serializer::{self, write_to_file};
use crate::type_resolver::FsModuleLoader;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;

/// Generate an OpenAPI document from `openapi:` annotations in Rust doc comments
#[derive(Parser, Debug)]
#[command(name = "openapi-from-comments")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Source directories to scan (a crate root, its `src/`, or any directory below it)
    #[arg(value_name = "DIR", required = true, num_args = 1..)]
    pub dirs: Vec<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// File whose inner doc comments (`//!`) carry the document metadata
    #[arg(short = 'm', long = "meta", value_name = "FILE")]
    pub meta: Option<PathBuf>,

    /// Override documents merged into the result (YAML, or JSON by extension)
    #[arg(long = "values", value_name = "FILE", value_delimiter = ',')]
    pub values: Vec<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "level", value_enum, default_value = "info")]
    pub level: LogLevel,

    /// Enable verbose output (same as `--level debug`)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl From<OutputFormat> for serializer::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => serializer::OutputFormat::Yaml,
            OutputFormat::Json => serializer::OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Level filter for the logger; `--verbose` raises anything quieter to debug.
    pub fn level_filter(&self) -> log::LevelFilter {
        let level = match self.level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        };
        if self.verbose {
            level.max(log::LevelFilter::Debug)
        } else {
            level
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    for dir in &args.dirs {
        if !dir.exists() {
            anyhow::bail!("Source directory does not exist: {}", dir.display());
        }
        if !dir.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", dir.display());
        }
    }
    if let Some(meta) = &args.meta {
        if !meta.is_file() {
            anyhow::bail!("Metadata file does not exist: {}", meta.display());
        }
    }

    for dir in &args.dirs {
        info!("Source directory: {}", dir.display());
    }
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }
    if let Some(meta) = &args.meta {
        info!("Metadata source: {}", meta.display());
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    // Step 1: Scan every directory for Rust files
    let mut source_files = Vec::new();
    let mut source_roots = Vec::new();
    for dir in &args.dirs {
        info!("Scanning {}...", dir.display());
        let scan_result = FileScanner::new(dir.clone()).scan()?;
        for warning in &scan_result.warnings {
            warn!("{}", warning);
        }
        info!("Found {} Rust files", scan_result.rust_files.len());
        if !source_roots.contains(&scan_result.source_root) {
            source_roots.push(scan_result.source_root);
        }
        source_files.extend(scan_result.rust_files);
    }
    // Overlapping directories yield the same canonical path more than once
    let mut seen = HashSet::new();
    source_files.retain(|file| {
        let first = seen.insert(file.path.clone());
        if !first {
            debug!("Skipping {} (already scanned)", file.path.display());
        }
        first
    });
    let files_scanned = source_files.len();

    if source_files.is_empty() {
        anyhow::bail!("No Rust files found in the source directories");
    }

    // Step 2: Parse files into AST; an unreadable source file aborts the run
    info!("Parsing Rust files...");
    let parsed_files = AstParser::parse_files(&source_files)
        .into_iter()
        .collect::<Result<Vec<ParsedFile>>>()
        .context("Source files could not be parsed")?;
    info!("Successfully parsed {} files", parsed_files.len());

    // Step 3: Extract, resolve and assemble
    info!("Generating OpenAPI document...");
    let mut generator = Generator::new().with_loader(Box::new(FsModuleLoader::new(source_roots)));
    if let Some(meta) = &args.meta {
        generator = generator.with_metadata_source(meta.clone());
    }
    let generation = generator.generate(&parsed_files)?;
    let mut diagnostics = generation.diagnostics;
    let document = generation.document;

    // Step 4: Serialize, merging override documents when given
    let format = serializer::OutputFormat::from(args.output_format);
    info!("Serializing to {:?} format...", args.output_format);
    let content = if args.values.is_empty() {
        serializer::serialize(&document, format)?
    } else {
        let merged = apply_overrides(&document, &args.values, &mut diagnostics)?;
        serializer::serialize(&merged, format)?
    };

    // Step 5: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    // Step 6: Display summary
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", files_scanned);
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Operations: {}", document.operation_count());
    info!(
        "  - Schemas: {}",
        document.components.as_ref().map(|c| c.schemas.len()).unwrap_or(0)
    );
    info!(
        "  - Diagnostics: {} warnings, {} errors",
        diagnostics.warnings().count(),
        diagnostics.errors().count()
    );

    Ok(())
}
