//! Command-line tool that generates an OpenAPI document from annotated Rust sources.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-comments [OPTIONS] <DIR>...
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-comments ./petstore -o openapi.yaml
//! ```
//!
//! Generate JSON, merging a hand-written security section:
//! ```bash
//! openapi-from-comments ./petstore -f json --values security.yaml -o openapi.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-comments ./petstore -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_comments::cli;

fn main() -> Result<()> {
    // Parse once so the log level is known before anything is logged
    let args = cli::CliArgs::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.level_filter())
        .init();

    info!("openapi-from-comments starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
