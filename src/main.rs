//! OpenAPI from handlers - command-line tool for compiling OpenAPI documents.
//!
//! Reads a directory of route manifests, compiles them together with an
//! optional base document, and writes the result as YAML or JSON.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-handlers [OPTIONS] <ROUTES_DIR>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-handlers ./routes -b base.yaml -o openapi.yaml
//! ```
//!
//! Generate JSON plus a documentation page:
//! ```bash
//! openapi-from-handlers ./routes -f json -o openapi.json --docs-output docs.html
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_handlers::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("OpenAPI compiler starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args).await?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
