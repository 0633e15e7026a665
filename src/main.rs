//! Swagger From Routes - command-line front end.
//!
//! Reads a route manifest and writes the generated OpenAPI/Swagger document.
//!
//! # Usage
//!
//! ```bash
//! swagger-from-routes [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Generate an OpenAPI 3 document as YAML:
//! ```bash
//! swagger-from-routes routes.yaml -o swagger.yaml
//! ```
//!
//! Generate Swagger 2.0 JSON with schema classes taken from Rust sources:
//! ```bash
//! swagger-from-routes routes.yaml --openapi-version 2.0 --definitions src/schemas -f json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use swagger_from_routes::cli;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can configure the logger
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Swagger From Routes starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("Document generation completed successfully");

    Ok(())
}
