use crate::catalog::SchemaCatalog;
use crate::definitions::DefinitionsLoader;
use crate::manifest::Manifest;
use crate::openapi_builder::generate_spec_with_catalog;
use crate::options::GeneratorOptions;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Swagger From Routes - Generate an OpenAPI/Swagger document from a route manifest
#[derive(Parser, Debug)]
#[command(name = "swagger-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the route manifest (YAML, or JSON with a .json extension)
    #[arg(value_name = "MANIFEST")]
    pub manifest_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Document title
    #[arg(long)]
    pub title: Option<String>,

    /// API version reported in the info block
    #[arg(long = "api-version", value_name = "VERSION")]
    pub api_version: Option<String>,

    /// OpenAPI/Swagger version; versions starting with 2 produce Swagger 2.0 output
    #[arg(long = "openapi-version", value_name = "VERSION")]
    pub openapi_version: Option<String>,

    /// Host the API is served from
    #[arg(long)]
    pub host: Option<String>,

    /// Transfer scheme, may be repeated
    #[arg(long = "scheme", value_name = "SCHEME")]
    pub schemes: Vec<String>,

    /// Document description
    #[arg(long)]
    pub description: Option<String>,

    /// Rust source file or directory whose *Schema structs are documented
    #[arg(long = "definitions", value_name = "PATH")]
    pub definitions_path: Option<PathBuf>,

    /// Do not document an implicit 200 response
    #[arg(long = "no-default-response")]
    pub no_default_response: bool,

    /// Enable verbose output
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

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.is_file() {
        anyhow::bail!(
            "Manifest does not exist or is not a file: {}",
            args.manifest_path.display()
        );
    }

    if let Some(ref path) = args.definitions_path {
        if !path.exists() {
            anyhow::bail!("Definitions path does not exist: {}", path.display());
        }
    }

    info!("Manifest: {}", args.manifest_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

impl CliArgs {
    /// Overlay the command line flags on `options`.
    pub fn apply_to(&self, mut options: GeneratorOptions) -> GeneratorOptions {
        if let Some(title) = &self.title {
            options.title = title.clone();
        }
        if let Some(version) = &self.api_version {
            options.version = Some(version.clone());
        }
        if let Some(openapi_version) = &self.openapi_version {
            options.openapi_version = openapi_version.clone();
        }
        if let Some(host) = &self.host {
            options.host = host.clone();
        }
        if !self.schemes.is_empty() {
            options.schemes = self.schemes.clone();
        }
        if let Some(description) = &self.description {
            options.description = Some(description.clone());
        }
        if let Some(path) = &self.definitions_path {
            options.definitions_path = Some(path.clone());
        }
        if self.no_default_response {
            options.use_default_response = false;
        }
        options
    }
}

/// Generate the serialized document described by `args`.
pub fn generate(args: &CliArgs) -> Result<String> {
    let options = args.apply_to(GeneratorOptions::from_env()?);
    info!(
        "Generating {} document \"{}\"",
        options.openapi_version, options.title
    );

    let catalog = match &options.definitions_path {
        Some(path) => DefinitionsLoader::new(path)
            .load()
            .with_context(|| format!("Failed to load definitions from {}", path.display()))?,
        None => SchemaCatalog::new(),
    };

    let manifest = Manifest::load(&args.manifest_path)
        .with_context(|| format!("Failed to read manifest {}", args.manifest_path.display()))?;
    let (routes, docs) = manifest.into_routes(&catalog)?;
    info!("Loaded {} handlers", routes.len());

    if routes.is_empty() {
        log::warn!("The manifest declares no routes");
    }

    let document = generate_spec_with_catalog(&routes, &docs, &options, &catalog)?;
    info!(
        "Document has {} paths and {} schemas",
        document.paths.len(),
        document.schemas().map_or(0, |schemas| schemas.len())
    );

    match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document),
        OutputFormat::Json => serialize_json(&document),
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting document generation...");
    let content = generate(&args)?;

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::ffi::OsString;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_options() {
        let args = CliArgs::parse_from([
            "swagger-from-routes",
            "routes.yaml",
            "--title",
            "Shop",
            "--openapi-version",
            "2.0",
            "--scheme",
            "https",
            "--scheme",
            "http",
            "--no-default-response",
        ]);
        let options = args.apply_to(GeneratorOptions::new().with_host("api.local"));

        assert_eq!(options.title, "Shop");
        assert_eq!(options.openapi_version, "2.0");
        assert_eq!(options.host, "api.local");
        assert_eq!(options.schemes, vec!["https".to_string(), "http".to_string()]);
        assert!(!options.use_default_response);
        assert_eq!(options.version, None);
    }

    #[test]
    fn test_missing_manifest_is_rejected() {
        let args = CliArgs::parse_from(["swagger-from-routes", "/no/such/manifest.yaml"]);
        assert!(parse_args_from_parsed(args).is_err());
    }

    #[test]
    fn test_run_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("routes.yaml");
        fs::write(
            &manifest,
            "routes:\n  - url: /ping\n    method: GET\n    handler: { name: ping, doc: Ping. }\n",
        )
        .unwrap();
        let output = dir.path().join("out").join("swagger.json");

        let args = CliArgs::parse_from([
            OsString::from("swagger-from-routes"),
            manifest.into_os_string(),
            OsString::from("-f"),
            OsString::from("json"),
            OsString::from("-o"),
            output.clone().into_os_string(),
        ]);
        run(parse_args_from_parsed(args).unwrap()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["paths"]["/ping"]["get"]["summary"], "Ping.");
    }
}
