use crate::config::CompilerConfig;
use crate::docs::render_docs_html;
use crate::manifest::ManifestResolver;
use crate::openapi_builder::{DocumentCompiler, OpenApiDocument, RouteResolver};
use crate::reporter::LogReporter;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

/// OpenAPI from handlers - compile route manifests into an OpenAPI document
#[derive(Parser, Debug)]
#[command(name = "openapi-from-handlers")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Directory of route manifests (JSON or YAML, one file per route)
    #[arg(value_name = "ROUTES_DIR")]
    pub routes_path: PathBuf,

    /// Base OpenAPI document (info, servers, components, hand-written paths)
    #[arg(short = 'b', long = "base", value_name = "FILE")]
    pub base_path: Option<PathBuf>,

    /// Compiler config file (YAML or JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Also write the HTML documentation page to this file
    #[arg(long = "docs-output", value_name = "FILE")]
    pub docs_output_path: Option<PathBuf>,

    /// Maximum wait for each route, in milliseconds (overrides the config file)
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.routes_path.is_dir() {
        anyhow::bail!(
            "Routes path is not a directory: {}",
            args.routes_path.display()
        );
    }

    info!("Routes path: {}", args.routes_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Load the config file, if any, and apply command-line overrides
fn load_config(args: &CliArgs) -> Result<CompilerConfig> {
    let mut config = match &args.config_path {
        Some(path) => CompilerConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => CompilerConfig::default(),
    };
    if let Some(timeout_ms) = args.timeout_ms {
        config.fetch_timeout_ms = timeout_ms;
    }
    Ok(config)
}

/// Run the main workflow
pub async fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    // Step 1: Configuration and base document
    let config = load_config(&args)?;
    let base = match &args.base_path {
        Some(path) => OpenApiDocument::load(path)
            .with_context(|| format!("Failed to load base document: {}", path.display()))?,
        None => OpenApiDocument::default(),
    };

    // Step 2: Scan route manifests
    info!("Scanning route manifests...");
    let resolver = ManifestResolver::scan(args.routes_path.clone())
        .with_context(|| format!("Failed to scan {}", args.routes_path.display()))?;
    let route_count = resolver.discover().len();
    info!("Found {} route manifests", route_count);
    if route_count == 0 {
        log::warn!("No route manifests found in {}", args.routes_path.display());
    }

    // Step 3: Compile
    let spec_url = match args.output_format {
        OutputFormat::Yaml => config.openapi_yaml_path.clone(),
        OutputFormat::Json => config.openapi_json_path.clone(),
    };
    let docs_config = config.docs.clone();
    let mut compiler = DocumentCompiler::new(config, Arc::new(LogReporter));
    let document = compiler.compile(&base, Arc::new(resolver)).await;
    info!("OpenAPI document built successfully");

    // Step 4: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    // Step 5: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    if let Some(docs_path) = &args.docs_output_path {
        info!("Writing documentation page to: {}", docs_path.display());
        write_to_file(&render_docs_html(&docs_config, &spec_url), docs_path)?;
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Route manifests: {}", route_count);
    info!("  - Paths in document: {}", document.paths.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(routes: PathBuf) -> CliArgs {
        CliArgs {
            routes_path: routes,
            base_path: None,
            config_path: None,
            output_format: OutputFormat::Json,
            output_path: None,
            docs_output_path: None,
            timeout_ms: None,
            verbose: false,
        }
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "openapi-from-handlers",
            "./routes",
            "-f",
            "json",
            "-o",
            "out.json",
            "--timeout-ms",
            "250",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.routes_path, PathBuf::from("./routes"));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.output_path, Some(PathBuf::from("out.json")));
        assert_eq!(args.timeout_ms, Some(250));
        assert!(args.verbose);
    }

    #[test]
    fn test_rejects_missing_routes_dir() {
        let temp_dir = TempDir::new().unwrap();
        let result = parse_args_from_parsed(args(temp_dir.path().join("missing")));
        assert!(result.is_err());
    }

    #[test]
    fn test_timeout_flag_overrides_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "fetch_timeout_ms: 900\n").unwrap();

        let mut cli = args(temp_dir.path().to_path_buf());
        cli.config_path = Some(config_path);
        assert_eq!(load_config(&cli).unwrap().fetch_timeout_ms, 900);

        cli.timeout_ms = Some(100);
        assert_eq!(load_config(&cli).unwrap().fetch_timeout_ms, 100);
    }

    #[tokio::test]
    async fn test_run_writes_document_and_docs() {
        let temp_dir = TempDir::new().unwrap();
        let routes = temp_dir.path().join("routes");
        fs::create_dir_all(&routes).unwrap();
        fs::write(routes.join("todos.yaml"), "get:\n  operationId: listTodos\n").unwrap();

        let mut cli = args(routes);
        cli.output_path = Some(temp_dir.path().join("out/openapi.json"));
        cli.docs_output_path = Some(temp_dir.path().join("out/docs.html"));
        run(cli).await.unwrap();

        let json = fs::read_to_string(temp_dir.path().join("out/openapi.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["paths"]["/todos"]["get"]["operationId"], "listTodos");

        let html = fs::read_to_string(temp_dir.path().join("out/docs.html")).unwrap();
        assert!(html.contains("/openapi.json"));
    }
}
