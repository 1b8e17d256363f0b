//! STAC params CLI
//!
//! Command-line interface for compiling request schemas and normalizing
//! request parameters under a deployment configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use stac_params::{
    bind_body, bind_pairs, canonical_definitions, check, collection_path, compile, credentials,
    item_path, items_query, json_type_name, load_config, load_json, search_body, search_query,
    Args, CollectionRequest, CompiledSchema, Credentials, DeploymentConfig, ExtensionRegistry,
    FieldError, ItemRequest, ItemsRequest, NormalizeError, RequestDefinition, SearchRequest,
    ValidateError,
};

#[derive(Parser)]
#[command(name = "stac-params")]
#[command(about = "Compile catalog API request schemas and normalize request parameters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// One of the canonical request shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Collection lookup path parameters
    Collection,
    /// Item lookup path parameters
    Item,
    /// Collection items listing query
    Items,
    /// Item search query string
    Search,
    /// Item search request body
    SearchBody,
    /// Login payload
    Credentials,
}

impl Shape {
    fn definition(self) -> RequestDefinition {
        match self {
            Shape::Collection => collection_path(),
            Shape::Item => item_path(),
            Shape::Items => items_query(),
            Shape::Search => search_query(),
            Shape::SearchBody => search_body(),
            Shape::Credentials => credentials(),
        }
    }

    /// Body shapes bind their input directly; the rest treat it as
    /// query-string pairs.
    fn uses_body(self) -> bool {
        matches!(self, Shape::SearchBody | Shape::Credentials)
    }
}

/// Deployment configuration source, shared by all subcommands.
#[derive(ClapArgs)]
struct ConfigArgs {
    /// Deployment configuration file (JSON)
    #[arg(long, conflicts_with_all = ["extensions", "add_ons", "default_includes"])]
    config: Option<PathBuf>,

    /// Extensions to enable (comma-separated)
    #[arg(long, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Add-on capabilities to enable (comma-separated)
    #[arg(long, value_delimiter = ',')]
    add_ons: Vec<String>,

    /// Property paths returned when no field selection is given (comma-separated)
    #[arg(long, value_delimiter = ',')]
    default_includes: Vec<String>,
}

impl ConfigArgs {
    fn registry(&self) -> Result<ExtensionRegistry, u8> {
        let config = match &self.config {
            Some(path) => load_config(path).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?,
            None => DeploymentConfig {
                extensions: self.extensions.clone(),
                add_ons: self.add_ons.clone(),
                default_includes: self.default_includes.clone(),
            },
        };

        ExtensionRegistry::from_config(&config).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request shape's schema for a deployment
    Compile {
        /// Request shape to compile
        #[arg(value_enum)]
        shape: Shape,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a parameter file against a compiled shape
    Validate {
        /// Request shape to validate against
        #[arg(value_enum)]
        shape: Shape,

        /// JSON object file with the request parameters
        input: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Validate, bind, and normalize a parameter file
    Normalize {
        /// Request shape to normalize as
        #[arg(value_enum)]
        shape: Shape,

        /// JSON object file with the request parameters
        input: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check the canonical definitions and deployment configuration
    Check {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            shape,
            config,
            output,
            pretty,
        } => run_compile(shape, &config, output, pretty),

        Commands::Validate {
            shape,
            input,
            config,
            json,
        } => run_validate(shape, &input, &config, json),

        Commands::Normalize {
            shape,
            input,
            config,
            pretty,
        } => run_normalize(shape, &input, &config, pretty),

        Commands::Check { config, format } => run_check(&config, &format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_compile(
    shape: Shape,
    config: &ConfigArgs,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let registry = config.registry()?;
    let compiled = compile(&shape.definition(), &registry).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(compiled.as_json_schema())
    } else {
        serde_json::to_string(compiled.as_json_schema())
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_validate(shape: Shape, input: &PathBuf, config: &ConfigArgs, json: bool) -> Result<(), u8> {
    let registry = config.registry()?;
    let compiled = compile(&shape.definition(), &registry).map_err(|e| {
        report_error(json, &e.to_string());
        e.exit_code() as u8
    })?;
    let payload = load_json(input).map_err(|e| {
        report_error(json, &format!("loading input: {}", e));
        e.exit_code() as u8
    })?;

    match bind_input(shape, &compiled, &payload) {
        Ok(_) => {
            if json {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(InputError::Shape(msg)) => {
            report_error(json, &msg);
            Err(1)
        }
        Err(InputError::Invalid(errors)) => {
            if json {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
    }
}

fn run_normalize(
    shape: Shape,
    input: &PathBuf,
    config: &ConfigArgs,
    pretty: bool,
) -> Result<(), u8> {
    let registry = config.registry()?;
    let compiled = compile(&shape.definition(), &registry).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    let payload = load_json(input).map_err(|e| {
        eprintln!("Error: loading input: {}", e);
        e.exit_code() as u8
    })?;

    let bound = match bind_input(shape, &compiled, &payload) {
        Ok(bound) => bound,
        Err(InputError::Shape(msg)) => {
            eprintln!("Error: {}", msg);
            return Err(1);
        }
        Err(InputError::Invalid(errors)) => {
            eprintln!("Validation failed:");
            for error in errors {
                eprintln!("  {}", error);
            }
            return Err(1);
        }
    };

    let normalized = normalize_bound(shape, bound)?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&normalized)
    } else {
        serde_json::to_string(&normalized)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    println!("{}", json_output);
    Ok(())
}

/// Lift a bound parameter map into its shape and render the arguments a
/// catalog backend would receive. Body shapes pass the bound map through.
fn normalize_bound(shape: Shape, bound: Args) -> Result<Value, u8> {
    let report = |e: NormalizeError| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    };

    Ok(match shape {
        Shape::Collection => Value::Object(CollectionRequest::from_bound(&bound).map_err(report)?.args()),
        Shape::Item => Value::Object(ItemRequest::from_bound(&bound).map_err(report)?.args()),
        Shape::Items => Value::Object(ItemsRequest::from_bound(&bound).map_err(report)?.args()),
        Shape::Search => Value::Object(SearchRequest::from_bound(&bound).map_err(report)?.args()),
        Shape::SearchBody => Value::Object(bound),
        Shape::Credentials => {
            let login = Credentials::from_bound(&bound).map_err(report)?;
            serde_json::to_value(login).map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                2u8
            })?
        }
    })
}

enum InputError {
    /// The input file cannot be treated as parameters for this shape.
    Shape(String),
    Invalid(Vec<FieldError>),
}

fn bind_input(shape: Shape, compiled: &CompiledSchema, payload: &Value) -> Result<Args, InputError> {
    if shape.uses_body() {
        bind_body(compiled, payload)
            .map_err(|ValidateError::Invalid { errors }| InputError::Invalid(errors))
    } else {
        let pairs = object_to_pairs(payload).map_err(InputError::Shape)?;
        bind_pairs(compiled, pairs)
            .map_err(|ValidateError::Invalid { errors }| InputError::Invalid(errors))
    }
}

/// Convert a parameter object to query-string style pairs.
///
/// Scalars are stringified the way they would appear in a query string;
/// null marks an absent parameter and is skipped.
fn object_to_pairs(payload: &Value) -> Result<Vec<(String, String)>, String> {
    let Some(map) = payload.as_object() else {
        return Err(format!(
            "expected a JSON object of parameters, got {}",
            json_type_name(payload)
        ));
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::String(s) => pairs.push((key.clone(), s.clone())),
            Value::Number(n) => pairs.push((key.clone(), n.to_string())),
            Value::Bool(b) => pairs.push((key.clone(), b.to_string())),
            Value::Null => {}
            other => {
                return Err(format!(
                    "parameter \"{}\" must be a scalar, got {}",
                    key,
                    json_type_name(other)
                ));
            }
        }
    }
    Ok(pairs)
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!(r#"{{"valid":false,"error":"{}"}}"#, msg);
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_check(config: &ConfigArgs, format: &str) -> Result<(), u8> {
    use stac_params::Severity;

    // A registry the configuration cannot build fails the check outright.
    let _registry = config.registry()?;

    let definitions = canonical_definitions();
    let result = check(&definitions);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        for definition in &definitions {
            let diagnostics: Vec<_> = result
                .diagnostics
                .iter()
                .filter(|d| d.definition == definition.name)
                .collect();

            let status_icon = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
                "\x1b[31m✗\x1b[0m"
            } else if !diagnostics.is_empty() {
                "\x1b[33m⚠\x1b[0m"
            } else {
                "\x1b[32m✓\x1b[0m"
            };
            println!("  {} {}", status_icon, definition.name);

            for diag in diagnostics {
                let color = match diag.severity {
                    Severity::Error => "\x1b[31m",
                    Severity::Warning => "\x1b[33m",
                };
                println!(
                    "    {}{}[{}]\x1b[0m: {} - {}",
                    color,
                    match diag.severity {
                        Severity::Error => "error",
                        Severity::Warning => "warning",
                    },
                    diag.code,
                    diag.field.as_deref().unwrap_or("-"),
                    diag.message
                );
            }
        }

        println!();
        if result.is_ok() {
            println!(
                "\x1b[32m✓ {} definitions checked, all passed\x1b[0m",
                result.checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} definitions checked: {} errors, {} warnings\x1b[0m",
                result.checked, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}
