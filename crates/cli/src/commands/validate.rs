//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use contracts::{FileHandlerKind, FormBlueprint};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    max_fields: usize,
    max_fields_size: usize,
    file_route_count: usize,
    field_route_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    max_fields: blueprint.limits.max_fields,
                    max_fields_size: blueprint.limits.max_fields_size,
                    file_route_count: blueprint.files.len(),
                    field_route_count: blueprint.fields.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &FormBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.has_routes() {
        warnings.push("No routes configured - the body will not be read".to_string());
        return warnings;
    }

    if !blueprint.files.iter().any(|route| route.name == "*") {
        warnings.push("No \"*\" file route - unmatched file parts will be drained".to_string());
    }

    // Route names carrying an index never match; lookups strip it first
    for route in &blueprint.files {
        if dispatcher::handler_name(&route.name) != route.name.as_str() {
            warnings.push(format!(
                "File route '{}' contains an array index and will never match",
                route.name
            ));
        }
    }

    for route in &blueprint.files {
        if route.handler != FileHandlerKind::Disk {
            continue;
        }
        if let Some(base_path) = route.params.get("base_path") {
            if !Path::new(base_path).exists() {
                warnings.push(format!(
                    "Disk route '{}': base_path '{}' does not exist and will be created",
                    route.name, base_path
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Max fields: {}", summary.max_fields);
            println!("  Max fields size: {} bytes", summary.max_fields_size);
            println!("  File routes: {}", summary.file_route_count);
            println!("  Field routes: {}", summary.field_route_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
