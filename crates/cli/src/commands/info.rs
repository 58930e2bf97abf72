//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use contracts::FormBlueprint;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    limits: LimitsInfo,
    files: Vec<RouteInfo>,
    fields: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct LimitsInfo {
    max_fields: usize,
    max_fields_size: usize,
}

#[derive(Serialize)]
struct RouteInfo {
    name: String,
    handler: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &FormBlueprint, args: &InfoArgs) -> ConfigInfo {
    let files = blueprint
        .files
        .iter()
        .map(|route| RouteInfo {
            name: route.name.clone(),
            handler: format!("{:?}", route.handler),
            params: if args.params {
                route.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    let fields = blueprint
        .fields
        .iter()
        .map(|route| RouteInfo {
            name: route.name.clone(),
            handler: format!("{:?}", route.handler),
            params: HashMap::new(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        limits: LimitsInfo {
            max_fields: blueprint.limits.max_fields,
            max_fields_size: blueprint.limits.max_fields_size,
        },
        files,
        fields,
    }
}

fn print_config_info(blueprint: &FormBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Form Dispatch Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📏 Limits");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Max fields: {}", blueprint.limits.max_fields);
    println!(
        "   └─ Max fields size: {} bytes",
        blueprint.limits.max_fields_size
    );

    println!("\n📁 File Routes ({})", blueprint.files.len());
    for (i, route) in blueprint.files.iter().enumerate() {
        let is_last = i == blueprint.files.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({:?})", prefix, route.name, route.handler);

        if args.params && !route.params.is_empty() {
            let mut params: Vec<_> = route.params.iter().collect();
            params.sort();
            for (j, (key, value)) in params.iter().enumerate() {
                let param_prefix = if j == params.len() - 1 { "└─" } else { "├─" };
                println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
            }
        }
    }

    println!("\n📝 Field Routes ({})", blueprint.fields.len());
    for (i, route) in blueprint.fields.iter().enumerate() {
        let prefix = if i == blueprint.fields.len() - 1 { "└─" } else { "├─" };
        println!("   {} {} ({:?})", prefix, route.name, route.handler);
    }

    println!();
}
