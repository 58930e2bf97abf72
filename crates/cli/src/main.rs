//! # formdispatch CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 路由配置加载与验证
//! - 对 multipart 请求体执行分发
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod report;
mod source;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_dispatch, run_info, run_validate};
use error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "formdispatch starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_dispatch(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            exit_code(&e)
        }
    }
}

/// Exit code 2 for dispatch failures, 1 otherwise
fn exit_code(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<CliError>() {
        Some(CliError::Dispatch { .. }) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_with_config(observability::ObservabilityConfig {
        log_format: cli.log_format.into(),
        ..observability::ObservabilityConfig::with_verbosity(cli.quiet, cli.verbose)
    })
}
