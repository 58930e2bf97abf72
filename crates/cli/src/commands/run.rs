//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use config_loader::{ConfigLoader, LimitOverrides};
use dispatcher::{DispatchError, Dispatcher, DispatcherBuilder};
use form_parser::MulterParser;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::report::RunReport;
use crate::source::open_source;

/// Execute the `run` command
pub async fn run_dispatch(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load configuration, CLI limits take precedence
    let overrides = LimitOverrides {
        max_fields: args.max_fields,
        max_fields_size: args.max_fields_size,
    };
    let blueprint = ConfigLoader::load_with_overrides(&args.config, overrides)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        files = blueprint.files.len(),
        fields = blueprint.fields.len(),
        max_fields = blueprint.limits.max_fields,
        max_fields_size = blueprint.limits.max_fields_size,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let source = open_source(&args.body, args.content_type.as_deref(), args.chunk_size).await?;
    let builder = DispatcherBuilder::from_blueprint(&blueprint).map_err(CliError::from)?;
    let collector = builder.collector();
    let mut dispatcher = builder.build::<MulterParser>(source);

    info!(body = %args.body.display(), "Dispatching body...");
    let started = Instant::now();

    let result = tokio::select! {
        result = process(&mut dispatcher, args.timeout) => result,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning dispatch");
            return Ok(());
        }
    };

    let dispatch_result = match result {
        Ok(()) => Ok(()),
        Err(ProcessError::Dispatch(e)) => Err(e),
        Err(ProcessError::Timeout) => {
            return Err(CliError::Timeout { secs: args.timeout }.into());
        }
    };

    let report = RunReport::new(
        &dispatch_result,
        started.elapsed(),
        dispatcher.metrics().snapshot(),
        collector.entries(),
        &dispatcher.timings().summary(),
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        report.print_summary();
    }

    if report.is_ok() {
        info!(duration_ms = report.duration_ms, "Dispatch completed");
    }

    dispatch_result.map_err(|e| CliError::from(e).into())
}

enum ProcessError {
    Dispatch(DispatchError),
    Timeout,
}

async fn process(
    dispatcher: &mut Dispatcher<MulterParser>,
    timeout_secs: u64,
) -> std::result::Result<(), ProcessError> {
    if timeout_secs == 0 {
        return dispatcher.process().await.map_err(ProcessError::Dispatch);
    }

    match tokio::time::timeout(Duration::from_secs(timeout_secs), dispatcher.process()).await {
        Ok(result) => result.map_err(ProcessError::Dispatch),
        Err(_) => Err(ProcessError::Timeout),
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
