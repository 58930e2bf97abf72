//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// formdispatch - stream a multipart/form-data body through configured handlers
#[derive(Parser, Debug)]
#[command(
    name = "formdispatch",
    author,
    version,
    about = "Streaming multipart/form-data dispatcher",
    long_about = "Parses a multipart/form-data body as a stream and routes each part to the\n\
                  handler configured for its field name.\n\n\
                  Unmatched parts are drained; the run settles once every part has been\n\
                  flushed and every handler has returned."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FORMDISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FORMDISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a multipart body
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "form.toml",
        env = "FORMDISPATCH_CONFIG"
    )]
    pub config: PathBuf,

    /// Path to the raw multipart body
    #[arg(short, long, env = "FORMDISPATCH_BODY")]
    pub body: PathBuf,

    /// Content-Type header of the body (boundary is read from the body if omitted)
    #[arg(long, env = "FORMDISPATCH_CONTENT_TYPE")]
    pub content_type: Option<String>,

    /// Override limits.max_fields from configuration
    #[arg(long, env = "FORMDISPATCH_MAX_FIELDS")]
    pub max_fields: Option<usize>,

    /// Override limits.max_fields_size from configuration
    #[arg(long, env = "FORMDISPATCH_MAX_FIELDS_SIZE")]
    pub max_fields_size: Option<usize>,

    /// Read chunk size in bytes
    #[arg(long, default_value = "16384", env = "FORMDISPATCH_CHUNK_SIZE")]
    pub chunk_size: usize,

    /// Timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FORMDISPATCH_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FORMDISPATCH_METRICS_PORT")]
    pub metrics_port: u16,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "form.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "form.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show handler parameters
    #[arg(long)]
    pub params: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "formdispatch",
            "run",
            "--config",
            "routes.toml",
            "--body",
            "upload.bin",
            "--max-fields",
            "10",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("routes.toml"));
                assert_eq!(args.body, PathBuf::from("upload.bin"));
                assert_eq!(args.max_fields, Some(10));
                assert_eq!(args.chunk_size, 16384);
                assert!(args.content_type.is_none());
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["formdispatch", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
