//! `rvoip-presence`: feed PIDF bodies through the presence pipeline and read
//! the stored state back.
//!
//! ```text
//! rvoip-presence --store presence.json publish --endpoint alice --file status.xml
//! rvoip-presence --store presence.json show CustomPresence:PJSIP/alice
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rvoip_infra_common::LoggingConfig;
use rvoip_infra_common::logging::setup::{log_welcome, setup_logging};
use rvoip_presence_core::{PresenceConfig, PresenceService, PublishOutcome};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "rvoip-presence", version, about = "Publish and inspect PIDF presence state")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "RVOIP_PRESENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Presence store file (overrides the configuration)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Log level (overrides the configuration)
    #[arg(long)]
    log_level: Option<String>,

    /// Log one JSON object per line
    #[arg(long)]
    log_json: bool,

    /// Include source file and line in log lines
    #[arg(long)]
    log_file_info: bool,

    /// Log span open/close events
    #[arg(long)]
    log_spans: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle a PUBLISH body as if it came from an endpoint
    Publish {
        /// Publishing endpoint name
        #[arg(short, long)]
        endpoint: String,

        /// Content-Type of the body
        #[arg(short = 't', long, default_value = "application/pidf+xml")]
        content_type: String,

        /// Body file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: PathBuf,
    },
    /// Show the stored presence of a device, e.g. `CustomPresence:PJSIP/alice`
    Show { device: String },
}

#[derive(Serialize)]
struct PublishReport<'a> {
    endpoint: &'a str,
    status: u16,
    applied: bool,
    detail: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PresenceConfig::load(cli.config.as_deref())
        .context("failed to load presence configuration")?;
    config.logging = logging_overrides(&cli, config.logging);
    if let Some(store) = cli.store {
        config.store_path = Some(store);
    }

    setup_logging(&config.logging).context("failed to initialise logging")?;
    log_welcome("rvoip-presence", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    let service = PresenceService::new(config).context("failed to open presence store")?;

    match cli.command {
        Command::Publish {
            endpoint,
            content_type,
            file,
        } => {
            let body = read_body(&file)?;
            let outcome = service
                .handler()
                .handle_publish(&endpoint, Some(&content_type), &body);

            let report = match &outcome {
                PublishOutcome::Accepted {
                    status,
                    applied,
                    error,
                } => PublishReport {
                    endpoint: &endpoint,
                    status: *status,
                    applied: *applied,
                    detail: error.as_ref().map(|kind| format!("{:?}", kind)),
                },
                PublishOutcome::Rejected { status, reason } => PublishReport {
                    endpoint: &endpoint,
                    status: *status,
                    applied: false,
                    detail: Some(reason.clone()),
                },
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Show { device } => {
            let snapshot = service.provider().current_state(&device)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}

/// Apply the command-line logging flags on top of the configured logging
fn logging_overrides(cli: &Cli, mut logging: LoggingConfig) -> LoggingConfig {
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    if cli.log_json {
        logging = logging.with_json();
    }
    if cli.log_file_info {
        logging = logging.with_file_info();
    }
    if cli.log_spans {
        logging = logging.with_spans();
    }
    logging
}

fn read_body(file: &Path) -> Result<Vec<u8>> {
    if file.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("failed to read body from stdin")?;
        Ok(body)
    } else {
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from([
            "rvoip-presence",
            "--store",
            "/tmp/p.json",
            "publish",
            "-e",
            "alice",
            "-f",
            "status.xml",
        ])
        .unwrap();

        assert_eq!(cli.store, Some(PathBuf::from("/tmp/p.json")));
        match cli.command {
            Command::Publish {
                endpoint,
                content_type,
                file,
            } => {
                assert_eq!(endpoint, "alice");
                assert_eq!(content_type, "application/pidf+xml");
                assert_eq!(file, PathBuf::from("status.xml"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_logging_flags_override_config() {
        let cli = Cli::try_parse_from([
            "rvoip-presence",
            "--log-level",
            "debug",
            "--log-json",
            "--log-file-info",
            "show",
            "CustomPresence:PJSIP/alice",
        ])
        .unwrap();

        let logging = logging_overrides(&cli, LoggingConfig::default());
        assert_eq!(logging.level, "debug");
        assert!(logging.json);
        assert!(logging.file_info);
        assert!(!logging.log_spans);
    }

    #[test]
    fn test_no_logging_flags_keep_config() {
        let cli = Cli::try_parse_from(["rvoip-presence", "--log-spans", "show", "x"]).unwrap();
        let configured = LoggingConfig {
            level: "warn".to_string(),
            json: true,
            ..Default::default()
        };

        let logging = logging_overrides(&cli, configured);
        assert_eq!(logging.level, "warn");
        assert!(logging.json);
        assert!(logging.log_spans);
        assert!(!logging.file_info);
    }
}
