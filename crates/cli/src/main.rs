//! Navy Display E2E - Main Entry Point
//!
//! Starts the Navy Display application, drives it through a headless
//! browser and reports one PASS/FAIL line per check.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{debug, info, warn};

mod output;

use navy_display_e2e::locale::fill;
use navy_display_e2e::{exit_code, HarnessConfig, Locale, OptionalCheck, TestRunner};
use output::{ConsoleReporter, OutputFormat};

/// Browser test suite for the Navy Display System
#[derive(Parser, Debug)]
#[command(name = "navy-e2e")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true)]
struct Args {
    /// Base URL of the application under test [default: http://localhost:5000]
    base_url: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "NAVY_E2E_CONFIG")]
    config: Option<PathBuf>,

    /// Language of the report
    #[arg(long, value_enum)]
    locale: Option<Locale>,

    /// Command that starts the application [default: "npm run dev"]
    #[arg(long)]
    server_command: Option<String>,

    /// Working directory for the server command
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Test an already running application instead of starting one
    #[arg(long, conflicts_with = "server_command")]
    no_server: bool,

    /// Seconds to wait for the health endpoint [default: 30]
    #[arg(long)]
    startup_timeout: Option<u64>,

    /// Enable an optional check (repeatable)
    #[arg(long, value_enum)]
    enable: Vec<OptionalCheck>,

    /// Write JSON results to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chrome/Chromium executable
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Final report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Enable verbose output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print help
    #[arg(short = 'h', long = "help", visible_alias = "ajuda", action = ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    /// Defaults, then the config file, then flags
    fn into_config(self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(locale) = self.locale {
            config.locale = locale;
        }
        if let Some(command) = self.server_command {
            config.server.command = command.split_whitespace().map(String::from).collect();
        }
        if self.no_server {
            config.server.command.clear();
        }
        if let Some(dir) = self.working_dir {
            config.server.working_dir = Some(dir);
        }
        if let Some(secs) = self.startup_timeout {
            config.server.startup_timeout_secs = secs;
        }
        for check in self.enable {
            if !config.checks.is_enabled(check) {
                config.checks.enabled.push(check);
            }
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        if self.chrome.is_some() {
            config.browser.chrome_executable = self.chrome;
        }
        if self.headed {
            config.browser.headless = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Navy Display E2E v{}", env!("CARGO_PKG_VERSION"));

    let format = args.format;
    let config = args.into_config()?;
    debug!("Effective configuration: {:?}", config);
    let strings = config.locale.strings();

    if format != OutputFormat::Json {
        println!("{}", output::banner(strings));
        println!();
    }

    let mut runner = TestRunner::with_config(config)?;
    info!("Testing {} with {} check(s)", runner.config().base_url(), runner.check_names().len());
    let mut reporter = ConsoleReporter::new(strings, format);
    let result = runner.run(&mut reporter).await;

    match &result {
        Ok(ledger) => {
            output::print_report(ledger, format, strings);

            if let Some(path) = runner.config().output.clone() {
                match runner.write_results(ledger, &path) {
                    Ok(path) => {
                        if format != OutputFormat::Json {
                            println!("{}", fill(strings.results_written, &[("path", path.display().to_string())]));
                        }
                    }
                    Err(e) => {
                        warn!("Failed to write results to {}: {}", path.display(), e);
                        output::print_error(&e.to_string());
                    }
                }
            }
        }
        Err(e) => {
            output::print_error(&output::environment_failure(e, strings));
            output::print_error(strings.environment_failed);
        }
    }

    let code = exit_code(&result);
    info!("Exiting with code {}", code);
    drop(runner);
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("navy-e2e").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap().into_config().unwrap();
        assert_eq!(config.base_url(), "http://localhost:5000");
        assert_eq!(config.server.command, ["npm", "run", "dev"]);
        assert_eq!(config.server.startup_timeout_secs, 30);
        assert!(config.browser.headless);
        assert!(config.checks.enabled.is_empty());
    }

    #[test]
    fn test_positional_base_url() {
        let config = parse(&["http://192.168.1.20:5000/"]).unwrap().into_config().unwrap();
        assert_eq!(config.health_url(), "http://192.168.1.20:5000/api/health");
    }

    #[test]
    fn test_help_aliases() {
        for flag in ["--help", "-h", "--ajuda"] {
            let err = parse(&[flag]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DisplayHelp, "{flag}");
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--locale",
            "pt",
            "--server-command",
            "cargo run --release",
            "--startup-timeout",
            "60",
            "--enable",
            "notice-creation",
            "--enable",
            "notice-creation",
            "--headed",
            "--output",
            "results/e2e.json",
        ])
        .unwrap()
        .into_config()
        .unwrap();

        assert_eq!(config.locale, Locale::Pt);
        assert_eq!(config.server.command, ["cargo", "run", "--release"]);
        assert_eq!(config.server.startup_timeout_secs, 60);
        assert_eq!(config.checks.enabled, [OptionalCheck::NoticeCreation]);
        assert!(!config.browser.headless);
        assert_eq!(config.output, Some(PathBuf::from("results/e2e.json")));
    }

    #[test]
    fn test_enable_rest_checks() {
        let config = parse(&["--enable", "notices-crud", "--enable", "api-not-found"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.checks.enabled, [OptionalCheck::NoticesCrud, OptionalCheck::ApiNotFound]);
        assert!(parse(&["--enable", "notices"]).is_err());
    }

    #[test]
    fn test_no_server_attaches() {
        let config = parse(&["--no-server"]).unwrap().into_config().unwrap();
        assert!(config.server.command.is_empty());

        assert!(parse(&["--no-server", "--server-command", "npm start"]).is_err());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(parse(&["localhost:5000"]).unwrap().into_config().is_err());
    }
}
