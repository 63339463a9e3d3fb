//! Output formatting for the CLI
//!
//! Formatters are plain functions from values to strings; the only stateful
//! piece is [`ConsoleReporter`], which streams progress while a run executes.

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use navy_display_e2e::locale::fill;
use navy_display_e2e::{E2eError, ResultLedger, RunObserver, ServerConfig, Status, Strings, Summary, TestOutcome};

/// Final report format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Outcome lines and a summary block
    #[default]
    Plain,
    /// Plain output plus an outcome table
    Table,
    /// Ledger as JSON on stdout, nothing else
    Json,
}

const RULE_WIDTH: usize = 60;

pub fn glyph(status: Status) -> &'static str {
    match status {
        Status::Pass => "✓",
        Status::Fail => "✗",
    }
}

/// Color a string by outcome status
pub fn paint(status: Status, text: &str) -> ColoredString {
    match status {
        Status::Pass => text.green(),
        Status::Fail => text.red(),
    }
}

/// `✓ name` or `✗ name - detail`
pub fn outcome_line(outcome: &TestOutcome) -> String {
    let mut line = format!("{} {}", glyph(outcome.status), outcome.name);
    if !outcome.detail.is_empty() {
        line.push_str(" - ");
        line.push_str(&outcome.detail);
    }
    paint(outcome.status, &line).to_string()
}

pub fn banner(strings: &Strings) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("{}\n{}\n{}", rule, strings.suite_title.bold(), rule)
}

pub fn summary_block(summary: &Summary, strings: &Strings) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let body = format!(
        "{}: {}\n{}: {}\n{}: {}\n{}: {:.1}%",
        strings.total_label,
        summary.total,
        strings.passed_label,
        summary.passed,
        strings.failed_label,
        summary.failed,
        strings.success_rate_label,
        summary.success_rate,
    );

    let body = if summary.failed == 0 { body.green() } else { body.yellow() };
    format!("{}\n{}\n{}\n{}", rule, strings.summary_title.bold(), rule, body)
}

pub fn verdict(ledger: &ResultLedger, strings: &Strings) -> String {
    if ledger.all_passed() {
        format!("🎉 {}", strings.all_passed).green().bold().to_string()
    } else {
        format!("⚠️  {}", strings.some_failed).yellow().bold().to_string()
    }
}

pub fn outcome_table(ledger: &ResultLedger) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["#", "Test", "Status", "Time (ms)", "Detail"]);
    for (i, outcome) in ledger.iter().enumerate() {
        let color = match outcome.status {
            Status::Pass => Color::Green,
            Status::Fail => Color::Red,
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&outcome.name),
            Cell::new(format!("{:?}", outcome.status).to_uppercase()).fg(color),
            Cell::new(outcome.duration_ms),
            Cell::new(&outcome.detail),
        ]);
    }

    table
}

/// Localized description of an environment failure
pub fn environment_failure(error: &E2eError, strings: &Strings) -> String {
    match error {
        E2eError::ServerNotReady { timeout_secs, .. } => {
            fill(strings.server_timeout, &[("secs", timeout_secs.to_string())])
        }
        E2eError::ServerStartup(_) | E2eError::Io(_) => {
            fill(strings.server_start_failed, &[("error", error.to_string())])
        }
        E2eError::BrowserLaunch(_) | E2eError::Browser(_) => {
            fill(strings.browser_setup_failed, &[("error", error.to_string())])
        }
        other => format!("{}: {}", strings.environment_failed, other),
    }
}

/// Print the end-of-run report in the requested format
pub fn print_report(ledger: &ResultLedger, format: OutputFormat, strings: &Strings) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(ledger).unwrap_or_default());
        }
        OutputFormat::Plain | OutputFormat::Table => {
            println!();
            println!("{}", summary_block(&ledger.summary(), strings));
            if format == OutputFormat::Table {
                println!("{}", outcome_table(ledger));
            }
            println!();
            println!("{}", verdict(ledger, strings));
        }
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).red());
}

/// Streams progress lines while checks run
pub struct ConsoleReporter {
    strings: &'static Strings,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(strings: &'static Strings, format: OutputFormat) -> Self {
        Self {
            strings,
            quiet: format == OutputFormat::Json,
        }
    }
}

impl RunObserver for ConsoleReporter {
    fn starting_server(&mut self, config: &ServerConfig) {
        if !self.quiet && !config.command.is_empty() {
            println!("{}", self.strings.starting_server);
        }
    }

    fn waiting_for_server(&mut self, _health_url: &str) {
        if !self.quiet {
            println!("{}", self.strings.waiting_for_server);
        }
    }

    fn server_ready(&mut self) {
        if !self.quiet {
            println!("{}", self.strings.server_ready.green());
            println!();
        }
    }

    fn outcome(&mut self, outcome: &TestOutcome) {
        if !self.quiet {
            println!("{}", outcome_line(outcome));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navy_display_e2e::locale::{EN, PT};

    fn plain() {
        colored::control::set_override(false);
    }

    fn outcome(name: &str, status: Status, detail: &str) -> TestOutcome {
        TestOutcome {
            name: name.to_string(),
            status,
            detail: detail.to_string(),
            duration_ms: 12,
        }
    }

    #[test]
    fn test_outcome_lines() {
        plain();
        assert_eq!(outcome_line(&outcome("API Health Check", Status::Pass, "")), "✓ API Health Check");
        assert_eq!(
            outcome_line(&outcome("API GET /notices", Status::Fail, "Status: 500")),
            "✗ API GET /notices - Status: 500"
        );
    }

    #[test]
    fn test_summary_block_rounds_to_one_decimal() {
        plain();
        let mut ledger = ResultLedger::new();
        ledger.record("a", true, "");
        ledger.record("b", true, "");
        ledger.record("c", false, "boom");

        let block = summary_block(&ledger.summary(), &EN);
        assert!(block.contains("Test Results Summary"));
        assert!(block.contains("Total Tests: 3"));
        assert!(block.contains("Passed: 2"));
        assert!(block.contains("Failed: 1"));
        assert!(block.contains("Success Rate: 66.7%"));

        let block = summary_block(&ResultLedger::new().summary(), &PT);
        assert!(block.contains("Taxa de Sucesso: 0.0%"));
    }

    #[test]
    fn test_verdict_follows_failures() {
        plain();
        let mut ledger = ResultLedger::new();
        ledger.record("a", true, "");
        assert!(verdict(&ledger, &EN).contains("All tests passed"));

        ledger.record("b", false, "x");
        assert!(verdict(&ledger, &EN).contains("Some tests failed"));
    }

    #[test]
    fn test_environment_failure_messages() {
        let timeout = E2eError::ServerNotReady {
            url: "http://localhost:5000/api/health".into(),
            timeout_secs: 30,
        };
        assert_eq!(environment_failure(&timeout, &EN), "Server failed to start within 30 seconds");

        let launch = E2eError::BrowserLaunch("no chrome".into());
        assert!(environment_failure(&launch, &PT).starts_with("Falha ao configurar navegador"));

        let other = E2eError::SessionClosed;
        assert!(environment_failure(&other, &EN).starts_with("Failed to set up test environment"));
    }

    #[test]
    fn test_outcome_table_rows() {
        let mut ledger = ResultLedger::new();
        ledger.record("API Health Check", true, "");
        ledger.record("Main Page Load", false, "timeout");

        let rendered = outcome_table(&ledger).to_string();
        assert!(rendered.contains("API Health Check"));
        assert!(rendered.contains("FAIL"));
        assert!(rendered.contains("timeout"));
    }
}
