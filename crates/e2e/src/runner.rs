//! Test runner that orchestrates the server, the browser and the check list

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserLauncher, BrowserManager};
use crate::checks::{default_checks, Check, CheckContext};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::ledger::{ResultLedger, Summary, TestOutcome};
use crate::locale::Locale;
use crate::server::{ServerConfig, ServerController};

/// Progress hooks for a run. All methods default to no-ops.
pub trait RunObserver: Send {
    fn starting_server(&mut self, _config: &ServerConfig) {}

    fn waiting_for_server(&mut self, _health_url: &str) {}

    fn server_ready(&mut self) {}

    /// Called once per outcome, right after it is recorded
    fn outcome(&mut self, _outcome: &TestOutcome) {}
}

pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Run every check in order, one outcome per check.
///
/// A check that returns `Err` or panics is recorded as FAIL and the
/// remaining checks still run.
pub async fn run_checks(
    checks: &[Box<dyn Check>],
    ctx: &mut CheckContext<'_>,
    observer: &mut dyn RunObserver,
) -> ResultLedger {
    let mut ledger = ResultLedger::new();
    info!("Running {} test(s)...", checks.len());

    for check in checks {
        let name = check.name(ctx.strings);
        debug!("Running test: {}", name);
        let start = Instant::now();

        let result = match AssertUnwindSafe(check.run(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(E2eError::CheckPanicked(panic_message(payload))),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let (passed, detail) = match result {
            Ok(verdict) => (verdict.passed, verdict.detail),
            Err(e) => (false, e.to_string()),
        };

        let outcome = ledger.record_timed(name, passed, detail, duration_ms);
        if passed {
            info!("✓ {} ({} ms)", outcome.name, duration_ms);
        } else {
            error!("✗ {} - {}", outcome.name, outcome.detail);
        }
        observer.outcome(outcome);
    }

    let summary = ledger.summary();
    info!(
        "Test Results: {} passed, {} failed ({:.1}%)",
        summary.passed, summary.failed, summary.success_rate
    );
    ledger
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// JSON document written by [`TestRunner::write_results`]
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub base_url: &'a str,
    pub locale: Locale,
    pub summary: Summary,
    pub outcomes: &'a [TestOutcome],
}

/// Main E2E test runner
pub struct TestRunner {
    config: HarnessConfig,

    /// Declared before `server` so the browser is released first on drop
    browser: BrowserManager,

    server: ServerController,

    http: reqwest::Client,

    checks: Vec<Box<dyn Check>>,
}

impl TestRunner {
    /// Create a test runner with default configuration
    pub fn new() -> E2eResult<Self> {
        Self::with_config(HarnessConfig::default())
    }

    /// Create a test runner with the built-in check list
    pub fn with_config(config: HarnessConfig) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.checks.http_timeout_ms))
            .build()?;

        Ok(Self {
            browser: BrowserManager::new(config.browser.clone()),
            server: ServerController::new(config.server.clone())?,
            checks: default_checks(&config.checks),
            http,
            config,
        })
    }

    /// Replace the browser launcher
    pub fn with_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = BrowserManager::with_launcher(self.config.browser.clone(), launcher);
        self
    }

    /// Replace the check list
    pub fn with_checks(mut self, checks: Vec<Box<dyn Check>>) -> Self {
        self.checks = checks;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn check_names(&self) -> Vec<String> {
        let strings = self.config.locale.strings();
        self.checks.iter().map(|c| c.name(strings)).collect()
    }

    /// Bring up the environment, run every check and tear everything down.
    ///
    /// `Err` means the environment could not be set up and no check ran.
    /// The browser is closed and the server stopped on every path.
    pub async fn run(&mut self, observer: &mut dyn RunObserver) -> E2eResult<ResultLedger> {
        let result = self.run_inner(observer).await;

        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.server.shutdown().await {
            warn!("Failed to stop server: {}", e);
        }

        result
    }

    async fn run_inner(&mut self, observer: &mut dyn RunObserver) -> E2eResult<ResultLedger> {
        observer.starting_server(self.server.config());
        self.server.start()?;

        let health_url = self.config.health_url();
        let timeout = self.server.config().startup_timeout();
        observer.waiting_for_server(&health_url);
        if !self.server.await_ready(&health_url, timeout).await {
            return Err(E2eError::ServerNotReady {
                url: health_url,
                timeout_secs: timeout.as_secs(),
            });
        }
        observer.server_ready();

        let session = self.browser.open().await?;
        let mut ctx = CheckContext {
            base_url: self.config.base_url(),
            api_url: self.config.api_url(),
            http: &self.http,
            session,
            settings: &self.config.checks,
            strings: self.config.locale.strings(),
        };

        Ok(run_checks(&self.checks, &mut ctx, observer).await)
    }

    /// Write the ledger to a JSON file, creating parent directories
    pub fn write_results(&self, ledger: &ResultLedger, path: &Path) -> E2eResult<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let report = RunReport {
            generated_at: Utc::now(),
            base_url: self.config.base_url(),
            locale: self.config.locale,
            summary: ledger.summary(),
            outcomes: ledger.outcomes(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// Process exit status for a run: 0 only when the environment came up and
/// every outcome passed
pub fn exit_code(result: &E2eResult<ResultLedger>) -> i32 {
    match result {
        Ok(ledger) if ledger.all_passed() => 0,
        _ => 1,
    }
}
