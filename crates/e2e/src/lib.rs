//! Navy Display E2E Test Harness
//!
//! This crate drives an end-to-end verification pass against the Navy
//! Display web application:
//! - Spawns the application as a subprocess and waits for its health endpoint
//! - Opens a headless Chromium session over the DevTools protocol
//! - Runs an ordered list of checks, each yielding one PASS/FAIL outcome
//! - Tears the browser and the server down on every exit path
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TestRunner                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ServerController   start() / await_ready() / shutdown()    │
//! │  BrowserManager     open() -> BrowserSession / close()      │
//! │  Vec<Box<dyn Check>>                                        │
//! │    ├── ApiHealth, MainPageLoad, AdminPageAccess             │
//! │    ├── DocumentDisplay, ResponsiveDesign                    │
//! │    ├── ApiEndpoint (one per route), ErrorHandling           │
//! │    ├── NoticeDisplay, NoticeCreation (opt-in)               │
//! │    └── ResourceCrud, PayloadValidation, PageStatus,         │
//! │        ApiNotFound (opt-in HTTP API suite)                  │
//! │  ResultLedger       ordered outcomes + summary              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod checks;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locale;
pub mod runner;
pub mod server;

pub use browser::{BrowserConfig, BrowserDriver, BrowserLauncher, BrowserManager, BrowserSession, Viewport};
pub use checks::{Check, CheckContext, CheckSettings, OptionalCheck, Verdict};
pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use ledger::{ResultLedger, Status, Summary, TestOutcome};
pub use locale::{Locale, Strings};
pub use runner::{exit_code, run_checks, NoopObserver, RunObserver, TestRunner};
pub use server::{ServerConfig, ServerController};
