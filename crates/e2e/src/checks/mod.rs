//! Check procedures run against the application under test
//!
//! Every check produces exactly one [`Verdict`]. Failures are returned as
//! `Err` and turned into FAIL outcomes by the runner.

mod api;
mod notices;
mod pages;

use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::browser::BrowserSession;
use crate::error::E2eResult;
use crate::locale::Strings;

pub use api::{ApiEndpoint, ApiHealth, ApiNotFound, PageStatus, PayloadValidation, Resource, ResourceCrud};
pub use notices::{NoticeCreation, NoticeDisplay};
pub use pages::{AdminPageAccess, DocumentDisplay, ErrorHandling, MainPageLoad, ResponsiveDesign};

/// Judgment produced by a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub detail: String,
}

impl Verdict {
    pub fn pass() -> Self {
        Self::from_bool(true)
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }

    pub fn from_bool(passed: bool) -> Self {
        Self {
            passed,
            detail: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Everything a check may touch while it runs
pub struct CheckContext<'a> {
    /// Base URL without a trailing slash
    pub base_url: &'a str,
    pub api_url: String,
    pub http: &'a reqwest::Client,
    pub session: &'a mut BrowserSession,
    pub settings: &'a CheckSettings,
    pub strings: &'static Strings,
}

impl CheckContext<'_> {
    pub fn page_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

/// A single independently reported test case
#[async_trait]
pub trait Check: Send + Sync {
    /// Display name in the given locale
    fn name(&self, strings: &Strings) -> String;

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict>;
}

/// Checks that only run when explicitly enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OptionalCheck {
    /// Look for notice elements on the display page
    NoticeDisplay,
    /// Create a notice through the admin panel
    NoticeCreation,
    /// Create, read, update and delete a notice over the REST API
    NoticesCrud,
    /// Create, read, update and delete a document over the REST API
    DocumentsCrud,
    /// Malformed notice and document payloads are rejected with 400
    PayloadValidation,
    /// Frontend routes answer with a success status
    PageStatus,
    /// Unknown records and API routes answer 404
    ApiNotFound,
}

/// A REST route checked with GET, relative to the API root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRoute {
    pub path: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

fn default_expected_status() -> u16 {
    200
}

impl ApiRoute {
    pub fn get(path: &str) -> Self {
        Self {
            path: path.to_string(),
            expected_status: default_expected_status(),
        }
    }
}

/// Selectors, markers and delays used by the built-in checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    /// Bounded wait for marker text
    pub element_wait_ms: u64,
    pub document_settle_ms: u64,
    pub mobile_settle_ms: u64,
    pub resize_settle_ms: u64,
    pub notice_settle_ms: u64,
    pub submit_settle_ms: u64,
    pub http_timeout_ms: u64,

    pub main_marker: String,
    pub time_display_selector: String,
    pub admin_markers: Vec<String>,
    /// Alternatives; any match passes
    pub document_selectors: Vec<String>,
    pub notice_selector: String,
    pub invalid_path: String,
    pub endpoints: Vec<ApiRoute>,

    pub notice_tab: String,
    pub notice_submit_label: String,
    pub notice_title: String,
    pub notice_content: String,

    pub document_title: String,
    pub document_url: String,
    /// Frontend routes for the page status checks
    pub status_pages: Vec<String>,
    /// Record id that must not exist
    pub missing_id: u64,
    pub unknown_api_path: String,

    pub enabled: Vec<OptionalCheck>,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            element_wait_ms: 10_000,
            document_settle_ms: 3_000,
            mobile_settle_ms: 2_000,
            resize_settle_ms: 1_000,
            notice_settle_ms: 5_000,
            submit_settle_ms: 2_000,
            http_timeout_ms: 10_000,

            main_marker: "Marinha do Brasil".to_string(),
            time_display_selector: ".font-mono".to_string(),
            admin_markers: vec!["Avisos".to_string(), "Documentos".to_string()],
            document_selectors: vec![
                ".pdf-viewer".to_string(),
                "[class*='document'], [class*='plasa'], [class*='escala']".to_string(),
            ],
            notice_selector: "[class*='notice'], [class*='aviso']".to_string(),
            invalid_path: "/invalid-page".to_string(),
            endpoints: vec![
                ApiRoute::get("/health"),
                ApiRoute::get("/notices"),
                ApiRoute::get("/documents"),
            ],

            notice_tab: "Avisos".to_string(),
            notice_submit_label: "Criar".to_string(),
            notice_title: "Test Notice from Navy E2E".to_string(),
            notice_content: "This is a test notice created by automated testing".to_string(),

            document_title: "Test Document".to_string(),
            document_url: "/test/document.pdf".to_string(),
            status_pages: vec!["/".to_string(), "/admin".to_string()],
            missing_id: 99_999,
            unknown_api_path: "/invalid-endpoint".to_string(),

            enabled: Vec::new(),
        }
    }
}

impl CheckSettings {
    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn is_enabled(&self, check: OptionalCheck) -> bool {
        self.enabled.contains(&check)
    }

    /// Collapse every delay so tests do not sleep
    pub fn without_delays(mut self) -> Self {
        self.document_settle_ms = 0;
        self.mobile_settle_ms = 0;
        self.resize_settle_ms = 0;
        self.notice_settle_ms = 0;
        self.submit_settle_ms = 0;
        self
    }
}

/// The standard check list in display order
pub fn default_checks(settings: &CheckSettings) -> Vec<Box<dyn Check>> {
    let mut checks: Vec<Box<dyn Check>> = vec![
        Box::new(ApiHealth),
        Box::new(MainPageLoad),
        Box::new(AdminPageAccess),
        Box::new(DocumentDisplay),
        Box::new(ResponsiveDesign),
    ];

    for route in &settings.endpoints {
        checks.push(Box::new(ApiEndpoint::new(route.clone())));
    }

    checks.push(Box::new(ErrorHandling));

    if settings.is_enabled(OptionalCheck::NoticeDisplay) {
        checks.push(Box::new(NoticeDisplay));
    }
    if settings.is_enabled(OptionalCheck::NoticeCreation) {
        checks.push(Box::new(NoticeCreation));
    }
    if settings.is_enabled(OptionalCheck::NoticesCrud) {
        checks.push(Box::new(ResourceCrud::new(Resource::Notices)));
    }
    if settings.is_enabled(OptionalCheck::DocumentsCrud) {
        checks.push(Box::new(ResourceCrud::new(Resource::Documents)));
    }
    if settings.is_enabled(OptionalCheck::PayloadValidation) {
        checks.push(Box::new(PayloadValidation::new(Resource::Notices)));
        checks.push(Box::new(PayloadValidation::new(Resource::Documents)));
    }
    if settings.is_enabled(OptionalCheck::PageStatus) {
        for path in &settings.status_pages {
            checks.push(Box::new(PageStatus::new(path.as_str())));
        }
    }
    if settings.is_enabled(OptionalCheck::ApiNotFound) {
        checks.push(Box::new(ApiNotFound::new(format!("/notices/{}", settings.missing_id))));
        checks.push(Box::new(ApiNotFound::new(format!("/documents/{}", settings.missing_id))));
        checks.push(Box::new(ApiNotFound::new(settings.unknown_api_path.as_str())));
    }

    checks
}

async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
