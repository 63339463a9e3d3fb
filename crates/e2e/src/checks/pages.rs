//! Browser-driven page checks

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{settle, Check, CheckContext, Verdict};
use crate::browser::Viewport;
use crate::error::E2eResult;
use crate::locale::Strings;

/// Display page shows the marker text and the clock
pub struct MainPageLoad;

#[async_trait]
impl Check for MainPageLoad {
    fn name(&self, strings: &Strings) -> String {
        strings.check_main_page.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let settings = ctx.settings;
        ctx.session.goto(ctx.base_url).await?;
        ctx.session
            .wait_for_text(&settings.main_marker, settings.element_wait())
            .await?;

        if ctx.session.exists(&settings.time_display_selector).await? {
            Ok(Verdict::pass())
        } else {
            Ok(Verdict::fail(format!("no element matches {}", settings.time_display_selector)))
        }
    }
}

/// Admin panel renders its tabs
pub struct AdminPageAccess;

#[async_trait]
impl Check for AdminPageAccess {
    fn name(&self, strings: &Strings) -> String {
        strings.check_admin_page.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let settings = ctx.settings;
        let url = ctx.page_url("/admin");
        ctx.session.goto(&url).await?;

        let markers: Vec<&str> = settings.admin_markers.iter().map(String::as_str).collect();
        let found = ctx
            .session
            .wait_for_any_text(&markers, settings.element_wait())
            .await?;
        debug!("Admin marker found: {}", found);

        Ok(Verdict::pass())
    }
}

/// A document container is on screen after the display settles
pub struct DocumentDisplay;

#[async_trait]
impl Check for DocumentDisplay {
    fn name(&self, strings: &Strings) -> String {
        strings.check_document_display.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let settings = ctx.settings;
        ctx.session.goto(ctx.base_url).await?;
        settle(settings.document_settle_ms).await;

        for selector in &settings.document_selectors {
            if ctx.session.exists(selector).await? {
                debug!("Document container matched {}", selector);
                return Ok(Verdict::pass());
            }
        }

        Ok(Verdict::fail("no document container on page"))
    }
}

/// Marker survives a mobile viewport; the viewport is walked back up to desktop
pub struct ResponsiveDesign;

#[async_trait]
impl Check for ResponsiveDesign {
    fn name(&self, strings: &Strings) -> String {
        strings.check_responsive.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let settings = ctx.settings;

        ctx.session.set_viewport(Viewport::MOBILE).await?;
        let mobile = marker_at_current_size(ctx).await;

        for viewport in [Viewport::TABLET, Viewport::DESKTOP] {
            if let Err(e) = ctx.session.set_viewport(viewport).await {
                warn!("Failed to resize viewport to {}x{}: {}", viewport.width, viewport.height, e);
            }
            settle(settings.resize_settle_ms).await;
        }

        mobile.map(|_| Verdict::pass())
    }
}

async fn marker_at_current_size(ctx: &mut CheckContext<'_>) -> E2eResult<()> {
    let settings = ctx.settings;
    ctx.session.goto(ctx.base_url).await?;
    settle(settings.mobile_settle_ms).await;
    ctx.session
        .wait_for_text(&settings.main_marker, settings.element_wait())
        .await
}

/// Unknown routes show a 404 or bounce back to the root page
pub struct ErrorHandling;

#[async_trait]
impl Check for ErrorHandling {
    fn name(&self, strings: &Strings) -> String {
        strings.check_error_handling.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let settings = ctx.settings;
        let url = ctx.page_url(&settings.invalid_path);
        ctx.session.goto(&url).await?;

        let current_url = ctx.session.current_url().await?;
        let source = ctx.session.content().await?;
        let root = ctx.page_url("/");

        let passed = source.contains("404") || current_url == root;
        if passed {
            Ok(Verdict::pass())
        } else {
            Ok(Verdict::fail(format!("no 404 marker and landed on {}", current_url)))
        }
    }
}
