//! Optional notice checks

use async_trait::async_trait;
use tracing::info;

use super::{settle, Check, CheckContext, Verdict};
use crate::error::E2eResult;
use crate::locale::{fill, Strings};

/// Display page stays operable with or without active notices
pub struct NoticeDisplay;

#[async_trait]
impl Check for NoticeDisplay {
    fn name(&self, strings: &Strings) -> String {
        strings.check_notice_display.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let settings = ctx.settings;
        ctx.session.goto(ctx.base_url).await?;
        settle(settings.notice_settle_ms).await;

        // No active notices is a valid state
        let count = ctx.session.count(&settings.notice_selector).await?;

        Ok(Verdict::pass().with_detail(fill(ctx.strings.notices_found, &[("count", count.to_string())])))
    }
}

/// Fill and submit the notice form in the admin panel
pub struct NoticeCreation;

#[async_trait]
impl Check for NoticeCreation {
    fn name(&self, strings: &Strings) -> String {
        strings.check_notice_creation.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let settings = ctx.settings;
        let url = ctx.page_url("/admin");
        ctx.session.goto(&url).await?;

        ctx.session
            .wait_for_text(&settings.notice_tab, settings.element_wait())
            .await?;
        ctx.session.click_text("*", &settings.notice_tab).await?;

        ctx.session.fill("[name='title']", &settings.notice_title).await?;
        ctx.session.fill("[name='content']", &settings.notice_content).await?;
        ctx.session.click_text("button", &settings.notice_submit_label).await?;

        settle(settings.submit_settle_ms).await;
        info!("Submitted notice {:?}", settings.notice_title);

        Ok(Verdict::pass())
    }
}
