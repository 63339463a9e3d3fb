//! HTTP-only checks against the REST API

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Check, CheckContext, CheckSettings, ApiRoute, Verdict};
use crate::error::E2eResult;
use crate::locale::{fill, Strings};

/// `GET /api/health` answers 200 with a `status` field
pub struct ApiHealth;

#[async_trait]
impl Check for ApiHealth {
    fn name(&self, strings: &Strings) -> String {
        strings.check_api_health.to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let response = ctx.http.get(ctx.api("/health")).send().await?;
        let status = response.status();
        if status.as_u16() != 200 {
            return Ok(Verdict::fail(format!("Status: {}", status.as_u16())));
        }

        let body: serde_json::Value = response.json().await?;
        debug!("Health response: {}", body);

        if body.get("status").is_some() {
            Ok(Verdict::pass())
        } else {
            Ok(Verdict::fail("response has no \"status\" field"))
        }
    }
}

/// One endpoint of the REST sweep
pub struct ApiEndpoint {
    route: ApiRoute,
}

impl ApiEndpoint {
    pub fn new(route: ApiRoute) -> Self {
        Self { route }
    }
}

#[async_trait]
impl Check for ApiEndpoint {
    fn name(&self, _strings: &Strings) -> String {
        format!("API GET {}", self.route.path)
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let response = ctx.http.get(ctx.api(&self.route.path)).send().await?;
        let code = response.status().as_u16();

        Ok(Verdict::from_bool(code == self.route.expected_status).with_detail(format!("Status: {}", code)))
    }
}

/// REST collection exercised by the CRUD and validation checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Notices,
    Documents,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Notices => "/notices",
            Resource::Documents => "/documents",
        }
    }

    /// Envelope key for a list response, e.g. `{"notices": [...]}`
    fn list_key(self) -> &'static str {
        match self {
            Resource::Notices => "notices",
            Resource::Documents => "documents",
        }
    }

    /// Envelope key for a single item, e.g. `{"notice": {...}}`
    fn item_key(self) -> &'static str {
        match self {
            Resource::Notices => "notice",
            Resource::Documents => "document",
        }
    }

    /// A payload the application must accept
    pub fn sample(self, settings: &CheckSettings) -> Value {
        let now = Utc::now();
        match self {
            Resource::Notices => json!({
                "title": settings.notice_title,
                "content": settings.notice_content,
                "priority": "high",
                "startDate": now.to_rfc3339(),
                "endDate": (now + ChronoDuration::days(1)).to_rfc3339(),
                "active": true,
            }),
            Resource::Documents => json!({
                "title": settings.document_title,
                "url": settings.document_url,
                "type": "plasa",
                "category": "oficial",
                "active": true,
            }),
        }
    }

    /// A payload the application must reject with 400
    pub fn invalid_sample(self) -> Value {
        match self {
            Resource::Notices => json!({
                "title": "",
                "content": "Test content",
                "priority": "invalid_priority",
                "startDate": "invalid_date",
                "endDate": Utc::now().to_rfc3339(),
                "active": true,
            }),
            Resource::Documents => json!({
                "title": "Test",
                "url": "/test.pdf",
                "type": "invalid_type",
                "active": true,
            }),
        }
    }

    /// Accepts both a bare array and the `{"<list_key>": [...]}` envelope
    fn list<'v>(self, body: &'v Value) -> Option<&'v Vec<Value>> {
        body.as_array()
            .or_else(|| body.get(self.list_key()).and_then(Value::as_array))
    }

    /// Accepts both a bare object and the `{"<item_key>": {...}}` envelope
    fn item<'v>(self, body: &'v Value) -> &'v Value {
        body.get(self.item_key()).filter(|v| v.is_object()).unwrap_or(body)
    }
}

/// Send a request and decode the body as JSON, `Null` when it is not JSON
async fn exchange(request: RequestBuilder) -> E2eResult<(StatusCode, Value)> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    Ok((status, serde_json::from_str(&text).unwrap_or(Value::Null)))
}

fn id_segment(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// List, create, list again, update and delete one record
pub struct ResourceCrud {
    resource: Resource,
}

impl ResourceCrud {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }
}

#[async_trait]
impl Check for ResourceCrud {
    fn name(&self, strings: &Strings) -> String {
        match self.resource {
            Resource::Notices => strings.check_notices_crud,
            Resource::Documents => strings.check_documents_crud,
        }
        .to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let resource = self.resource;
        let path = resource.path();
        let url = ctx.api(path);

        let (status, body) = exchange(ctx.http.get(&url)).await?;
        if !status.is_success() || resource.list(&body).is_none() {
            return Ok(Verdict::fail(format!("GET {}: Status: {}", path, status.as_u16())));
        }

        let (status, body) = exchange(ctx.http.post(&url).json(&resource.sample(ctx.settings))).await?;
        let created = resource.item(&body).clone();
        let Some(id) = id_segment(&created).filter(|_| status.is_success()) else {
            return Ok(Verdict::fail(format!("POST {}: Status: {}", path, status.as_u16())));
        };
        debug!("Created {} {}", resource.item_key(), id);

        let item_url = format!("{}/{}", url, id);
        let mut problems = Vec::new();

        let (status, body) = exchange(ctx.http.get(&url)).await?;
        if !status.is_success() || resource.list(&body).map_or(true, |items| items.is_empty()) {
            problems.push(format!("GET {} after POST: no records", path));
        }

        let title = format!("Updated {}", created["title"].as_str().unwrap_or_default());
        let mut update = created;
        update["title"] = Value::from(title.as_str());
        let (status, body) = exchange(ctx.http.put(&item_url).json(&update)).await?;
        if !status.is_success() || resource.item(&body)["title"] != title.as_str() {
            problems.push(format!("PUT {}/{}: Status: {}", path, id, status.as_u16()));
        }

        // Delete even when an earlier step failed so the record does not linger
        let (status, body) = exchange(ctx.http.delete(&item_url)).await?;
        if !status.is_success() || body["success"] != true {
            problems.push(format!("DELETE {}/{}: Status: {}", path, id, status.as_u16()));
        }

        if problems.is_empty() {
            Ok(Verdict::pass())
        } else {
            Ok(Verdict::fail(problems.join("; ")))
        }
    }
}

/// Malformed payloads are rejected with 400
pub struct PayloadValidation {
    resource: Resource,
}

impl PayloadValidation {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }
}

#[async_trait]
impl Check for PayloadValidation {
    fn name(&self, strings: &Strings) -> String {
        match self.resource {
            Resource::Notices => strings.check_notice_validation,
            Resource::Documents => strings.check_document_validation,
        }
        .to_string()
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let resource = self.resource;
        let url = ctx.api(resource.path());
        let (status, body) = exchange(ctx.http.post(&url).json(&resource.invalid_sample())).await?;

        if status == StatusCode::BAD_REQUEST {
            return Ok(Verdict::pass());
        }

        if let Some(id) = id_segment(resource.item(&body)).filter(|_| status.is_success()) {
            warn!("Invalid {} was accepted as {}, removing it", resource.item_key(), id);
            let _ = exchange(ctx.http.delete(format!("{}/{}", url, id))).await;
        }
        Ok(Verdict::fail(format!("Expected 400, got {}", status.as_u16())))
    }
}

/// A frontend route answers with a success status over plain HTTP
pub struct PageStatus {
    path: String,
}

impl PageStatus {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Check for PageStatus {
    fn name(&self, strings: &Strings) -> String {
        fill(strings.check_page_status, &[("path", self.path.clone())])
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let response = ctx.http.get(ctx.page_url(&self.path)).send().await?;
        let code = response.status();

        Ok(Verdict::from_bool(code.is_success()).with_detail(format!("Status: {}", code.as_u16())))
    }
}

/// An API path that must answer 404
pub struct ApiNotFound {
    path: String,
}

impl ApiNotFound {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Check for ApiNotFound {
    fn name(&self, strings: &Strings) -> String {
        fill(strings.check_api_not_found, &[("path", self.path.clone())])
    }

    async fn run(&self, ctx: &mut CheckContext<'_>) -> E2eResult<Verdict> {
        let response = ctx.http.get(ctx.api(&self.path)).send().await?;
        let code = response.status().as_u16();

        if code == 404 {
            Ok(Verdict::pass())
        } else {
            Ok(Verdict::fail(format!("Expected 404, got {}", code)))
        }
    }
}
