use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, ReloadParams,
};
use chromiumoxide::page::Page;
use quiesce_core::{
    AutomationError, InitiatorType, PageActions, ResourceEntry, ResourceExpectation,
    ResourceTimeline,
};
use serde_json::{Value, json};
use tokio::time::sleep;

use crate::a11y::{self, Violation};
use crate::config::{IdleConfig, WaitConfig};
use crate::errors::classify;
use crate::idle::ResourceIdleWatcher;
use crate::js;
use crate::wait::ElementWait;

/// One open page plus the wait and idle tuning applied to everything done
/// on it. Implements [`PageActions`] for page components and
/// [`ResourceTimeline`] for the idle watcher.
pub struct PageHandle {
    page: Page,
    waits: ElementWait,
    idle: IdleConfig,
}

impl PageHandle {
    pub fn new(page: Page, waits: WaitConfig, idle: IdleConfig) -> Self {
        Self {
            page,
            waits: ElementWait::new(waits),
            idle,
        }
    }

    /// Evaluate a script and return its JSON result, `null` when the script
    /// produced nothing.
    pub async fn evaluate(&self, script: String) -> Result<Value, AutomationError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| classify(e, "Evaluate"))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    pub async fn url(&self) -> Result<String, AutomationError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| classify(e, "ReadUrl"))?;
        Ok(url.unwrap_or_default())
    }

    /// Block until the page's asynchronous requests satisfy `expectations`
    /// and then go quiet.
    pub async fn wait_for_resources(
        &self,
        expectations: &[ResourceExpectation],
    ) -> Result<(), AutomationError> {
        ResourceIdleWatcher::new(self.idle.clone())
            .wait_for_resources(self, expectations)
            .await
    }

    pub async fn wait_until_idle(&self) -> Result<(), AutomationError> {
        self.wait_for_resources(&[]).await
    }

    /// Reload and wait for the page's requests to go idle again.
    pub async fn refresh(&self) -> Result<(), AutomationError> {
        self.page
            .execute(ReloadParams::default())
            .await
            .map_err(|e| classify(e, "Reload"))?;
        let navigation = self.waits.config().navigation;
        tokio::time::timeout(navigation, self.page.wait_for_navigation())
            .await
            .map_err(|_| {
                AutomationError::timeout_error(format!(
                    "Reload did not finish within {}ms",
                    navigation.as_millis()
                ))
            })?
            .map_err(|e| {
                AutomationError::navigation_error(format!("Reload did not finish: {}", e))
            })?;
        self.wait_until_idle().await
    }

    /// Emulate a different viewport size for this page.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), AutomationError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| {
                AutomationError::browser_error(format!("Viewport params failed: {}", e))
            })?;
        self.page
            .execute(params)
            .await
            .map_err(|e| classify(e, "SetViewport"))?;
        Ok(())
    }

    /// Full-page PNG capture written to `path`.
    pub async fn screenshot(&self, path: &Path) -> Result<(), AutomationError> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .build();
        let bytes = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| classify(e, "Screenshot"))?;
        tokio::fs::write(path, bytes).await.map_err(|e| {
            AutomationError::browser_error(format!("Failed to write screenshot: {}", e))
        })?;
        Ok(())
    }

    /// Read a file from disk and hand it to the page's file input.
    pub async fn upload_path(
        &self,
        selector: &str,
        path: &Path,
        mime: &str,
    ) -> Result<(), AutomationError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AutomationError::browser_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin");
        self.upload(selector, file_name, mime, &bytes).await
    }

    /// Run the in-page accessibility audit and return its findings.
    pub async fn audit_accessibility(&self) -> Result<Vec<Violation>, AutomationError> {
        let value = self
            .evaluate(js::build_js_call(js::a11y::AUDIT_PAGE, &[]))
            .await?;
        Ok(a11y::parse_violations(&value))
    }

    /// Audit and fail on findings, unless `skip_failures` downgrades them
    /// to log output.
    pub async fn check_accessibility(&self, skip_failures: bool) -> Result<(), AutomationError> {
        let violations = self.audit_accessibility().await?;
        a11y::enforce(&violations, skip_failures)
    }

    async fn run_action(
        &self,
        snippet: &str,
        args: &[Value],
        action: &str,
    ) -> Result<(), AutomationError> {
        let value = self.evaluate(js::build_js_call(snippet, args)).await?;
        let success = value
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if success {
            Ok(())
        } else {
            let detail = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown failure");
            Err(
                AutomationError::element_not_found(format!("{action}: {detail}"))
                    .with_context(json!({ "action": action, "detail": detail })),
            )
        }
    }
}

#[async_trait]
impl PageActions for PageHandle {
    async fn click(&self, selector: &str) -> Result<(), AutomationError> {
        self.waits
            .until_actionable(&self.page, selector, true)
            .await?;
        self.run_action(js::element::SAFE_CLICK, &[json!(selector)], "Click")
            .await
    }

    async fn click_parent(&self, selector: &str) -> Result<(), AutomationError> {
        self.run_action(js::element::CLICK_PARENT, &[json!(selector)], "ClickParent")
            .await
    }

    async fn click_containing(&self, selector: &str, text: &str) -> Result<(), AutomationError> {
        self.run_action(
            js::element::CLICK_CONTAINING,
            &[json!(selector), json!(text)],
            "ClickContaining",
        )
        .await
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        clear_first: bool,
    ) -> Result<(), AutomationError> {
        self.waits
            .until_actionable(&self.page, selector, true)
            .await?;
        self.run_action(
            js::element::TYPE_TEXT,
            &[json!(selector), json!(text), json!(clear_first)],
            "TypeText",
        )
        .await
    }

    async fn class_list(&self, selector: &str) -> Result<Vec<String>, AutomationError> {
        let value = self
            .evaluate(js::build_js_call(js::element::CLASS_LIST, &[json!(selector)]))
            .await?;
        match value.as_array() {
            Some(list) => Ok(list
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()),
            None => Err(AutomationError::element_not_found(format!(
                "No element matches '{selector}'"
            ))),
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, AutomationError> {
        let value = self
            .evaluate(js::build_js_call(
                js::element::COUNT_MATCHES,
                &[json!(selector)],
            ))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, AutomationError> {
        let value = self
            .evaluate(js::build_js_call(js::element::VISIBILITY, &[json!(selector)]))
            .await?;
        Ok(value
            .get("visible")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn text_of(&self, selector: &str) -> Result<String, AutomationError> {
        let value = self
            .evaluate(js::build_js_call(
                js::element::TEXT_CONTENT,
                &[json!(selector)],
            ))
            .await?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            AutomationError::element_not_found(format!("No element matches '{selector}'"))
        })
    }

    async fn wait_visible(&self, selector: &str) -> Result<(), AutomationError> {
        self.waits.until_visible(&self.page, selector).await
    }

    async fn wait_hidden(&self, selector: &str) -> Result<(), AutomationError> {
        self.waits.until_hidden(&self.page, selector).await
    }

    async fn wait_visible_containing(
        &self,
        selector: &str,
        text: &str,
    ) -> Result<(), AutomationError> {
        self.waits
            .until_visible_containing(&self.page, selector, text)
            .await
    }

    async fn upload(
        &self,
        selector: &str,
        file_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<(), AutomationError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.run_action(
            js::input::SET_FILE_INPUT,
            &[
                json!(selector),
                json!(file_name),
                json!(mime),
                json!(encoded),
            ],
            "Upload",
        )
        .await?;
        sleep(self.waits.config().settle_delay).await;
        Ok(())
    }
}

#[async_trait]
impl ResourceTimeline for PageHandle {
    async fn resources(&self) -> Result<Vec<ResourceEntry>, AutomationError> {
        let script = js::build_js_call(js::resource::COLLECT_RESOURCES, &[]);
        let value = self.evaluate(script).await?;
        let mut entries = Vec::new();
        if let Some(list) = value.as_array() {
            for item in list {
                let Some(obj) = item.as_object() else { continue };
                let name = obj.get("name").and_then(Value::as_str).unwrap_or_default();
                let initiator = obj
                    .get("initiatorType")
                    .and_then(Value::as_str)
                    .unwrap_or("other");
                entries.push(ResourceEntry::new(name, InitiatorType::parse(initiator)));
            }
        }
        Ok(entries)
    }
}
