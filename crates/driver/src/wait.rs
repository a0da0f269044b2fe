use std::time::Instant;

use chromiumoxide::page::Page;
use quiesce_core::AutomationError;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::debug;

use crate::config::WaitConfig;
use crate::errors::{classify, is_context_loss};
use crate::js;

/// Snapshot of one element's readiness, parsed from the in-page check.
#[derive(Debug, Default)]
struct ElementState {
    exists: bool,
    visible: bool,
    obscured: bool,
    disabled: bool,
    obscured_by: Option<String>,
}

impl ElementState {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            exists: obj.get("exists").and_then(Value::as_bool).unwrap_or(false),
            visible: obj.get("visible").and_then(Value::as_bool).unwrap_or(false),
            obscured: obj.get("obscured").and_then(Value::as_bool).unwrap_or(false),
            disabled: obj.get("disabled").and_then(Value::as_bool).unwrap_or(false),
            obscured_by: obj
                .get("obscuredBy")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn actionable(&self, require_enabled: bool) -> bool {
        self.exists && self.visible && !self.obscured && !(require_enabled && self.disabled)
    }

    fn blocker(&self) -> &'static str {
        if !self.exists {
            "was not found"
        } else if !self.visible {
            "never became visible"
        } else if self.obscured {
            "stayed obscured"
        } else {
            "stayed disabled"
        }
    }

    fn summary(&self) -> String {
        format!(
            "exists={} visible={} obscured={} disabled={}",
            self.exists, self.visible, self.obscured, self.disabled
        )
    }
}

/// Polls element state until it reaches the requested condition. Evaluation
/// failures caused by a navigating page are retried, not surfaced.
pub struct ElementWait {
    config: WaitConfig,
}

impl ElementWait {
    pub fn new(config: WaitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Wait until the element exists, is visible, is not covered by another
    /// element, and, when `require_enabled` is set, is not disabled.
    pub async fn until_actionable(
        &self,
        page: &Page,
        selector: &str,
        require_enabled: bool,
    ) -> Result<(), AutomationError> {
        let start = Instant::now();
        let script = js::build_js_call(js::element::CHECK_ELEMENT_STATE, &[json!(selector)]);
        let mut last: Option<ElementState> = None;

        loop {
            match page.evaluate(script.clone()).await {
                Ok(result) => {
                    if let Some(state) = result.value().and_then(ElementState::from_value) {
                        if last.as_ref().map(|s| s.summary()) != Some(state.summary()) {
                            debug!(selector, state = %state.summary(), "element state");
                        }
                        if state.actionable(require_enabled) {
                            return Ok(());
                        }
                        last = Some(state);
                    }
                }
                Err(e) if is_context_loss(&e) => {}
                Err(e) => return Err(classify(e, "Actionability check")),
            }

            if start.elapsed() > self.config.element_wait {
                let reason = last.as_ref().map(ElementState::blocker).unwrap_or("was not found");
                let obscured_by = last.as_ref().and_then(|s| s.obscured_by.clone());
                return Err(AutomationError::element_not_found(format!(
                    "Element '{selector}' {reason} within {}ms",
                    self.config.element_wait.as_millis()
                ))
                .with_context(json!({
                    "selector": selector,
                    "reason": reason,
                    "obscured_by": obscured_by,
                })));
            }

            sleep(self.config.check_interval).await;
        }
    }

    /// Wait until the first match is visible.
    pub async fn until_visible(&self, page: &Page, selector: &str) -> Result<(), AutomationError> {
        let script = js::build_js_call(js::element::VISIBILITY, &[json!(selector)]);
        self.poll_until(
            page,
            script,
            |v| v.get("visible").and_then(Value::as_bool).unwrap_or(false),
            &format!("'{selector}' to become visible"),
        )
        .await
    }

    /// Wait until the selector matches nothing visible, then let late
    /// handlers settle.
    pub async fn until_hidden(&self, page: &Page, selector: &str) -> Result<(), AutomationError> {
        let script = js::build_js_call(js::element::VISIBILITY, &[json!(selector)]);
        self.poll_until(
            page,
            script,
            |v| {
                let exists = v.get("exists").and_then(Value::as_bool).unwrap_or(false);
                let visible = v.get("visible").and_then(Value::as_bool).unwrap_or(false);
                !(exists && visible)
            },
            &format!("'{selector}' to go away"),
        )
        .await?;
        sleep(self.config.settle_delay).await;
        Ok(())
    }

    /// Wait until some match containing `text` is visible.
    pub async fn until_visible_containing(
        &self,
        page: &Page,
        selector: &str,
        text: &str,
    ) -> Result<(), AutomationError> {
        let script =
            js::build_js_call(js::element::VISIBLE_CONTAINING, &[json!(selector), json!(text)]);
        self.poll_until(
            page,
            script,
            |v| v.get("found").and_then(Value::as_bool).unwrap_or(false),
            &format!("'{selector}' containing '{text}' to become visible"),
        )
        .await
    }

    async fn poll_until<F>(
        &self,
        page: &Page,
        script: String,
        done: F,
        describe: &str,
    ) -> Result<(), AutomationError>
    where
        F: Fn(&Value) -> bool,
    {
        let start = Instant::now();
        loop {
            match page.evaluate(script.clone()).await {
                Ok(result) => {
                    let value = result.value().cloned().unwrap_or(Value::Null);
                    if done(&value) {
                        return Ok(());
                    }
                }
                Err(e) if is_context_loss(&e) => {}
                Err(e) => return Err(classify(e, "Element wait")),
            }

            if start.elapsed() > self.config.element_wait {
                return Err(AutomationError::timeout_error(format!(
                    "Timed out after {}ms waiting for {describe}",
                    self.config.element_wait.as_millis()
                ))
                .with_context(json!({ "waited_for": describe })));
            }

            sleep(self.config.check_interval).await;
        }
    }
}
