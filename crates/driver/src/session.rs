use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use futures::StreamExt;
use quiesce_core::AutomationError;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::actions::PageHandle;
use crate::config::{IdleConfig, SessionConfig, WaitConfig};

/// A running browser. Pages opened from it inherit the session's wait and
/// idle tuning.
pub struct Session {
    browser: Browser,
    handler_task: JoinHandle<()>,
    waits: WaitConfig,
    idle: IdleConfig,
}

impl Session {
    /// Launch with default wait and idle tuning.
    pub async fn launch(config: SessionConfig) -> Result<Self, AutomationError> {
        Self::launch_with(config, WaitConfig::default(), IdleConfig::default()).await
    }

    pub async fn launch_with(
        config: SessionConfig,
        waits: WaitConfig,
        idle: IdleConfig,
    ) -> Result<Self, AutomationError> {
        // Fresh profile dir per session so parallel browsers don't fight
        // over the singleton lock.
        let temp_dir = std::env::temp_dir().join(format!("quiesce-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_dir).map_err(|e| {
            AutomationError::browser_error(format!("Failed to create profile dir: {}", e))
        })?;

        let mut builder = BrowserConfig::builder()
            .headless_mode(if config.headless {
                HeadlessMode::True
            } else {
                HeadlessMode::False
            })
            .user_data_dir(&temp_dir);

        if let (Some(w), Some(h)) = (config.viewport_width, config.viewport_height) {
            builder = builder.window_size(w, h);
        }

        let browser_config = builder
            .build()
            .map_err(|e| AutomationError::browser_error(format!("Browser config failed: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| AutomationError::browser_error(format!("Browser launch failed: {}", e)))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        info!(headless = config.headless, "browser session started");

        Ok(Self {
            browser,
            handler_task,
            waits,
            idle,
        })
    }

    /// Open a page and wait for its initial navigation to finish.
    pub async fn open(&self, url: &str) -> Result<PageHandle, AutomationError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AutomationError::browser_error(format!("New page failed: {}", e)))?;

        page.goto(url.to_string())
            .await
            .map_err(|e| AutomationError::navigation_error(format!("Navigation failed: {}", e)))?;
        tokio::time::timeout(self.waits.navigation, page.wait_for_navigation())
            .await
            .map_err(|_| {
                AutomationError::timeout_error(format!(
                    "Navigation did not finish within {}ms",
                    self.waits.navigation.as_millis()
                ))
            })?
            .map_err(|e| {
                AutomationError::navigation_error(format!("Navigation did not finish: {}", e))
            })?;
        debug!(url, "page opened");

        Ok(PageHandle::new(page, self.waits.clone(), self.idle.clone()))
    }

    /// Shut the browser down and reap the process.
    pub async fn close(mut self) -> Result<(), AutomationError> {
        self.browser
            .close()
            .await
            .map_err(|e| AutomationError::browser_error(format!("Browser close failed: {}", e)))?;
        self.browser
            .wait()
            .await
            .map_err(|e| AutomationError::browser_error(format!("Browser did not exit: {}", e)))?;
        self.handler_task.abort();
        info!("browser session closed");
        Ok(())
    }
}
