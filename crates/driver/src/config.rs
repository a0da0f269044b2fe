use std::time::Duration;

/// Tuning for the resource idle watcher.
///
/// The watcher polls the page's resource timeline on a fixed interval and
/// resolves once the set of asynchronous requests has stopped growing for
/// `idle_threshold` consecutive polls. `global_timeout` is an absolute
/// deadline for the whole watch and always wins, even against a poll that
/// would have completed the countdown.
#[derive(Debug, Clone)]
pub struct IdleConfig {
    /// Absolute deadline for the whole watch.
    pub global_timeout: Duration,
    /// Delay between successive timeline polls.
    pub poll_interval: Duration,
    /// Consecutive polls with an unchanged request count required to resolve.
    pub idle_threshold: u32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            global_timeout: Duration::from_millis(20_000),
            poll_interval: Duration::from_millis(1_000),
            idle_threshold: 3,
        }
    }
}

impl IdleConfig {
    pub fn with_global_timeout(mut self, millis: u64) -> Self {
        self.global_timeout = Duration::from_millis(millis);
        self
    }

    pub fn with_poll_interval(mut self, millis: u64) -> Self {
        self.poll_interval = Duration::from_millis(millis);
        self
    }

    pub fn with_idle_threshold(mut self, polls: u32) -> Self {
        self.idle_threshold = polls;
        self
    }

    /// Snappier settings for pages that settle quickly.
    pub fn fast() -> Self {
        Self {
            global_timeout: Duration::from_millis(8_000),
            poll_interval: Duration::from_millis(400),
            idle_threshold: 2,
        }
    }

    /// Generous settings for slow backends.
    pub fn patient() -> Self {
        Self {
            global_timeout: Duration::from_millis(60_000),
            poll_interval: Duration::from_millis(2_000),
            idle_threshold: 4,
        }
    }
}

/// Timeouts for element-state waits.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// How long to wait for an element to reach the requested state.
    pub element_wait: Duration,
    /// How long to wait for a page navigation to finish.
    pub navigation: Duration,
    /// Delay between element-state checks.
    pub check_interval: Duration,
    /// Extra pause after a hide or an upload, for handlers to run.
    pub settle_delay: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            element_wait: Duration::from_millis(15_000),
            navigation: Duration::from_millis(30_000),
            check_interval: Duration::from_millis(300),
            settle_delay: Duration::from_millis(250),
        }
    }
}

impl WaitConfig {
    pub fn with_element_wait(mut self, millis: u64) -> Self {
        self.element_wait = Duration::from_millis(millis);
        self
    }

    pub fn with_navigation(mut self, millis: u64) -> Self {
        self.navigation = Duration::from_millis(millis);
        self
    }

    pub fn with_check_interval(mut self, millis: u64) -> Self {
        self.check_interval = Duration::from_millis(millis);
        self
    }

    pub fn with_settle_delay(mut self, millis: u64) -> Self {
        self.settle_delay = Duration::from_millis(millis);
        self
    }

    pub fn fast() -> Self {
        Self {
            element_wait: Duration::from_millis(5_000),
            navigation: Duration::from_millis(10_000),
            check_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(100),
        }
    }

    pub fn patient() -> Self {
        Self {
            element_wait: Duration::from_millis(30_000),
            navigation: Duration::from_millis(60_000),
            check_interval: Duration::from_millis(500),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Launch options for a browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub headless: bool,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: None,
            viewport_height: None,
        }
    }
}

impl SessionConfig {
    pub fn headed() -> Self {
        Self {
            headless: false,
            ..Self::default()
        }
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = Some(width);
        self.viewport_height = Some(height);
        self
    }
}
