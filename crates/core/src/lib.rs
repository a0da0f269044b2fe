use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Initiator classification of a completed network fetch, as reported by the
/// browser's resource timing API (`PerformanceResourceTiming.initiatorType`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiatorType {
    /// `XMLHttpRequest`-initiated entries. The only class the idle watcher
    /// counts.
    XmlHttpRequest,
    Fetch,
    Script,
    Link,
    Img,
    Css,
    Navigation,
    Other(String),
}

impl InitiatorType {
    /// Parse the lowercase string the browser reports.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "xmlhttprequest" => InitiatorType::XmlHttpRequest,
            "fetch" => InitiatorType::Fetch,
            "script" => InitiatorType::Script,
            "link" => InitiatorType::Link,
            "img" => InitiatorType::Img,
            "css" => InitiatorType::Css,
            "navigation" => InitiatorType::Navigation,
            other => InitiatorType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InitiatorType::XmlHttpRequest => "xmlhttprequest",
            InitiatorType::Fetch => "fetch",
            InitiatorType::Script => "script",
            InitiatorType::Link => "link",
            InitiatorType::Img => "img",
            InitiatorType::Css => "css",
            InitiatorType::Navigation => "navigation",
            InitiatorType::Other(s) => s,
        }
    }
}

/// One browser-reported record of a completed network fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Request name, usually the full URL.
    pub name: String,
    pub initiator: InitiatorType,
}

impl ResourceEntry {
    pub fn new(name: impl Into<String>, initiator: InitiatorType) -> Self {
        Self { name: name.into(), initiator }
    }

    /// Shorthand for an XHR-initiated entry.
    pub fn xhr(name: impl Into<String>) -> Self {
        Self::new(name, InitiatorType::XmlHttpRequest)
    }

    /// Whether this entry was initiated by an asynchronous XHR-style request.
    /// Only such entries participate in idle-watching.
    pub fn is_async_request(&self) -> bool {
        matches!(self.initiator, InitiatorType::XmlHttpRequest)
    }
}

/// A caller-supplied pattern that must be observed among the loaded resources
/// before network idleness is even considered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceExpectation {
    /// Substring matched against resource entry names. Several distinct real
    /// resources can satisfy one expectation.
    pub name: String,
    /// Minimum number of matching entries. `None` means one match suffices;
    /// `Some(0)` is treated the same way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<usize>,
}

impl ResourceExpectation {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), number: None }
    }

    pub fn at_least(name: impl Into<String>, number: usize) -> Self {
        Self { name: name.into(), number: Some(number) }
    }

    /// Effective minimum count of matching entries.
    pub fn min_matches(&self) -> usize {
        match self.number {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }

    /// Whether enough entries in `snapshot` contain this expectation's name.
    pub fn is_met(&self, snapshot: &[ResourceEntry]) -> bool {
        let found = snapshot.iter().filter(|e| e.name.contains(&self.name)).count();
        found >= self.min_matches()
    }
}

/// Error categories for programmatic handling across the workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A deadline elapsed before the awaited condition was reached.
    Timeout,
    /// The caller aborted the operation through a cancellation token.
    Cancelled,
    /// Element not found, not visible, or otherwise not actionable.
    ElementNotFound,
    /// JavaScript evaluation errors.
    ScriptExecution,
    /// Navigation or page load errors.
    Navigation,
    /// Browser/driver errors.
    Browser,
    /// Network-level errors (connection failures, bad responses).
    Network,
    /// Accessibility audit reported violations.
    Accessibility,
    /// Backend test-hook request failed.
    Hook,
    /// Unknown or uncategorized errors.
    Unknown,
}

/// Structured error with context for debugging failed scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationError {
    /// Error category for programmatic handling.
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Optional context (selector, unmet expectations, endpoint, ...).
    pub context: serde_json::Value,
}

impl AutomationError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            context: serde_json::json!({}),
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    // Convenience constructors

    pub fn timeout_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Cancelled, message)
    }

    pub fn element_not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCategory::ElementNotFound, message.clone())
            .with_context(serde_json::json!({ "detail": message }))
    }

    pub fn script_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ScriptExecution, message)
    }

    pub fn navigation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Navigation, message)
    }

    pub fn browser_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Browser, message)
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    pub fn accessibility(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Accessibility, message)
    }

    pub fn hook_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Hook, message)
    }

    pub fn is_timeout(&self) -> bool {
        self.category == ErrorCategory::Timeout
    }
}

impl std::fmt::Display for AutomationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.category, self.message)
    }
}

impl std::error::Error for AutomationError {}

/// Read access to the page's resource timing records.
///
/// The production implementation reads the browser's performance timeline;
/// tests script the snapshots. Implementations return every observed entry;
/// filtering to asynchronous requests is the watcher's job.
#[async_trait]
pub trait ResourceTimeline: Send + Sync {
    /// A point-in-time list of completed network fetches.
    async fn resources(&self) -> Result<Vec<ResourceEntry>, AutomationError>;
}

/// Generic browser-interaction capability.
///
/// Page components hold an implementation of this trait instead of inheriting
/// from a concrete driver; the chromiumoxide-backed page handle is the
/// production implementation. Wait methods use the implementation's configured
/// timeouts.
#[async_trait]
pub trait PageActions: Send + Sync {
    /// Click the first element matching `selector` once it is actionable.
    async fn click(&self, selector: &str) -> Result<(), AutomationError>;

    /// Click the parent element of the first match. Used for skinned inputs
    /// whose native control is hidden.
    async fn click_parent(&self, selector: &str) -> Result<(), AutomationError>;

    /// Force-click the first element matching `selector` whose text contains
    /// `text`, without an actionability gate.
    async fn click_containing(&self, selector: &str, text: &str) -> Result<(), AutomationError>;

    /// Type into the first match, optionally clearing the field first.
    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        clear_first: bool,
    ) -> Result<(), AutomationError>;

    /// CSS classes of the first match.
    async fn class_list(&self, selector: &str) -> Result<Vec<String>, AutomationError>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, AutomationError>;

    /// Whether at least one match exists and is visible.
    async fn is_visible(&self, selector: &str) -> Result<bool, AutomationError>;

    /// Trimmed text content of the first match.
    async fn text_of(&self, selector: &str) -> Result<String, AutomationError>;

    /// Wait until at least one match is visible.
    async fn wait_visible(&self, selector: &str) -> Result<(), AutomationError>;

    /// Wait until no match is visible (absent counts as hidden).
    async fn wait_hidden(&self, selector: &str) -> Result<(), AutomationError>;

    /// Wait until a match containing `text` is visible.
    async fn wait_visible_containing(
        &self,
        selector: &str,
        text: &str,
    ) -> Result<(), AutomationError>;

    /// Attach a file to the first matching input, as if picked by the user.
    async fn upload(
        &self,
        selector: &str,
        file_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<(), AutomationError>;
}
