use quiesce_core::AutomationError;

/// Map a raw browser error onto the error taxonomy by message inspection.
/// `action` names the operation for the final message.
pub fn classify(err: impl std::fmt::Display, action: &str) -> AutomationError {
    let text = err.to_string();
    if text.contains("timeout") || text.contains("Timeout") {
        AutomationError::timeout_error(format!("{action} timed out: {text}"))
    } else if text.contains("navigation") || text.contains("Navigation") || text.contains("net::") {
        AutomationError::navigation_error(format!("{action} failed: {text}"))
    } else if text.contains("not found") || text.contains("No node") {
        AutomationError::element_not_found(format!("{action}: {text}"))
    } else {
        AutomationError::browser_error(format!("{action} failed: {text}"))
    }
}

/// True when an evaluation failed because the page's script context went
/// away mid-navigation. Waits retry on this instead of surfacing it.
pub fn is_context_loss(err: &impl std::fmt::Display) -> bool {
    let text = err.to_string();
    text.contains("Cannot find context") || text.contains("Execution context was destroyed")
}
