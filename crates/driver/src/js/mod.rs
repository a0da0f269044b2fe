pub mod a11y;
pub mod element;
pub mod input;
pub mod resource;

use serde_json::Value;

/// Wrap a snippet in an immediately-invoked call with JSON-encoded arguments.
pub fn build_js_call(func: &str, args: &[Value]) -> String {
    let args_str = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("({})({})", func, args_str)
}
