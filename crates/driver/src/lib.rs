//! Chromium-backed driver: browser sessions, element waits, and the
//! resource idle watcher.

pub mod a11y;
pub mod actions;
pub mod config;
pub mod errors;
pub mod idle;
pub mod js;
pub mod session;
pub mod wait;

pub use a11y::Violation;
pub use actions::PageHandle;
pub use config::{IdleConfig, SessionConfig, WaitConfig};
pub use idle::ResourceIdleWatcher;
pub use session::Session;
pub use wait::ElementWait;
