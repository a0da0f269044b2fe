//! Composition-based page components: named locators plus synchronized
//! interactions with skinned form widgets.

pub mod component;
pub mod locators;

pub use component::{Component, ToggleKind, WidgetChrome};
pub use locators::{Locator, LocatorTable};
