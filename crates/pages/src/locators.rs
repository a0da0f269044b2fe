use std::collections::HashMap;
use std::fmt;

/// How a page element is addressed. Test ids are preferred; raw CSS covers
/// markup that carries none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    TestId(String),
    Css(String),
}

impl Locator {
    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn selector(&self) -> String {
        match self {
            Locator::TestId(id) => format!("[data-testid='{id}']"),
            Locator::Css(css) => css.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector())
    }
}

/// Named locators for one page or component.
#[derive(Debug, Default)]
pub struct LocatorTable {
    entries: HashMap<String, Locator>,
}

impl LocatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, locator: Locator) {
        self.entries.insert(name.into(), locator);
    }

    pub fn get(&self, name: &str) -> Option<&Locator> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
