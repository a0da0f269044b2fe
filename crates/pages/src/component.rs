use std::sync::Arc;

use quiesce_core::{AutomationError, PageActions};
use tracing::debug;

use crate::locators::LocatorTable;

/// Which kind of skinned toggle a selector points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Checkbox,
    Radio,
}

/// Selectors for the widget machinery page components interact with:
/// dropdown panels, skinned toggles, loading indicators, upload inputs.
/// Defaults cover select2-style widgets; apps with different markup
/// override the fields they need.
#[derive(Debug, Clone)]
pub struct WidgetChrome {
    /// One option row inside an open dropdown.
    pub result_option: String,
    /// The dropdown's results panel.
    pub results_panel: String,
    /// A result row inside the panel, indexable with `:nth-child`.
    pub result_row: String,
    /// The search box inside an open dropdown.
    pub search_input: String,
    /// The label showing a dropdown's current selection.
    pub chosen_label: String,
    /// Spinner shown while a dropdown loads its options.
    pub loading_indicator: String,
    pub checkbox_skin: String,
    /// Class present on the skin while the checkbox is engaged.
    pub checkbox_checked: String,
    pub radio_skin: String,
    pub radio_checked: String,
    pub checkbox_input: String,
    pub radio_input: String,
    pub upload_input: String,
}

impl Default for WidgetChrome {
    fn default() -> Self {
        Self {
            result_option: ".select2-result-label".into(),
            results_panel: ".select2-drop".into(),
            result_row: ".select2-results li".into(),
            search_input: ".select2-drop-active .select2-input".into(),
            chosen_label: ".select2-chosen".into(),
            loading_indicator: "[data-testid='loading-indicator']".into(),
            checkbox_skin: ".option-input-skinned".into(),
            checkbox_checked: "option-input-checked".into(),
            radio_skin: ".radio-input-skinned".into(),
            radio_checked: "radio-input-checked".into(),
            checkbox_input: "input[type='checkbox']".into(),
            radio_input: "input[type='radio']".into(),
            upload_input: "input[type='file']".into(),
        }
    }
}

impl WidgetChrome {
    pub fn skin(&self, kind: ToggleKind) -> &str {
        match kind {
            ToggleKind::Checkbox => &self.checkbox_skin,
            ToggleKind::Radio => &self.radio_skin,
        }
    }

    pub fn checked_class(&self, kind: ToggleKind) -> &str {
        match kind {
            ToggleKind::Checkbox => &self.checkbox_checked,
            ToggleKind::Radio => &self.radio_checked,
        }
    }

    pub fn native_input(&self, kind: ToggleKind) -> &str {
        match kind {
            ToggleKind::Checkbox => &self.checkbox_input,
            ToggleKind::Radio => &self.radio_input,
        }
    }
}

/// A page region described by named locators, driven through any
/// [`PageActions`] implementation.
///
/// Components hold their driver instead of inheriting from one, so the same
/// component definition runs against the real browser or a scripted fake.
pub struct Component<D: PageActions + ?Sized> {
    locators: Arc<LocatorTable>,
    chrome: WidgetChrome,
    driver: Arc<D>,
}

impl<D: PageActions + ?Sized> Component<D> {
    pub fn new(locators: Arc<LocatorTable>, driver: Arc<D>) -> Self {
        Self {
            locators,
            chrome: WidgetChrome::default(),
            driver,
        }
    }

    pub fn with_chrome(mut self, chrome: WidgetChrome) -> Self {
        self.chrome = chrome;
        self
    }

    fn resolve(&self, name: &str) -> Result<String, AutomationError> {
        self.locators
            .get(name)
            .map(|locator| locator.selector())
            .ok_or_else(|| {
                AutomationError::element_not_found(format!("No locator registered as '{name}'"))
            })
    }

    /// Click the named element once it is actionable.
    pub async fn click(&self, name: &str) -> Result<(), AutomationError> {
        let selector = self.resolve(name)?;
        self.driver.click(&selector).await
    }

    /// Type into the named element.
    pub async fn type_text(
        &self,
        name: &str,
        text: &str,
        clear_first: bool,
    ) -> Result<(), AutomationError> {
        let selector = self.resolve(name)?;
        self.driver.type_text(&selector, text, clear_first).await
    }

    pub async fn is_visible(&self, name: &str) -> Result<bool, AutomationError> {
        let selector = self.resolve(name)?;
        self.driver.is_visible(&selector).await
    }

    /// Put a skinned toggle into the requested state.
    ///
    /// Reads the checked state from the skin element's classes and clicks
    /// the hidden native input's parent only when the state differs, so
    /// repeating the call never flips the toggle back. A radio cannot be
    /// disengaged directly; that happens by engaging another one.
    pub async fn set_toggle(
        &self,
        name: &str,
        kind: ToggleKind,
        engaged: bool,
    ) -> Result<(), AutomationError> {
        let base = self.resolve(name)?;
        let skin = format!("{base} {}", self.chrome.skin(kind));
        let classes = self.driver.class_list(&skin).await?;
        let engaged_now = classes
            .iter()
            .any(|class| class == self.chrome.checked_class(kind));
        if engaged_now == engaged {
            debug!(name, engaged, "toggle already in requested state");
            return Ok(());
        }
        let input = format!("{base} {}", self.chrome.native_input(kind));
        self.driver.click_parent(&input).await
    }

    /// Select `option_text` from the named dropdown widget.
    ///
    /// Opens the widget, waits for the option to be offered, lets any
    /// loading indicator clear, then picks the option and waits for the
    /// results panel to close.
    pub async fn select_from_dropdown(
        &self,
        name: &str,
        option_text: &str,
    ) -> Result<(), AutomationError> {
        let base = self.resolve(name)?;
        debug!(name, option = option_text, "selecting from dropdown");
        self.driver.click(&base).await?;
        self.driver
            .wait_visible_containing(&self.chrome.result_option, option_text)
            .await?;
        self.driver.wait_hidden(&self.chrome.loading_indicator).await?;
        self.driver
            .click_containing(&self.chrome.result_option, option_text)
            .await?;
        self.driver.wait_hidden(&self.chrome.results_panel).await
    }

    /// Like [`Component::select_from_dropdown`], but narrows the options by
    /// typing `query` into the widget's search box first.
    pub async fn select_from_dropdown_with_search(
        &self,
        name: &str,
        query: &str,
        option_text: &str,
    ) -> Result<(), AutomationError> {
        let base = self.resolve(name)?;
        debug!(name, query, option = option_text, "searching dropdown");
        self.driver.click(&base).await?;
        self.driver
            .type_text(&self.chrome.search_input, query, true)
            .await?;
        self.driver
            .wait_visible_containing(&self.chrome.result_option, option_text)
            .await?;
        self.driver.wait_hidden(&self.chrome.loading_indicator).await?;
        self.driver
            .click_containing(&self.chrome.result_option, option_text)
            .await?;
        self.driver.wait_hidden(&self.chrome.results_panel).await
    }

    /// The label currently shown on the named dropdown widget.
    pub async fn selected_option(&self, name: &str) -> Result<String, AutomationError> {
        let base = self.resolve(name)?;
        self.driver
            .text_of(&format!("{base} {}", self.chrome.chosen_label))
            .await
    }

    /// Texts of every option the named dropdown currently offers.
    ///
    /// Opens the widget to read the rows, then clicks it again to close.
    pub async fn dropdown_options(&self, name: &str) -> Result<Vec<String>, AutomationError> {
        let base = self.resolve(name)?;
        self.driver.click(&base).await?;
        self.driver.wait_visible(&self.chrome.results_panel).await?;
        self.driver.wait_hidden(&self.chrome.loading_indicator).await?;

        // Count the same rows the loop indexes; labels can outnumber rows
        // when the panel groups its results.
        let offered = self.driver.count(&self.chrome.result_row).await?;
        let mut options = Vec::with_capacity(offered);
        for index in 1..=offered {
            let row = format!(
                "{}:nth-child({index}) {}",
                self.chrome.result_row, self.chrome.result_option
            );
            options.push(self.driver.text_of(&row).await?);
        }

        self.driver.click(&base).await?;
        self.driver.wait_hidden(&self.chrome.results_panel).await?;
        Ok(options)
    }

    /// Hand a file to the upload input inside the named element, or to the
    /// page's default upload input when no name is given.
    pub async fn upload(
        &self,
        name: Option<&str>,
        file_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<(), AutomationError> {
        let selector = match name {
            Some(n) => format!("{} {}", self.resolve(n)?, self.chrome.upload_input),
            None => self.chrome.upload_input.clone(),
        };
        self.driver.upload(&selector, file_name, mime, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locators::Locator;
    use async_trait::async_trait;
    use quiesce_core::ErrorCategory;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every driver call and serves scripted read results.
    #[derive(Default)]
    struct RecordingDriver {
        calls: Mutex<Vec<String>>,
        class_lists: Mutex<VecDeque<Vec<String>>>,
        texts: Mutex<VecDeque<String>>,
        counts: Mutex<VecDeque<usize>>,
    }

    impl RecordingDriver {
        fn with_class_list(classes: &[&str]) -> Self {
            let driver = Self::default();
            driver
                .class_lists
                .lock()
                .unwrap()
                .push_back(classes.iter().map(|s| s.to_string()).collect());
            driver
        }

        fn with_text(text: &str) -> Self {
            let driver = Self::default();
            driver.texts.lock().unwrap().push_back(text.to_string());
            driver
        }

        fn with_options(options: &[&str]) -> Self {
            let driver = Self::default();
            driver.counts.lock().unwrap().push_back(options.len());
            {
                let mut texts = driver.texts.lock().unwrap();
                for option in options {
                    texts.push_back(option.to_string());
                }
            }
            driver
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl PageActions for RecordingDriver {
        async fn click(&self, selector: &str) -> Result<(), AutomationError> {
            self.record(format!("click {selector}"));
            Ok(())
        }

        async fn click_parent(&self, selector: &str) -> Result<(), AutomationError> {
            self.record(format!("click_parent {selector}"));
            Ok(())
        }

        async fn click_containing(
            &self,
            selector: &str,
            text: &str,
        ) -> Result<(), AutomationError> {
            self.record(format!("click_containing {selector} :: {text}"));
            Ok(())
        }

        async fn type_text(
            &self,
            selector: &str,
            text: &str,
            clear_first: bool,
        ) -> Result<(), AutomationError> {
            self.record(format!("type {selector} :: {text} clear={clear_first}"));
            Ok(())
        }

        async fn class_list(&self, selector: &str) -> Result<Vec<String>, AutomationError> {
            self.record(format!("class_list {selector}"));
            Ok(self
                .class_lists
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }

        async fn count(&self, selector: &str) -> Result<usize, AutomationError> {
            self.record(format!("count {selector}"));
            Ok(self.counts.lock().unwrap().pop_front().unwrap_or(0))
        }

        async fn is_visible(&self, selector: &str) -> Result<bool, AutomationError> {
            self.record(format!("is_visible {selector}"));
            Ok(true)
        }

        async fn text_of(&self, selector: &str) -> Result<String, AutomationError> {
            self.record(format!("text_of {selector}"));
            Ok(self.texts.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn wait_visible(&self, selector: &str) -> Result<(), AutomationError> {
            self.record(format!("wait_visible {selector}"));
            Ok(())
        }

        async fn wait_hidden(&self, selector: &str) -> Result<(), AutomationError> {
            self.record(format!("wait_hidden {selector}"));
            Ok(())
        }

        async fn wait_visible_containing(
            &self,
            selector: &str,
            text: &str,
        ) -> Result<(), AutomationError> {
            self.record(format!("wait_visible_containing {selector} :: {text}"));
            Ok(())
        }

        async fn upload(
            &self,
            selector: &str,
            file_name: &str,
            mime: &str,
            bytes: &[u8],
        ) -> Result<(), AutomationError> {
            self.record(format!(
                "upload {selector} :: {file_name} {mime} {} bytes",
                bytes.len()
            ));
            Ok(())
        }
    }

    fn component(driver: RecordingDriver) -> (Component<RecordingDriver>, Arc<RecordingDriver>) {
        let mut table = LocatorTable::new();
        table.insert("status", Locator::test_id("status-filter"));
        table.insert("express", Locator::css("#express-shipping"));
        let driver = Arc::new(driver);
        (Component::new(Arc::new(table), driver.clone()), driver)
    }

    #[tokio::test]
    async fn toggle_engages_when_not_yet_checked() {
        let (component, driver) =
            component(RecordingDriver::with_class_list(&["option-input-skinned"]));

        component
            .set_toggle("express", ToggleKind::Checkbox, true)
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            [
                "class_list #express-shipping .option-input-skinned",
                "click_parent #express-shipping input[type='checkbox']",
            ]
        );
    }

    #[tokio::test]
    async fn toggle_is_idempotent_when_state_matches() {
        let (component, driver) = component(RecordingDriver::with_class_list(&[
            "option-input-skinned",
            "option-input-checked",
        ]));

        component
            .set_toggle("express", ToggleKind::Checkbox, true)
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            ["class_list #express-shipping .option-input-skinned"]
        );
    }

    #[tokio::test]
    async fn toggle_disengages_a_checked_checkbox() {
        let (component, driver) = component(RecordingDriver::with_class_list(&[
            "option-input-skinned",
            "option-input-checked",
        ]));

        component
            .set_toggle("express", ToggleKind::Checkbox, false)
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            [
                "class_list #express-shipping .option-input-skinned",
                "click_parent #express-shipping input[type='checkbox']",
            ]
        );
    }

    #[tokio::test]
    async fn radio_uses_its_own_chrome() {
        let (component, driver) =
            component(RecordingDriver::with_class_list(&["radio-input-skinned"]));

        component
            .set_toggle("express", ToggleKind::Radio, true)
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            [
                "class_list #express-shipping .radio-input-skinned",
                "click_parent #express-shipping input[type='radio']",
            ]
        );
    }

    #[tokio::test]
    async fn dropdown_selection_runs_the_guard_sequence() {
        let (component, driver) = component(RecordingDriver::default());

        component
            .select_from_dropdown("status", "Shipped")
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            [
                "click [data-testid='status-filter']",
                "wait_visible_containing .select2-result-label :: Shipped",
                "wait_hidden [data-testid='loading-indicator']",
                "click_containing .select2-result-label :: Shipped",
                "wait_hidden .select2-drop",
            ]
        );
    }

    #[tokio::test]
    async fn search_variant_types_before_picking() {
        let (component, driver) = component(RecordingDriver::default());

        component
            .select_from_dropdown_with_search("status", "ship", "Shipped")
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            [
                "click [data-testid='status-filter']",
                "type .select2-drop-active .select2-input :: ship clear=true",
                "wait_visible_containing .select2-result-label :: Shipped",
                "wait_hidden [data-testid='loading-indicator']",
                "click_containing .select2-result-label :: Shipped",
                "wait_hidden .select2-drop",
            ]
        );
    }

    #[tokio::test]
    async fn selected_option_reads_the_chosen_label() {
        let (component, driver) = component(RecordingDriver::with_text("Shipped"));

        let selected = component.selected_option("status").await.unwrap();

        assert_eq!(selected, "Shipped");
        assert_eq!(
            driver.calls(),
            ["text_of [data-testid='status-filter'] .select2-chosen"]
        );
    }

    #[tokio::test]
    async fn dropdown_options_reads_each_offered_row() {
        let (component, driver) =
            component(RecordingDriver::with_options(&["Pending", "Shipped"]));

        let options = component.dropdown_options("status").await.unwrap();

        assert_eq!(options, ["Pending", "Shipped"]);
        assert_eq!(
            driver.calls(),
            [
                "click [data-testid='status-filter']",
                "wait_visible .select2-drop",
                "wait_hidden [data-testid='loading-indicator']",
                "count .select2-results li",
                "text_of .select2-results li:nth-child(1) .select2-result-label",
                "text_of .select2-results li:nth-child(2) .select2-result-label",
                "click [data-testid='status-filter']",
                "wait_hidden .select2-drop",
            ]
        );
    }

    #[tokio::test]
    async fn dropdown_options_counts_the_rows_it_indexes() {
        let driver = Arc::new(RecordingDriver::with_options(&["Pending"]));
        let mut table = LocatorTable::new();
        table.insert("status", Locator::test_id("status-filter"));
        let chrome = WidgetChrome {
            result_row: ".select2-results .select2-result".into(),
            ..WidgetChrome::default()
        };
        let component = Component::new(Arc::new(table), driver.clone()).with_chrome(chrome);

        let options = component.dropdown_options("status").await.unwrap();

        assert_eq!(options, ["Pending"]);
        assert_eq!(
            driver.calls(),
            [
                "click [data-testid='status-filter']",
                "wait_visible .select2-drop",
                "wait_hidden [data-testid='loading-indicator']",
                "count .select2-results .select2-result",
                "text_of .select2-results .select2-result:nth-child(1) .select2-result-label",
                "click [data-testid='status-filter']",
                "wait_hidden .select2-drop",
            ]
        );
    }

    #[tokio::test]
    async fn upload_scopes_to_the_named_element() {
        let (component, driver) = component(RecordingDriver::default());

        component
            .upload(Some("status"), "avatar.png", "image/png", b"123")
            .await
            .unwrap();
        component
            .upload(None, "doc.pdf", "application/pdf", b"4567")
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            [
                "upload [data-testid='status-filter'] input[type='file'] :: avatar.png image/png 3 bytes",
                "upload input[type='file'] :: doc.pdf application/pdf 4 bytes",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_locator_name_is_an_error() {
        let (component, driver) = component(RecordingDriver::default());

        let err = component
            .select_from_dropdown("missing", "Shipped")
            .await
            .unwrap_err();

        assert_eq!(err.category, ErrorCategory::ElementNotFound);
        assert!(driver.calls().is_empty());
    }
}
