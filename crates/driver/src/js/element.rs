/// Report whether an element exists, is visible, is covered by another
/// element, and is disabled. Drives the actionability wait.
pub const CHECK_ELEMENT_STATE: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    if (!el) {
        return { exists: false, visible: false, obscured: false, disabled: false };
    }
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = rect.width > 0 && rect.height > 0 &&
        style.visibility !== 'hidden' &&
        style.display !== 'none' &&
        parseFloat(style.opacity) > 0;
    let obscured = false;
    let obscuredBy = null;
    if (visible) {
        const cx = rect.left + rect.width / 2;
        const cy = rect.top + rect.height / 2;
        const top = document.elementFromPoint(cx, cy);
        if (top && top !== el && !el.contains(top) && !top.contains(el)) {
            obscured = true;
            obscuredBy = top.tagName.toLowerCase() +
                (top.className && typeof top.className === 'string'
                    ? '.' + top.className.split(' ').join('.') : '');
        }
    }
    const disabled = el.disabled === true || el.getAttribute('aria-disabled') === 'true';
    return { exists: true, visible, obscured, obscuredBy, disabled };
}
"#;

/// Visibility of the first match only.
pub const VISIBILITY: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    if (!el) return { exists: false, visible: false };
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = rect.width > 0 && rect.height > 0 &&
        style.visibility !== 'hidden' &&
        style.display !== 'none';
    return { exists: true, visible };
}
"#;

/// Whether any match containing the given text is visible.
pub const VISIBLE_CONTAINING: &str = r#"
(selector, text) => {
    const els = Array.from(document.querySelectorAll(selector));
    const found = els.some(el => {
        if (!el.textContent.includes(text)) return false;
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 &&
            style.visibility !== 'hidden' &&
            style.display !== 'none';
    });
    return { found };
}
"#;

/// Click with a scroll-into-view first, so the click lands inside the
/// viewport.
pub const SAFE_CLICK: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    if (!el) return { success: false, error: 'Element not found' };
    el.scrollIntoView({ block: 'center', inline: 'center' });
    el.click();
    return { success: true };
}
"#;

/// Click the parent of the matched element. Styled form controls keep the
/// native input invisible and put the interactive skin on the parent.
pub const CLICK_PARENT: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    if (!el) return { success: false, error: 'Element not found' };
    const target = el.parentElement || el;
    target.click();
    return { success: true };
}
"#;

/// Click the first match whose text contains the given string, regardless
/// of visibility. Dropdown options sit in panels that report as hidden
/// while animating.
pub const CLICK_CONTAINING: &str = r#"
(selector, text) => {
    const els = Array.from(document.querySelectorAll(selector));
    const el = els.find(e => e.textContent.includes(text));
    if (!el) return { success: false, error: 'No match containing text' };
    el.scrollIntoView({ block: 'center', inline: 'center' });
    el.click();
    return { success: true };
}
"#;

/// Set an input's value through the native setter and fire the events
/// framework bindings listen for.
pub const TYPE_TEXT: &str = r#"
(selector, text, clearFirst) => {
    const el = document.querySelector(selector);
    if (!el) return { success: false, error: 'Element not found' };
    el.focus();
    const proto = el instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    const next = clearFirst ? text : (el.value || '') + text;
    setter.call(el, next);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return { success: true };
}
"#;

/// Class names on the first match, or null when absent.
pub const CLASS_LIST: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    if (!el) return null;
    return Array.from(el.classList);
}
"#;

pub const COUNT_MATCHES: &str = r#"
(selector) => document.querySelectorAll(selector).length
"#;

pub const TEXT_CONTENT: &str = r#"
(selector) => {
    const el = document.querySelector(selector);
    return el ? el.textContent.trim() : null;
}
"#;
