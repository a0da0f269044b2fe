/// In-page audit for common accessibility failures. Returns axe-style
/// violation records without injecting an external engine.
pub const AUDIT_PAGE: &str = r#"
() => {
    const violations = [];
    const visible = (el) => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 &&
            style.visibility !== 'hidden' && style.display !== 'none';
    };
    const push = (id, impact, description, nodes) => {
        if (nodes.length > 0) {
            violations.push({ id, impact, description, nodes: nodes.length });
        }
    };

    push('image-alt', 'critical', 'Images must have alternate text',
        Array.from(document.querySelectorAll('img:not([alt])')).filter(visible));

    push('button-name', 'critical', 'Buttons must have discernible text',
        Array.from(document.querySelectorAll('button')).filter(b =>
            visible(b) && !b.textContent.trim() &&
            !b.getAttribute('aria-label') && !b.getAttribute('aria-labelledby') &&
            !b.getAttribute('title')));

    push('link-name', 'serious', 'Links must have discernible text',
        Array.from(document.querySelectorAll('a[href]')).filter(a =>
            visible(a) && !a.textContent.trim() &&
            !a.getAttribute('aria-label') && !a.querySelector('img[alt]')));

    push('label', 'critical', 'Form elements must have labels',
        Array.from(document.querySelectorAll(
            'input:not([type=hidden]):not([type=button]):not([type=submit]), select, textarea'
        )).filter(el => {
            if (!visible(el)) return false;
            if (el.getAttribute('aria-label') || el.getAttribute('aria-labelledby') ||
                el.getAttribute('title')) return false;
            if (el.id && document.querySelector('label[for="' + el.id + '"]')) return false;
            return !el.closest('label');
        }));

    push('html-has-lang', 'serious', 'The html element must have a lang attribute',
        document.documentElement.hasAttribute('lang') ? [] : [document.documentElement]);

    const ids = Array.from(document.querySelectorAll('[id]')).map(el => el.id);
    const dupes = ids.filter((id, i) => ids.indexOf(id) !== i);
    push('duplicate-id', 'moderate', 'Element ids must be unique',
        Array.from(new Set(dupes)));

    return violations;
}
"#;
