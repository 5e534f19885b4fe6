//! In-page scripts. Each runs as a self-contained expression and returns a
//! JSON-serializable value; all shadow-root traversal on the browser side
//! lives here, mirrored by the depth guard in [`crate::dom`].

/// True once at least one timeline marker is present anywhere in the
/// document, shadow roots included.
pub const INDICATOR_JS: &str = r#"
(() => {
    const MAX_DEPTH = 64;
    const SELECTOR = '.slds-timeline__item, .dueDate, .slds-timeline__date, .email-message-date';
    function probe(root, depth) {
        if (depth > MAX_DEPTH) return false;
        if (root.querySelector(SELECTOR)) return true;
        for (const el of root.querySelectorAll('*')) {
            if (el.shadowRoot && probe(el.shadowRoot, depth + 1)) return true;
        }
        return false;
    }
    return probe(document, 0);
})()
"#;

/// Serialize the element tree, piercing shadow roots. Shadow children are
/// appended after light children so index paths line up with PRESS_JS.
pub const SNAPSHOT_JS: &str = r#"
(() => {
    const MAX_DEPTH = 64;
    function ownText(el) {
        let text = '';
        for (const n of el.childNodes) {
            if (n.nodeType === Node.TEXT_NODE) text += n.textContent;
        }
        return text.trim();
    }
    function snap(el, depth) {
        const rect = el.getBoundingClientRect();
        const node = {
            tag: el.tagName.toLowerCase(),
            text: ownText(el),
            classes: Array.from(el.classList),
            pressed: el.getAttribute('aria-pressed'),
            y: rect.top + window.scrollY,
            visible: rect.width > 0 && rect.height > 0,
            children: [],
        };
        if (depth >= MAX_DEPTH) return node;
        for (const child of el.children) node.children.push(snap(child, depth + 1));
        if (el.shadowRoot) {
            for (const child of el.shadowRoot.children) node.children.push(snap(child, depth + 1));
        }
        return node;
    }
    return snap(document.body, 0);
})()
"#;

/// Scroll to the end of the document so lazily-rendered sections mount.
pub const SCROLL_JS: &str = r#"
(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()
"#;

const PRESS_JS_TEMPLATE: &str = r#"
(() => {
    const path = __PATH__;
    let el = document.body;
    for (const idx of path) {
        const kids = Array.from(el.children);
        if (el.shadowRoot) kids.push(...el.shadowRoot.children);
        if (idx >= kids.length) return false;
        el = kids[idx];
    }
    try { el.scrollIntoView({ block: 'center' }); } catch (e) {}
    const opts = { bubbles: true, cancelable: true, view: window };
    el.dispatchEvent(new MouseEvent('mousedown', opts));
    el.dispatchEvent(new MouseEvent('mouseup', opts));
    el.dispatchEvent(new MouseEvent('click', opts));
    if (typeof el.click === 'function') el.click();
    return true;
})()
"#;

/// Synthesize a full press sequence on the element at `path` (child indices,
/// shadow children appended after light children). Resolves to `false` when
/// the path no longer exists in the live document.
pub fn press_script(path: &[usize]) -> String {
    let indices = path
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",");
    PRESS_JS_TEMPLATE.replace("__PATH__", &format!("[{indices}]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_script_inlines_the_path() {
        let script = press_script(&[0, 3, 12]);
        assert!(script.contains("const path = [0,3,12];"));
        assert!(!script.contains("__PATH__"));
    }

    #[test]
    fn press_script_handles_root_path() {
        let script = press_script(&[]);
        assert!(script.contains("const path = [];"));
    }
}
