//! DOM snapshot — one evaluated script gathers everything the classifier and
//! solver need for a tick.
//!
//! The host app marks its widgets with stable `data-test` attributes; those
//! attributes are the de facto contract this script depends on. Everything is
//! returned as one JSON document so a tick sees a consistent view of the page.

use crate::inspect::InternalRecord;
use serde::Deserialize;

/// A clickable element located by the snapshot: its selector plus whether the
/// host currently allows interacting with it.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementRef {
    pub selector: String,
    #[serde(default)]
    pub enabled: bool,
}

impl ElementRef {
    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// One discrete answer choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceInfo {
    pub selector: String,
    /// The data-test attribute flags this choice as the correct one.
    #[serde(default)]
    pub marked_correct: bool,
    #[serde(default)]
    pub aria_label: Option<String>,
    /// Dump of the framework-internal record chain attached to the element.
    #[serde(default)]
    pub record: Option<InternalRecord>,
}

/// One clickable token (word-bank word or pairing tile).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub selector: String,
    /// Explicit order marker when the host exposes one.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Everything observed on the page in one tick. Purely derived from the
/// current DOM; recomputed every tick, never cached.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageSnapshot {
    /// Current location pathname.
    #[serde(default)]
    pub path: String,

    /// The in-challenge check/next control.
    #[serde(default)]
    pub advance: Option<ElementRef>,

    /// Session-complete slide is showing.
    #[serde(default)]
    pub session_complete: bool,

    /// The between-lessons continue control.
    #[serde(default)]
    pub continue_button: Option<ElementRef>,

    #[serde(default)]
    pub choices: Vec<ChoiceInfo>,

    #[serde(default)]
    pub translate_choices: Vec<ChoiceInfo>,

    #[serde(default)]
    pub word_tokens: Vec<TokenInfo>,

    #[serde(default)]
    pub pair_tokens: Vec<TokenInfo>,

    /// A free-text answer field is showing.
    #[serde(default)]
    pub text_input: bool,

    /// A listening/speaking prompt is showing.
    #[serde(default)]
    pub audio_prompt: bool,

    #[serde(default)]
    pub skip: Option<ElementRef>,

    /// Idle-page entry points.
    #[serde(default)]
    pub practice: Option<ElementRef>,

    #[serde(default)]
    pub lesson_links: Vec<ElementRef>,

    #[serde(default)]
    pub start_button: Option<ElementRef>,
}

impl PageSnapshot {
    /// The advance control exists and is currently clickable.
    pub fn advance_ready(&self) -> bool {
        self.advance.as_ref().is_some_and(ElementRef::enabled)
    }

    /// Any challenge widget is present on the page.
    pub fn has_challenge_widgets(&self) -> bool {
        !self.choices.is_empty()
            || !self.translate_choices.is_empty()
            || !self.word_tokens.is_empty()
            || !self.pair_tokens.is_empty()
            || self.text_input
            || self.audio_prompt
    }
}

/// JavaScript that snapshots the page in one pass.
const SNAPSHOT_JS: &str = r#"
(() => {
    const PREFIXES = (typeof __duofarm_key_prefixes !== 'undefined')
        ? __duofarm_key_prefixes
        : ['__reactFiber$'];
    const MAX_HOPS = 3;

    // Build a unique selector: id, then unique data-test, then a structural path
    function cssPath(el) {
        if (el.id) return '#' + CSS.escape(el.id);
        const dt = el.getAttribute('data-test');
        if (dt) {
            const sel = '[data-test=' + JSON.stringify(dt) + ']';
            if (document.querySelectorAll(sel).length === 1) return sel;
        }
        const parts = [];
        let node = el;
        while (node && node !== document.body && parts.length < 6) {
            let s = node.tagName.toLowerCase();
            if (node.id) {
                parts.unshift('#' + CSS.escape(node.id));
                break;
            }
            const parent = node.parentElement;
            if (parent) {
                const siblings = Array.from(parent.children).filter(c => c.tagName === node.tagName);
                if (siblings.length > 1) {
                    s += ':nth-of-type(' + (siblings.indexOf(node) + 1) + ')';
                }
            }
            parts.unshift(s);
            node = parent;
        }
        return parts.join(' > ');
    }

    function ref(el) {
        if (!el) return null;
        return {
            selector: cssPath(el),
            enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
        };
    }

    // Keep only JSON-safe scalar fields; full props graphs are cyclic
    function pickProps(p) {
        if (!p || typeof p !== 'object') return null;
        const out = {};
        for (const k of ['correct', 'isCorrect', 'selected', 'disabled', 'index']) {
            const v = p[k];
            if (typeof v === 'boolean' || typeof v === 'number' || typeof v === 'string') out[k] = v;
        }
        return Object.keys(out).length ? out : null;
    }

    // Dump the internal record found on the element plus a bounded owner chain
    function internalRecord(el) {
        const key = Object.keys(el).find(k => PREFIXES.some(p => k.startsWith(p)));
        if (!key) return null;
        let fiber = el[key];
        const nodes = [];
        for (let i = 0; fiber && i <= MAX_HOPS; i++) {
            const raw = key.startsWith('__reactProps$')
                ? fiber
                : (fiber.memoizedProps || fiber.pendingProps);
            nodes.push({ key: key, props: pickProps(raw), owner: null });
            fiber = fiber.return || fiber._debugOwner;
        }
        for (let i = nodes.length - 2; i >= 0; i--) nodes[i].owner = nodes[i + 1];
        return nodes[0] || null;
    }

    function choice(el) {
        const dt = el.getAttribute('data-test') || '';
        return {
            selector: cssPath(el),
            marked_correct: dt.includes('correct'),
            aria_label: el.getAttribute('aria-label'),
            record: internalRecord(el),
        };
    }

    function token(el) {
        const raw = el.dataset ? el.dataset.index : null;
        const n = raw == null || raw === '' ? NaN : Number(raw);
        return {
            selector: cssPath(el),
            order: Number.isFinite(n) ? n : null,
            enabled: !el.disabled,
        };
    }

    const q = sel => document.querySelector(sel);
    const qa = sel => Array.from(document.querySelectorAll(sel));

    const result = {
        path: location.pathname,
        advance: ref(q('[data-test="player-next"]')),
        session_complete: !!q('[data-test*="session-complete"]'),
        continue_button: ref(q('[data-test="continue-button"]')),
        choices: qa('[data-test="challenge-choice"]').map(choice),
        translate_choices: qa('[data-test="challenge-translate-option"]').map(choice),
        word_tokens: qa('[data-test="word-bank"] button').map(token),
        pair_tokens: qa('[data-test="challenge-tap-token"]').map(token),
        text_input: !!q('[data-test="challenge-text-input"]'),
        audio_prompt: !!(q('[data-test="audio-button"]') || q('[data-test*="challenge-speak"]')),
        skip: ref(q('[data-test="player-skip"]')),
        practice: ref(q('[data-test="global-practice"]')),
        lesson_links: qa('[data-test*="skill"], [data-test*="lesson"]').slice(0, 8).map(ref),
        start_button: ref(q('[data-test="start-button"]')),
    };
    return JSON.stringify(result);
})()
"#;

/// The snapshot script with the internal-key prefixes injected from their
/// single Rust-side source.
pub fn snapshot_js() -> String {
    let prefixes = serde_json::to_string(crate::inspect::internal_key_prefixes())
        .expect("static prefix list serializes");
    format!("var __duofarm_key_prefixes = {}; {}", prefixes, SNAPSHOT_JS)
}

/// Parse the script's JSON result.
pub fn parse_snapshot(json: &str) -> crate::Result<PageSnapshot> {
    serde_json::from_str(json).map_err(|e| crate::Error::Snapshot(e.to_string()))
}
