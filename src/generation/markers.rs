//! Side-channel markers embedded in model output.
//!
//! The model is asked to emit `[[KEY: payload]]` markers alongside its prose.
//! Keys are matched case-insensitively. A `NAME` payload stays on one line,
//! a `CONTEXT_FOR_NEXT` payload may span lines, and no payload contains `[[`.
//! Markers are extracted from the accumulated section text and stripped
//! before any text is shown or committed.

use once_cell::sync::Lazy;
use regex::Regex;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[\[\s*NAME\s*:\s*((?:[^\[\n]|\[[^\[\n])*?)\]\]")
        .expect("name marker pattern is valid")
});

static CONTEXT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[\[\s*CONTEXT_FOR_NEXT\s*:\s*((?:[^\[]|\[[^\[])*?)\]\]")
        .expect("context marker pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKey {
    Name,
    ContextForNext,
}

impl MarkerKey {
    pub const ALL: [MarkerKey; 2] = [MarkerKey::Name, MarkerKey::ContextForNext];

    pub fn as_str(self) -> &'static str {
        match self {
            MarkerKey::Name => "NAME",
            MarkerKey::ContextForNext => "CONTEXT_FOR_NEXT",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            MarkerKey::Name => &NAME_PATTERN,
            MarkerKey::ContextForNext => &CONTEXT_PATTERN,
        }
    }

    /// Whether a payload of this key may continue past a line break.
    fn spans_lines(self) -> bool {
        matches!(self, MarkerKey::ContextForNext)
    }
}

/// Payload of the first marker with `key`, trimmed. Empty payloads count as absent.
pub fn extract(key: MarkerKey, text: &str) -> Option<String> {
    key.pattern()
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|payload| !payload.is_empty())
}

pub fn extract_name(text: &str) -> Option<String> {
    extract(MarkerKey::Name, text)
}

pub fn extract_handoff_context(text: &str) -> Option<String> {
    extract(MarkerKey::ContextForNext, text)
}

/// Remove every marker and trim. Runs to a fixpoint, so the result never
/// contains a marker and `clean(clean(t)) == clean(t)`.
pub fn clean(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = MarkerKey::ALL.iter().fold(current.clone(), |acc, key| {
            key.pattern().replace_all(&acc, "").into_owned()
        });
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

/// Text safe to show while a section is still streaming: cleaned, with any
/// unterminated marker at the end held back until it closes.
pub fn display_text(text: &str) -> String {
    match pending_marker_start(text) {
        Some(start) => clean(&text[..start]),
        None => clean(text),
    }
}

/// Byte offset of a trailing `[[` that could still grow into a marker.
fn pending_marker_start(text: &str) -> Option<usize> {
    let start = text.rfind("[[")?;
    let rest = &text[start + 2..];
    if rest.contains("]]") {
        return None;
    }
    let rest = rest.trim_start();
    let could_become_marker = match rest.split_once(':') {
        Some((key, payload)) => {
            let key = key.trim_end();
            MarkerKey::ALL.iter().any(|k| {
                k.as_str().eq_ignore_ascii_case(key) && (k.spans_lines() || !payload.contains('\n'))
            })
        }
        None => {
            let key = rest.trim_end();
            if key.len() != rest.len() {
                // Whitespace is only allowed once the key is complete.
                MarkerKey::ALL
                    .iter()
                    .any(|k| k.as_str().eq_ignore_ascii_case(key))
            } else {
                MarkerKey::ALL.iter().any(|k| {
                    let name = k.as_str();
                    key.len() <= name.len() && name[..key.len()].eq_ignore_ascii_case(key)
                })
            }
        }
    };
    could_become_marker.then_some(start)
}

/// Reports a detected name at most once, however often the text is rescanned.
#[derive(Debug, Default)]
pub struct NameDetector {
    reported: bool,
}

impl NameDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&mut self, text: &str) -> Option<String> {
        if self.reported {
            return None;
        }
        let name = extract_name(text)?;
        self.reported = true;
        Some(name)
    }

    pub fn has_reported(&self) -> bool {
        self.reported
    }
}
