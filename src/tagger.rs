//! Tagged-text form of factoids.
//!
//! Input sentences carry bracketed role markers:
//! `[sujet] chat [predicat] manger [objet] croquettes`. Tagging extracts the
//! five role values; rendering produces the same form back, omitting empty
//! roles.

use std::sync::LazyLock;

use regex::Regex;

use crate::factoid::{Factoid, Role};

static ROLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(sujet|predicat|objet|lieu|temps)\]\s*([^\[]+)")
        .expect("role pattern is a valid regex")
});

/// Tag one sentence into a factoid shape (id and provenance left empty).
///
/// Values are trimmed and lower-cased. Missing roles stay empty; a repeated
/// role keeps its last value.
pub fn tag_sentence(text: &str) -> Factoid {
    let mut factoid = Factoid::default();
    for caps in ROLE_PATTERN.captures_iter(text) {
        if let Some(role) = Role::from_tag(&caps[1]) {
            factoid.set(role, caps[2].trim().to_lowercase());
        }
    }
    factoid
}

/// Whether a line carries role markers at all.
pub fn is_tagged_line(line: &str) -> bool {
    line.contains('[')
}

/// Render a factoid's five fields back into tagged text.
pub fn render_factoid(factoid: &Factoid) -> String {
    factoid
        .terms()
        .map(|(role, value)| format!("[{}] {value}", role.tag()))
        .collect::<Vec<_>>()
        .join(" ")
}
