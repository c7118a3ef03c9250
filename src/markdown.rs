//! Markdown → plain text for terminal output.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: LazyLock<Regex>,
    replacement: &'static str,
}

macro_rules! rule {
    ($pattern:expr, $replacement:expr) => {
        Rule {
            pattern: LazyLock::new(|| Regex::new($pattern).expect("static regex")),
            replacement: $replacement,
        }
    };
}

// Applied top to bottom: code, headings, bold, italic, bullets, numbered
// items, blank-line runs, links.
static RULES: [Rule; 9] = [
    rule!(r"(?s)```[^\n`]*\n?(.*?)```", "$1"),
    rule!(r"`([^`]+)`", "$1"),
    rule!(r"(?m)^#{1,6}[ \t]+(.+)$", "${1}:\n"),
    rule!(r"\*\*(.+?)\*\*", "$1"),
    rule!(r"\*([^*\n]+)\*", "$1"),
    rule!(r"(?m)^([ \t]*)-[ \t]+", "${1}• "),
    rule!(r"(?m)^([ \t]*)\d+\.[ \t]+", "${1}• "),
    rule!(r"\n{3,}", "\n\n"),
    rule!(r"\[([^\]\n]+)\]\([^)\s]*\)", "$1"),
];

/// Strips markdown syntax, leaving readable plain text.
///
/// Unwrapping one layer can expose another (`# # a`), so the rules are
/// reapplied until nothing changes. Every rule removes markup characters,
/// which bounds the number of passes. Each extra pass peels one nesting
/// level, so cost is linear in input length times nesting depth.
pub fn normalize(text: &str) -> String {
    let mut current = strip_once(text);
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let stripped = RULES.iter().fold(text.to_string(), |acc, rule| {
        rule.pattern.replace_all(&acc, rule.replacement).into_owned()
    });
    stripped.trim().to_string()
}
