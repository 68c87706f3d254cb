//! Post-generation cleanup of backend text.
//!
//! Removes model artifacts (thinking blocks, unused tokenizer tokens)
//! so the emptiness check sees only narrative content.

use std::sync::LazyLock;
use regex::Regex;

static THOUGHT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*<unused\d+>thought\n").expect("valid regex"));

static UNUSED_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<unused\d+>").expect("valid regex"));

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Strip model-specific artifacts and surrounding whitespace.
pub fn clean_backend_output(raw: &str) -> String {
    // Only a leading `<unusedN>thought` marker opens a thinking block
    let mut text = THOUGHT_PREFIX_RE.replace(raw, "").to_string();

    text = THINK_BLOCK_RE.replace_all(&text, "").to_string();
    text = UNUSED_TOKEN_RE.replace_all(&text, "").to_string();

    text.trim().to_string()
}
