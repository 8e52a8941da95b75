//! Markup escaping for text nodes and attribute values.
//!
//! These run for every leaf of every render, so the borrowing variants return
//! the input untouched when nothing needs escaping and the `push_*` variants
//! write straight into an existing buffer.

use std::borrow::Cow;

/// Escapes text node content: `&`, `<` and `>`.
///
/// ```
/// use xssr_core::escape::escape_text;
///
/// assert_eq!(escape_text("a < b && c"), "a &lt; b &amp;&amp; c");
/// assert_eq!(escape_text("plain"), "plain");
/// ```
pub fn escape_text(content: &str) -> Cow<'_, str> {
    html_escape::encode_text(content)
}

/// Escapes a double-quoted attribute value: `&`, `<`, `>` and `"`.
pub fn escape_attribute(content: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(content)
}

/// Appends escaped text node content to `out`.
pub fn push_text(content: &str, out: &mut String) {
    html_escape::encode_text_to_string(content, out);
}

/// Appends an escaped double-quoted attribute value to `out`.
pub fn push_attribute(content: &str, out: &mut String) {
    html_escape::encode_double_quoted_attribute_to_string(content, out);
}
