//! Quoting helpers for embedding manifest text in generated files.
//!
//! Every free-text manifest value that lands in an artifact goes through one
//! of these, so a description containing quotes, newlines or template
//! metacharacters cannot change the structure of the surrounding file.

/// Collapses control characters (including newlines) into single spaces and
/// trims the result.
#[must_use]
pub fn single_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_control() || c.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Double-quoted YAML scalar.
#[must_use]
pub fn yaml_str(text: &str) -> String {
    json_str(text)
}

/// JSON string literal. JSON strings are valid YAML double-quoted scalars.
#[must_use]
pub fn json_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Python string literal (double-quoted).
#[must_use]
pub fn python_str(text: &str) -> String {
    json_str(text)
}

/// Single-quoted PHP string literal; only `\` and `'` are special.
#[must_use]
pub fn php_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Text safe to place inside a Markdown line: single line, with backticks
/// and angle brackets neutralised.
#[must_use]
pub fn markdown_text(text: &str) -> String {
    single_line(text)
        .replace('`', "'")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
