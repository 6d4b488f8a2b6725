//! Naming transforms from a manifest's free-form `identity.name` to the
//! identifier shapes each platform accepts.
//!
//! Every transform is deterministic and idempotent: `f(f(x)) == f(x)`.
//! Pure functions, no I/O.

/// Maximum length of a DNS-1123 label.
pub const DNS_LABEL_MAX: usize = 63;

/// Maximum length of a Drupal machine name.
pub const MACHINE_NAME_MAX: usize = 64;

/// Fallback used when sanitization leaves nothing behind.
pub const FALLBACK_NAME: &str = "agent";

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Lowercases ASCII alphanumerics and collapses every run of other
/// characters into a single `sep`, then trims `sep` from both ends.
fn collapse(name: &str, sep: char) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(sep);
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

fn truncate(mut s: String, max: usize, sep: char) -> String {
    // Output of `collapse` is ASCII, so byte truncation is char-safe.
    if s.len() > max {
        s.truncate(max);
    }
    while s.ends_with(sep) {
        s.pop();
    }
    s
}

/// DNS-1123 label: `[a-z0-9-]`, no leading or trailing hyphen, at most 63
/// characters.
///
/// Used for container, Kubernetes and npm slugs.
#[must_use]
pub fn dns_label(name: &str) -> String {
    let s = truncate(collapse(name, '-'), DNS_LABEL_MAX, '-');
    if s.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        s
    }
}

/// Returns `true` if `s` is already a DNS label.
#[must_use]
pub fn is_dns_label(s: &str) -> bool {
    !s.is_empty() && dns_label(s) == s
}

/// Drupal machine name: `[a-z0-9_]`, starting with a letter, at most 64
/// characters.
#[must_use]
pub fn machine_name(name: &str) -> String {
    let mut s = collapse(name, '_');
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        s.insert_str(0, "m_");
    }
    let s = truncate(s, MACHINE_NAME_MAX, '_');
    if s.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        s
    }
}

/// Python identifier: a machine name with reserved words escaped by a
/// trailing underscore.
#[must_use]
pub fn python_identifier(name: &str) -> String {
    let mut s = machine_name(name);
    if PYTHON_KEYWORDS.contains(&s.as_str()) {
        s.push('_');
    }
    s
}

/// PascalCase class name. Words are split on anything that is not an ASCII
/// alphanumeric; a leading digit gets the `Agent` prefix.
#[must_use]
pub fn class_name(name: &str) -> String {
    let mut out = String::new();
    for word in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    if out.is_empty() {
        return "Agent".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "Agent");
    }
    out
}

/// Scoped npm package name, `@<scope>/<slug>`.
#[must_use]
pub fn package_name(scope: &str, name: &str) -> String {
    format!("@{}/{}", dns_label(scope), dns_label(name))
}

/// Local image reference `<dns-label>:<tag>`. The tag keeps only the
/// characters an OCI tag allows, so semver build metadata (`+build.5`)
/// becomes `_build.5`.
#[must_use]
pub fn image_reference(name: &str, version: &str) -> String {
    let tag: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(128)
        .collect();
    let tag = if tag.starts_with(['.', '-']) || tag.is_empty() {
        format!("v{tag}").chars().take(128).collect()
    } else {
        tag
    };
    format!("{}:{tag}", dns_label(name))
}
