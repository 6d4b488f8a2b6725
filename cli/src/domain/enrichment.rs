//! Platform-independent enrichment: a trigger document that tells an agent
//! host when to reach for this agent.
//!
//! Enrichers are injected into the orchestrator; converters never call them.

#![allow(clippy::format_push_string)]

use crate::domain::artifact::Artifact;
use crate::domain::manifest::Manifest;
use crate::domain::quote::{markdown_text, single_line, yaml_str};

/// Path of the trigger document in the artifact set.
pub const TRIGGER_DOCUMENT: &str = "SKILL.md";

const MAX_KEYWORDS: usize = 12;
const MIN_WORD_LEN: usize = 4;

const STOPWORDS: &[&str] = &[
    "about", "after", "agent", "also", "and", "before", "from", "have", "into", "that", "their",
    "them", "then", "there", "these", "they", "this", "when", "where", "which", "while", "will",
    "with", "your",
];

/// Derives one supplementary artifact from a manifest.
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the artifact to add, or `None` when there is nothing to say.
    fn augment(&self, manifest: &Manifest) -> Option<Artifact>;
}

/// Writes `SKILL.md`: YAML front matter with trigger keywords plus a short
/// Markdown body.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerDocumentEnricher;

impl Enricher for TriggerDocumentEnricher {
    fn name(&self) -> &str {
        "trigger-document"
    }

    fn augment(&self, manifest: &Manifest) -> Option<Artifact> {
        let keywords = trigger_keywords(manifest);
        if keywords.is_empty() {
            return None;
        }
        Some(Artifact::new(TRIGGER_DOCUMENT, trigger_document(manifest, &keywords)))
    }
}

/// Capability phrases first, then distinctive description words, without
/// duplicates and capped at a dozen.
#[must_use]
pub fn trigger_keywords(manifest: &Manifest) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |word: String| {
        if !word.is_empty() && !out.contains(&word) && out.len() < MAX_KEYWORDS {
            out.push(word);
        }
    };
    for cap in manifest.unique_capabilities() {
        push(cap.replace(['-', '_'], " "));
    }
    if let Some(description) = &manifest.identity().description {
        for word in description
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() >= MIN_WORD_LEN)
            .filter(|w| !STOPWORDS.contains(&w.as_str()))
        {
            push(word);
        }
    }
    out
}

fn trigger_document(manifest: &Manifest, keywords: &[String]) -> String {
    let caps = manifest.unique_capabilities();
    let summary = format!(
        "{} Use when a request involves {}.",
        single_line(&manifest.description_or_default()),
        caps.iter()
            .map(|c| c.replace(['-', '_'], " "))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut out = String::new();
    out.push_str("---\n");
    out.push_str(&format!("name: {}\n", manifest.dns_name()));
    out.push_str(&format!("description: {}\n", yaml_str(&summary)));
    out.push_str(&format!("version: {}\n", yaml_str(manifest.version())));
    out.push_str("triggers:\n");
    for k in keywords {
        out.push_str(&format!("  - {}\n", yaml_str(k)));
    }
    out.push_str("---\n\n");
    out.push_str(&format!("# {}\n\n", markdown_text(manifest.name())));
    out.push_str(&format!("{}\n\n", markdown_text(&summary)));
    out.push_str("## Capabilities\n\n");
    for cap in caps {
        out.push_str(&format!("- `{cap}`\n"));
    }
    out
}
