//! Preference extraction from free-text chat input.
//!
//! Users typically paste the output of an intake form, e.g.
//!
//! ```text
//! Project Name: Acme Portal
//! Budget: $20,000
//! Timeline: 3 months
//! Specific Requirements: SSO, payments & analytics
//! ```
//!
//! Each field is matched independently; the first match wins and
//! unlabelled prose yields an empty record.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PROJECT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)project name:\s*(.+?)(?:\n|title:|$)").expect("valid project name pattern")
});

static BUDGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)budget:\s*(.+?)(?:\n|timeline:|$)").expect("valid budget pattern")
});

static TIMELINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)timeline:\s*(.+?)(?:\n|specific requirements:|$)")
        .expect("valid timeline pattern")
});

static REQUIREMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)specific requirements:\s*(.+?)(?:\n|$)").expect("valid requirements pattern")
});

/// Shorter requirement fragments are dropped.
const MIN_REQUIREMENT_LEN: usize = 3;

/// Structured fields pulled out of a chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Project name (empty if not given)
    pub title: String,

    /// Delivery timeline as written by the user
    pub timeline: String,

    /// Budget as written by the user
    pub budget: String,

    /// Individual requirements, deduplicated in first-seen order
    pub requirements: Vec<String>,
}

impl UserPreferences {
    /// Whether nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.timeline.is_empty()
            && self.budget.is_empty()
            && self.requirements.is_empty()
    }
}

/// Extract project preferences from a chat message.
pub fn extract_user_preferences(input: &str) -> UserPreferences {
    let mut prefs = UserPreferences {
        title: capture(&PROJECT_NAME, input),
        timeline: capture(&TIMELINE, input),
        budget: capture(&BUDGET, input),
        requirements: Vec::new(),
    };

    let raw = capture(&REQUIREMENTS, input);
    if !raw.is_empty() {
        prefs.requirements = split_requirements(&raw);
    }

    prefs
}

/// Split a requirement list on `,` `;` `&` and newlines.
pub fn split_requirements(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for piece in raw.split([',', ';', '&', '\n']) {
        let piece = piece.trim();
        if piece.chars().count() < MIN_REQUIREMENT_LEN {
            continue;
        }
        if !out.iter().any(|existing| existing == piece) {
            out.push(piece.to_string());
        }
    }
    out
}

fn capture(pattern: &Regex, input: &str) -> String {
    pattern
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
