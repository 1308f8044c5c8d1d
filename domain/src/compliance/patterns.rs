//! Structured identifier detection and redaction.
//!
//! Phone numbers, email addresses, URLs, and social-media handles are
//! deterministically matchable, so they are safe to redact-and-deliver: the
//! placeholder removes the contact channel while the rest of the message
//! stays useful. Each replacement is recorded as a [`RedactionEvent`] with
//! the category and the byte span in the *raw* text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Category of a structured identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionCategory {
    Phone,
    Email,
    Url,
    SocialHandle,
}

impl RedactionCategory {
    pub fn as_str(&self) -> &str {
        match self {
            RedactionCategory::Phone => "phone",
            RedactionCategory::Email => "email",
            RedactionCategory::Url => "url",
            RedactionCategory::SocialHandle => "social_handle",
        }
    }

    /// Placeholder inserted in place of the matched span.
    pub fn placeholder(&self) -> &str {
        match self {
            RedactionCategory::Phone => "[phone removed]",
            RedactionCategory::Email => "[email removed]",
            RedactionCategory::Url => "[link removed]",
            RedactionCategory::SocialHandle => "[handle removed]",
        }
    }
}

impl std::fmt::Display for RedactionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One replacement applied to a message on its way to the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionEvent {
    pub category: RedactionCategory,
    /// Byte span in the raw (pre-redaction) text.
    pub start: usize,
    pub end: usize,
    /// Label of the pattern that matched.
    pub pattern: String,
}

struct StructuredPattern {
    category: RedactionCategory,
    label: &'static str,
    regex: &'static LazyLock<Regex>,
}

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    // Optional country code, optional parens/separators, 3-3-4 digits.
    Regex::new(r"(?:\+?\d{1,2}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
        .expect("phone pattern")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9][A-Za-z0-9._%+-]*@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("email pattern")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    // Explicit schemes and www-prefixed hosts, plus bare common-TLD domains.
    Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+|\b[a-z0-9][a-z0-9-]*\.(?:com|net|org|io|biz)\b(?:/\S*)?")
        .expect("url pattern")
});

static HANDLE: LazyLock<Regex> = LazyLock::new(|| {
    // @name mentions. Email addresses win by priority ordering, so the
    // domain half of an address is never double-counted as a handle.
    Regex::new(r"@[A-Za-z0-9_][A-Za-z0-9_.]{1,30}").expect("handle pattern")
});

/// Priority order matters: earlier patterns claim their spans first and
/// later patterns skip anything overlapping an existing claim.
static PATTERNS: [StructuredPattern; 4] = [
    StructuredPattern {
        category: RedactionCategory::Phone,
        label: "phone_number",
        regex: &PHONE,
    },
    StructuredPattern {
        category: RedactionCategory::Email,
        label: "email_address",
        regex: &EMAIL,
    },
    StructuredPattern {
        category: RedactionCategory::Url,
        label: "url",
        regex: &URL,
    },
    StructuredPattern {
        category: RedactionCategory::SocialHandle,
        label: "social_handle",
        regex: &HANDLE,
    },
];

/// Replaces every structured identifier in `raw` with its category
/// placeholder. Returns the redacted text and the events, ordered by span
/// start.
pub fn redact(raw: &str) -> (String, Vec<RedactionEvent>) {
    let mut events: Vec<RedactionEvent> = Vec::new();

    for pattern in &PATTERNS {
        for m in pattern.regex.find_iter(raw) {
            let overlaps = events
                .iter()
                .any(|e| m.start() < e.end && e.start < m.end());
            if overlaps {
                continue;
            }
            events.push(RedactionEvent {
                category: pattern.category,
                start: m.start(),
                end: m.end(),
                pattern: pattern.label.to_string(),
            });
        }
    }

    events.sort_by_key(|e| e.start);

    let mut redacted = String::with_capacity(raw.len());
    let mut cursor = 0;
    for event in &events {
        redacted.push_str(&raw[cursor..event.start]);
        redacted.push_str(event.category.placeholder());
        cursor = event.end;
    }
    redacted.push_str(&raw[cursor..]);

    (redacted, events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_number_is_redacted() {
        let (text, events) = redact("Call me at 555-123-4567");
        assert_eq!(text, "Call me at [phone removed]");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, RedactionCategory::Phone);
        assert_eq!(&"Call me at 555-123-4567"[events[0].start..events[0].end], "555-123-4567");
    }

    #[test]
    fn phone_with_parens_and_country_code() {
        let (text, events) = redact("reach me on +1 (415) 555 0199 anytime");
        assert!(!text.contains("415"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, RedactionCategory::Phone);
    }

    #[test]
    fn email_is_redacted() {
        let (text, events) = redact("Email me: a@b.com");
        assert_eq!(text, "Email me: [email removed]");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, RedactionCategory::Email);
    }

    #[test]
    fn email_is_not_double_counted_as_handle_or_url() {
        let (_, events) = redact("contact joe.smith@example.com please");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, RedactionCategory::Email);
    }

    #[test]
    fn url_is_redacted() {
        let (text, events) = redact("see https://joesplumbing.example/gallery for photos");
        assert_eq!(text, "see [link removed] for photos");
        assert_eq!(events[0].category, RedactionCategory::Url);
    }

    #[test]
    fn bare_domain_is_redacted() {
        let (text, events) = redact("my site is joesplumbing.com");
        assert_eq!(text, "my site is [link removed]");
        assert_eq!(events[0].category, RedactionCategory::Url);
    }

    #[test]
    fn social_handle_is_redacted() {
        let (text, events) = redact("insta is @joes_plumbing btw");
        assert_eq!(text, "insta is [handle removed] btw");
        assert_eq!(events[0].category, RedactionCategory::SocialHandle);
    }

    #[test]
    fn multiple_identifiers_each_get_an_event() {
        let raw = "call 555-123-4567 or mail a@b.com";
        let (text, events) = redact(raw);
        assert_eq!(text, "call [phone removed] or mail [email removed]");
        assert_eq!(events.len(), 2);
        // Events come back ordered by span start.
        assert!(events[0].start < events[1].start);
    }

    #[test]
    fn clean_text_passes_untouched() {
        let raw = "The bathroom remodel should take about two weeks.";
        let (text, events) = redact(raw);
        assert_eq!(text, raw);
        assert!(events.is_empty());
    }
}
