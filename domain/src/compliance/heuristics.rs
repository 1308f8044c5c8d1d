//! Circumvention heuristics.
//!
//! Structured identifiers are redactable; indirect attempts to move contact
//! off-platform are not — "search for my company name" carries no span that
//! could be safely cut out. These are semantically ambiguous, so the filter
//! fails closed: when the accumulated risk score crosses the threshold the
//! message is rejected outright instead of risking a false "safe" delivery.
//!
//! Each signal fires at most once per message regardless of how many times
//! its pattern matches; the risk score is the sum of distinct signal
//! weights. The default threshold (40) sits below every individual weight,
//! so any single signal is enough to reject — tunable via configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A heuristic indicator found in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircumventionSignal {
    /// Stable label of the heuristic rule (e.g. `search_suggestion`).
    pub label: String,
    /// Contribution to the risk score.
    pub weight: u32,
    /// The text fragment that triggered the rule.
    pub excerpt: String,
}

struct HeuristicRule {
    label: &'static str,
    weight: u32,
    regex: &'static LazyLock<Regex>,
}

static SPELLED_OUT_DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    // Three or more consecutive spelled-out digits ("five five five ...").
    Regex::new(
        r"(?i)\b(?:zero|one|two|three|four|five|six|seven|eight|nine)(?:[\s-]+(?:zero|one|two|three|four|five|six|seven|eight|nine)){2,}\b",
    )
    .expect("spelled-out digits pattern")
});

static OBFUSCATED_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    // "joe at example dot com" and bracketed variants.
    Regex::new(
        r"(?i)\b[a-z0-9_.+-]+\s+(?:at|\(at\)|\[at\])\s+[a-z0-9-]+\s+(?:dot|\(dot\)|\[dot\])\s+(?:com|net|org|io|biz)\b",
    )
    .expect("obfuscated email pattern")
});

static SEARCH_SUGGESTION: LazyLock<Regex> = LazyLock::new(|| {
    // "search for <name> on Google", "look up our company", "google us".
    Regex::new(
        r"(?i)\b(?:search|look)\s+(?:for|up)\b.{0,60}\b(?:google|yelp|online|the\s+web|facebook|instagram)\b|\bgoogle\s+(?:me|us|my|our)\b",
    )
    .expect("search suggestion pattern")
});

static FIND_ME_ON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:find|follow|add|dm)\s+(?:me|us)\s+on\b").expect("find-me-on pattern")
});

static PLATFORM_EXIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bwhats\s?app\b|\btelegram\b|\bsignal\b|\btake\s+this\s+offline\b|\boff[\s-]?platform\b|\boutside\s+the\s+(?:app|platform|site)\b",
    )
    .expect("platform exit pattern")
});

static RULES: [HeuristicRule; 5] = [
    HeuristicRule {
        label: "spelled_out_digits",
        weight: 60,
        regex: &SPELLED_OUT_DIGITS,
    },
    HeuristicRule {
        label: "obfuscated_email",
        weight: 60,
        regex: &OBFUSCATED_EMAIL,
    },
    HeuristicRule {
        label: "search_suggestion",
        weight: 50,
        regex: &SEARCH_SUGGESTION,
    },
    HeuristicRule {
        label: "find_me_on",
        weight: 50,
        regex: &FIND_ME_ON,
    },
    HeuristicRule {
        label: "platform_exit",
        weight: 50,
        regex: &PLATFORM_EXIT,
    },
];

/// Scans `raw` for circumvention indicators.
///
/// Returns the distinct signals found and the total risk score.
pub fn assess(raw: &str) -> (Vec<CircumventionSignal>, u32) {
    let mut signals = Vec::new();
    let mut risk = 0;

    for rule in &RULES {
        if let Some(m) = rule.regex.find(raw) {
            risk += rule.weight;
            signals.push(CircumventionSignal {
                label: rule.label.to_string(),
                weight: rule.weight,
                excerpt: crate::util::truncate_str(m.as_str(), 80).to_string(),
            });
        }
    }

    (signals, risk)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &str) -> Vec<String> {
        assess(raw).0.into_iter().map(|s| s.label).collect()
    }

    #[test]
    fn search_suggestion_fires() {
        assert_eq!(labels("search for Joe's Plumbing on Google"), ["search_suggestion"]);
    }

    #[test]
    fn google_us_fires() {
        assert_eq!(labels("just google us, you'll find the number"), ["search_suggestion"]);
    }

    #[test]
    fn spelled_out_number_fires() {
        assert_eq!(
            labels("my number is five five five one two three four"),
            ["spelled_out_digits"]
        );
    }

    #[test]
    fn two_spelled_digits_are_not_enough() {
        // "one two" alone is common in normal text ("phase one, two weeks").
        assert!(labels("phase one two is next").is_empty());
        assert!(labels("it takes one more week").is_empty());
    }

    #[test]
    fn obfuscated_email_fires() {
        assert_eq!(labels("write to joe at joesplumbing dot com"), ["obfuscated_email"]);
    }

    #[test]
    fn platform_exit_fires() {
        assert_eq!(labels("message me on WhatsApp instead"), ["platform_exit"]);
        assert_eq!(labels("let's take this offline"), ["platform_exit"]);
    }

    #[test]
    fn find_me_on_fires() {
        assert_eq!(labels("find us on Instagram"), ["find_me_on"]);
    }

    #[test]
    fn multiple_signals_accumulate_risk() {
        let (signals, risk) = assess("google us or find us on facebook");
        assert_eq!(signals.len(), 2);
        assert_eq!(risk, 100);
    }

    #[test]
    fn ordinary_project_talk_is_clean() {
        let clean = [
            "When could you start on the kitchen?",
            "The quote covers demolition and haul-away.",
            "I'd like the deck stained a darker color.",
        ];
        for text in clean {
            let (signals, risk) = assess(text);
            assert!(signals.is_empty(), "false positive on: {text}");
            assert_eq!(risk, 0);
        }
    }
}
