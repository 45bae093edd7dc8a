//! Turns a raw reminder request into a short display title.
//!
//! Cleaning is an ordered list of named substitutions. Order matters: time
//! tokens must go before day-part words (so "lúc 15:30" loses the clock time
//! first) and everything must go before whitespace is collapsed.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

pub struct Rule {
    pub name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Option<Self> {
        Regex::new(pattern).ok().map(|pattern| Self {
            name,
            pattern,
            replacement,
        })
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(text, self.replacement)
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rules: Vec<(&'static str, &str, &'static str)> = vec![
        ("command_marker", r"(?i)^(?:/r(?:\s+|$))+", ""),
        (
            "lead_in",
            r"(?i)^(?:(?:à|a),\s*|(?:hãy|vui lòng|xin|làm ơn|xem nào|xem nao|ờm|ờ|ừ|uhm|ơ|ồ)\b\s*)+",
            "",
        ),
        (
            "remind_me",
            r"(?i)^(?:nhắc|nhac)\s+(?:tôi|toi|mình|minh)\b\s*",
            "",
        ),
        (
            "pronouns",
            r"(?i)\b(?:chúng tôi|chung toi|tôi|toi|mình|minh|tớ|to|tao|em|anh|chị|ban|bạn|mày|ta)\b",
            "",
        ),
        (
            "auxiliaries",
            r"(?i)\b(?:phải|cần|sẽ|đang|vừa|se|dang|vua)\b",
            "",
        ),
        (
            "relative_time",
            r"(?i)\b(?:sau|trong)\s+[0-9]{1,3}\s*(?:phút|phut|minutes|minute|mins|giờ|gio|hours|hour|h)\b",
            "",
        ),
        (
            "clock_time",
            r"(?i)\b[0-9]{1,2}(?:h(?:[0-9]{2})?|:[0-9]{2})\b",
            "",
        ),
        ("marked_hour", r"(?i)\b(?:lúc|luc|vào|vao)\s+[0-9]{1,2}\b", ""),
        (
            "day_words",
            r"(?i)\b(?:hôm nay|hom nay|ngày mai|ngay mai|mai|chiều|chieu|sáng|sang|tối|am|pm|lúc|luc|vào|vao|nay)\b",
            "",
        ),
        (
            "trailing_particles",
            r"(?i)(?:\b(?:nhé|nhe|nha|với|voi|giúp|giup|giùm|gium)\b[\s,.!?]*)+$",
            "",
        ),
        ("comma_spacing", r"(?:\s*,)+\s*", ", "),
        ("collapse_whitespace", r"\s+", " "),
        ("edge_punctuation", r"^[\s,.!?:;]+|[\s,.!?:;]+$", ""),
    ];

    rules
        .into_iter()
        .filter_map(|(name, pattern, replacement)| Rule::new(name, pattern, replacement))
        .collect()
});

/// The cleaning rules in application order.
pub fn rules() -> &'static [Rule] {
    &RULES
}

fn apply_rules(text: &str) -> String {
    rules()
        .iter()
        .fold(text.to_string(), |current, rule| rule.apply(&current).into_owned())
}

/// Clean `raw` into a title. Never empty for non-blank input: when cleaning
/// strips everything the trimmed input is returned unchanged.
///
/// The pipeline is repeated until the text stops changing. Every pass that
/// changes the text either deletes a character or only normalises spacing,
/// and spacing settles after one pass, so the input length bounds the loop.
pub fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut current = trimmed.to_string();

    for _ in 0..=trimmed.chars().count() + 1 {
        let next = apply_rules(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.trim().is_empty() {
        trimmed.to_string()
    } else {
        current
    }
}
