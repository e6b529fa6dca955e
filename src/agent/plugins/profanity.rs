//! Abuse and spam filter
//!
//! Checks run in order and the first hit wins:
//!
//! 1. a bad word (as a word token) or an insult pattern replaces the message
//!    with a polite refusal
//! 2. spam heuristics replace the message with a spam notice
//! 3. otherwise obfuscated bad words (`sh*t`) are masked with `*`, unless the
//!    filter is strict
//!
//! Refusals rotate through a fixed list, so repeated abuse gets varied but
//! reproducible answers.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{WORD, option_bool};
use crate::agent::{AgentPlugin, PluginContext, PluginOptions};
use crate::errors::PluginError;

const BAD_WORDS: &[&str] = &[
    "shit", "fuck", "fucking", "bitch", "bastard", "asshole", "dick", "bullshit", "f*ck", "sh*t",
    "b*tch", "a**hole",
];

static INSULTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bson of a \w+",
        r"\bpiece of (?:shit|crap|garbage|trash)\b",
        r"\w+ of shit\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

static SPAM: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)\b(?:buy|sell|discount|offer)\b", r"(?i)https?://", r"@\w+"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid regex"))
        .collect()
});

const STRICT_REPLIES: &[&str] = &[
    "I'd rather not respond to that.",
    "Could you rephrase your question more respectfully?",
    "I can't process this kind of content.",
];

const SOFT_REPLIES: &[&str] = &[
    "Could you rephrase that more politely?",
    "I understand your frustration, but could you be more respectful?",
];

pub const SPAM_REPLY: &str = "Your message looks like spam. Could you ask a more relevant question?";

const REPEATED_CHAR_RUN: usize = 5;

pub struct ProfanityFilterPlugin {
    enabled: bool,
    strict: bool,
    next_reply: AtomicUsize,
}

impl ProfanityFilterPlugin {
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        Ok(Self {
            enabled: option_bool(options, "enabled", true)?,
            strict: option_bool(options, "strict", false)?,
            next_reply: AtomicUsize::new(0),
        })
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn contains_inappropriate_content(message: &str) -> bool {
        let lower = message.to_lowercase();
        WORD.find_iter(&lower)
            .any(|word| BAD_WORDS.contains(&word.as_str()))
            || INSULTS.iter().any(|insult| insult.is_match(&lower))
    }

    /// Number of spam heuristics the message trips
    pub fn spam_score(message: &str) -> usize {
        let lower = message.to_lowercase();
        let repeated = usize::from(has_repeated_run(&lower, REPEATED_CHAR_RUN));
        repeated + SPAM.iter().filter(|pattern| pattern.is_match(&lower)).count()
    }

    fn is_spam(message: &str) -> bool {
        let score = Self::spam_score(message);
        score >= 2 || (score > 0 && message.split_whitespace().count() < 3)
    }

    fn mask(&self, message: &str) -> Option<String> {
        if self.strict {
            return None;
        }

        let mut changed = false;
        let masked: Vec<String> = message
            .split_whitespace()
            .map(|word| {
                if BAD_WORDS.contains(&word.to_lowercase().as_str()) {
                    changed = true;
                    "*".repeat(word.chars().count())
                } else {
                    word.to_string()
                }
            })
            .collect();

        changed.then(|| masked.join(" "))
    }

    fn replacement(&self) -> &'static str {
        let replies = if self.strict { STRICT_REPLIES } else { SOFT_REPLIES };
        let index = self.next_reply.fetch_add(1, Ordering::Relaxed);
        replies[index % replies.len()]
    }
}

// The regex crate has no backreferences
fn has_repeated_run(text: &str, run: usize) -> bool {
    let mut previous = None;
    let mut length = 0;
    for c in text.chars() {
        if Some(c) == previous {
            length += 1;
        } else {
            previous = Some(c);
            length = 1;
        }
        if length >= run {
            return true;
        }
    }
    false
}

#[async_trait]
impl AgentPlugin for ProfanityFilterPlugin {
    fn name(&self) -> &str {
        "Profanity Filter Plugin"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn process_message(
        &self,
        message: &str,
        context: &mut PluginContext,
    ) -> Result<String, PluginError> {
        if !self.enabled || message.trim().is_empty() {
            return Ok(message.to_string());
        }

        if Self::contains_inappropriate_content(message) {
            context.insert("filtered".to_string(), Value::Bool(true));
            context.insert("filter_reason".to_string(), json!("inappropriate_content"));
            return Ok(self.replacement().to_string());
        }

        if Self::is_spam(message) {
            context.insert("filtered".to_string(), Value::Bool(true));
            context.insert("filter_reason".to_string(), json!("spam"));
            return Ok(SPAM_REPLY.to_string());
        }

        match self.mask(message) {
            Some(cleaned) => {
                context.insert("cleaned".to_string(), Value::Bool(true));
                context.insert("original_message".to_string(), json!(message));
                context.insert("filtered_message".to_string(), json!(cleaned));
                Ok(cleaned)
            }
            None => Ok(message.to_string()),
        }
    }
}
