//! Keyword sentiment scoring
//!
//! The score is `(positive - negative) / (positive + negative)` over word
//! tokens, or `0.0` when no sentiment word appears. Scores beyond the
//! threshold set a tone and a response prefix in the context; urgency words
//! (matched as substrings) add a priority note.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{WORD, option_bool, option_f64};
use crate::agent::{AgentPlugin, PluginContext, PluginOptions};
use crate::errors::PluginError;

const DEFAULT_THRESHOLD: f64 = 0.5;

const POSITIVE_WORDS: &[&str] = &[
    "thanks", "thank", "perfect", "excellent", "super", "great", "good", "happy", "glad",
    "awesome", "fantastic", "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "crap", "useless", "bad", "terrible", "horrible", "angry", "annoyed", "problem", "error",
    "bug", "broken", "awful",
];

const URGENCY_WORDS: &[&str] = &[
    "urgent", "quickly", "right now", "immediately", "asap", "help", "emergency", "hurry",
];

const NEGATIVE_PREFIX: &str = "I understand your frustration. ";
const POSITIVE_PREFIX: &str = "I'm happy to help! ";
const URGENT_PREFIX: &str = "I will handle your request as a priority. ";

pub struct SentimentAnalysisPlugin {
    enabled: bool,
    threshold: f64,
}

impl SentimentAnalysisPlugin {
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        let threshold = option_f64(options, "threshold", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PluginError::InvalidConfiguration(format!(
                "'threshold' must be between 0.0 and 1.0, got {threshold}"
            )));
        }
        Ok(Self {
            enabled: option_bool(options, "enabled", true)?,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score in `[-1.0, 1.0]`
    pub fn score(message: &str) -> f64 {
        let lower = message.to_lowercase();
        let (mut positive, mut negative) = (0usize, 0usize);
        for word in WORD.find_iter(&lower).map(|m| m.as_str()) {
            if POSITIVE_WORDS.contains(&word) {
                positive += 1;
            }
            if NEGATIVE_WORDS.contains(&word) {
                negative += 1;
            }
        }

        let total = positive + negative;
        if total == 0 {
            return 0.0;
        }
        (positive as f64 - negative as f64) / total as f64
    }

    pub fn emotion_label(score: f64) -> &'static str {
        if score > 0.3 {
            "positive"
        } else if score < -0.3 {
            "negative"
        } else if score > 0.1 {
            "slightly_positive"
        } else if score < -0.1 {
            "slightly_negative"
        } else {
            "neutral"
        }
    }

    pub fn is_urgent(message: &str) -> bool {
        let lower = message.to_lowercase();
        URGENCY_WORDS.iter().any(|word| lower.contains(word))
    }
}

#[async_trait]
impl AgentPlugin for SentimentAnalysisPlugin {
    fn name(&self) -> &str {
        "Sentiment Analysis Plugin"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn process_message(
        &self,
        message: &str,
        context: &mut PluginContext,
    ) -> Result<String, PluginError> {
        if !self.enabled {
            return Ok(message.to_string());
        }

        let score = Self::score(message);
        let urgent = Self::is_urgent(message);
        context.insert(
            "sentiment_analysis".to_string(),
            json!({
                "score": score,
                "emotion": Self::emotion_label(score),
                "is_urgent": urgent,
            }),
        );

        let tone = if score < -self.threshold {
            context.insert("response_prefix".to_string(), json!(NEGATIVE_PREFIX));
            "empathetic"
        } else if score > self.threshold {
            context.insert("response_prefix".to_string(), json!(POSITIVE_PREFIX));
            "enthusiastic"
        } else {
            "neutral"
        };
        context.insert("tone".to_string(), json!(tone));

        if urgent {
            context.insert("urgency".to_string(), json!("high"));
            let prefix = context
                .get("response_prefix")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let prefix = format!("{prefix}{URGENT_PREFIX}");
            context.insert("response_prefix".to_string(), Value::String(prefix));
        }

        Ok(message.to_string())
    }
}
