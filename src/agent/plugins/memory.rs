//! Per-session conversation memory
//!
//! Keeps the last `memory_size` user messages of each session in memory and
//! publishes three context entries on every message:
//!
//! - `conversation_history`: the five most recent entries
//! - `session_context`: length, top topics, duration and last activity
//! - `memory_insights`: returning-user flag, engagement trend and suggestions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};

use super::{option_bool, option_usize};
use crate::agent::{AgentPlugin, PluginContext, PluginOptions, context_str};
use crate::errors::PluginError;

const DEFAULT_MEMORY_SIZE: usize = 10;
const RECENT_HISTORY: usize = 5;
const TOP_TOPICS: usize = 5;
const RETURNING_USER_MESSAGES: usize = 5;
const TREND_WINDOW: usize = 5;

/// One remembered user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub message: String,
    pub message_type: String,
}

#[derive(Debug, Clone, Serialize)]
struct SessionContext {
    session_length: usize,
    topics: Vec<String>,
    duration_minutes: f64,
    last_activity: Option<DateTime<Utc>>,
}

pub struct ConversationMemoryPlugin {
    enabled: bool,
    memory_size: usize,
    conversations: Mutex<HashMap<String, VecDeque<MemoryEntry>>>,
}

impl ConversationMemoryPlugin {
    pub fn from_options(options: &PluginOptions) -> Result<Self, PluginError> {
        Ok(Self {
            enabled: option_bool(options, "enabled", true)?,
            memory_size: option_usize(options, "memory_size", DEFAULT_MEMORY_SIZE)?,
            conversations: Mutex::new(HashMap::new()),
        })
    }

    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    /// Remembered entries for a session, oldest first
    ///
    /// `max_messages` keeps only the most recent entries; `None` or `Some(0)`
    /// returns everything.
    pub fn get_conversation_history(
        &self,
        session_id: &str,
        max_messages: Option<usize>,
    ) -> Vec<MemoryEntry> {
        let conversations = self.conversations.lock();
        conversations
            .get(session_id)
            .map(|entries| recent(entries, max_messages.unwrap_or(0)))
            .unwrap_or_default()
    }

    /// Forget a session; returns whether anything was stored for it
    pub fn clear_session_memory(&self, session_id: &str) -> bool {
        self.conversations.lock().remove(session_id).is_some()
    }

    // Store the message and compute the context entries in one critical section
    fn remember(&self, session_id: &str, user_id: &str, message: &str) -> (Value, Value, Value) {
        let mut conversations = self.conversations.lock();
        let entries = conversations.entry(session_id.to_string()).or_default();

        entries.push_back(MemoryEntry {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            message: message.to_string(),
            message_type: "user_input".to_string(),
        });
        while entries.len() > self.memory_size {
            entries.pop_front();
        }

        let session = session_context(entries);
        let insights = json!({
            "is_returning_user": entries.len() > RETURNING_USER_MESSAGES,
            "conversation_trend": conversation_trend(entries),
            "suggested_actions": suggested_actions(&session),
        });

        (
            json!(recent(entries, RECENT_HISTORY)),
            json!(session),
            insights,
        )
    }
}

fn recent(entries: &VecDeque<MemoryEntry>, max_messages: usize) -> Vec<MemoryEntry> {
    let skip = match max_messages {
        0 => 0,
        n => entries.len().saturating_sub(n),
    };
    entries.iter().skip(skip).cloned().collect()
}

fn session_context(entries: &VecDeque<MemoryEntry>) -> SessionContext {
    // Word frequencies in first-seen order, so ties keep that order after sorting
    let mut frequencies: Vec<(String, usize)> = Vec::new();
    for entry in entries {
        for word in entry.message.to_lowercase().split_whitespace() {
            if word.chars().count() <= 3 {
                continue;
            }
            match frequencies.iter_mut().find(|(w, _)| w == word) {
                Some((_, count)) => *count += 1,
                None => frequencies.push((word.to_string(), 1)),
            }
        }
    }
    frequencies.sort_by(|a, b| b.1.cmp(&a.1));

    let duration_minutes = match (entries.front(), entries.back()) {
        (Some(first), Some(last)) if entries.len() >= 2 => {
            (last.timestamp - first.timestamp).num_milliseconds() as f64 / 60_000.0
        }
        _ => 0.0,
    };

    SessionContext {
        session_length: entries.len(),
        topics: frequencies
            .into_iter()
            .take(TOP_TOPICS)
            .map(|(word, _)| word)
            .collect(),
        duration_minutes,
        last_activity: entries.back().map(|entry| entry.timestamp),
    }
}

/// Compares the newest message length with the mean of the previous ones
fn conversation_trend(entries: &VecDeque<MemoryEntry>) -> &'static str {
    if entries.len() < 3 {
        return "neutral";
    }

    let lengths: Vec<f64> = entries
        .iter()
        .skip(entries.len().saturating_sub(TREND_WINDOW))
        .map(|entry| entry.message.chars().count() as f64)
        .collect();
    let Some((last, previous)) = lengths.split_last() else {
        return "neutral";
    };
    let average = previous.iter().sum::<f64>() / previous.len() as f64;

    if *last > average * 1.5 {
        "increasing_engagement"
    } else if *last < average * 0.5 {
        "decreasing_engagement"
    } else {
        "stable"
    }
}

fn suggested_actions(session: &SessionContext) -> Vec<&'static str> {
    let mut actions = Vec::new();
    if session.session_length > 10 {
        actions.push("User seems engaged, offer a deeper conversation");
    }
    if session.duration_minutes > 30.0 {
        actions.push("Long session detected, check whether the user needs specific help");
    }
    if session.topics.iter().any(|topic| topic.contains("help")) {
        actions.push("Ask what kind of help is needed");
    }
    actions
}

#[async_trait]
impl AgentPlugin for ConversationMemoryPlugin {
    fn name(&self) -> &str {
        "Conversation Memory Plugin"
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

        let session_id = context_str(context, "session_id").unwrap_or("default").to_string();
        let user_id = context_str(context, "user_id").unwrap_or("anonymous").to_string();

        let (history, session, insights) = self.remember(&session_id, &user_id, message);
        context.insert("conversation_history".to_string(), history);
        context.insert("session_context".to_string(), session);
        context.insert("memory_insights".to_string(), insights);

        Ok(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(memory_size: usize) -> ConversationMemoryPlugin {
        let options: PluginOptions = json!({"memory_size": memory_size})
            .as_object()
            .cloned()
            .unwrap();
        ConversationMemoryPlugin::from_options(&options).unwrap()
    }

    fn context_for(session_id: &str) -> PluginContext {
        let mut context = PluginContext::new();
        context.insert("session_id".to_string(), json!(session_id));
        context
    }

    #[tokio::test]
    async fn test_history_is_capped_and_published() {
        let memory = plugin(3);
        let mut context = context_for("s1");
        for i in 0..5 {
            memory
                .process_message(&format!("message {i}"), &mut context)
                .await
                .unwrap();
        }

        let history = memory.get_conversation_history("s1", None);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message, "message 2");
        assert_eq!(history[2].user_id, "anonymous");

        assert_eq!(context["conversation_history"].as_array().unwrap().len(), 3);
        assert_eq!(context["session_context"]["session_length"], 3);
        assert_eq!(context["memory_insights"]["is_returning_user"], false);

        assert_eq!(memory.get_conversation_history("s1", Some(1))[0].message, "message 4");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_and_clearable() {
        let memory = plugin(10);
        memory
            .process_message("first", &mut context_for("a"))
            .await
            .unwrap();
        memory
            .process_message("second", &mut PluginContext::new())
            .await
            .unwrap();

        assert_eq!(memory.get_conversation_history("a", None).len(), 1);
        assert_eq!(memory.get_conversation_history("default", None).len(), 1);
        assert!(memory.clear_session_memory("a"));
        assert!(!memory.clear_session_memory("a"));
        assert!(memory.get_conversation_history("a", None).is_empty());
    }

    #[tokio::test]
    async fn test_topics_and_help_suggestion() {
        let memory = plugin(10);
        let mut context = context_for("s1");
        for message in ["need help with billing", "billing help please", "help"] {
            memory.process_message(message, &mut context).await.unwrap();
        }

        let topics = context["session_context"]["topics"].as_array().unwrap();
        // "help" three times, "billing" twice
        assert_eq!(topics[0], "help");
        assert_eq!(topics[1], "billing");
        assert_eq!(
            context["memory_insights"]["suggested_actions"],
            json!(["Ask what kind of help is needed"])
        );
    }

    #[test]
    fn test_conversation_trend() {
        let entries = |messages: &[&str]| -> VecDeque<MemoryEntry> {
            messages
                .iter()
                .map(|m| MemoryEntry {
                    timestamp: Utc::now(),
                    user_id: "u".to_string(),
                    message: m.to_string(),
                    message_type: "user_input".to_string(),
                })
                .collect()
        };

        assert_eq!(conversation_trend(&entries(&["a", "b"])), "neutral");
        assert_eq!(
            conversation_trend(&entries(&["abcd", "abcd", "abcdefghijkl"])),
            "increasing_engagement"
        );
        assert_eq!(conversation_trend(&entries(&["abcd", "abcd", "a"])), "decreasing_engagement");
        assert_eq!(conversation_trend(&entries(&["abcd", "abcd", "abc"])), "stable");
    }
}
