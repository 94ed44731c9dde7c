//! Conversation proxy to the Groq completion API
//!
//! Keeps a per-session, in-memory conversation history and forwards the
//! accumulated turns to the OpenAI-compatible chat-completions endpoint.
//! History is process-local: it is lost on restart and never persisted.
//!
//! Concurrency: each session owns an async mutex that is held across the
//! upstream call, so two requests for the same session id serialize and
//! their appends cannot interleave. Histories are capped; the oldest
//! non-system turns are dropped once a session exceeds the limit.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::warn;

/// Model used when the request does not name one
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MAX_TURNS: usize = 64;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant for a task-management application. \
     Answer concisely and stay on topic.";

/// One role-tagged turn of a conversation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system",
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user",
            content: content.to_string(),
        }
    }

    pub fn assistant(content: String) -> Self {
        Self {
            role: "assistant",
            content,
        }
    }
}

/// In-memory conversation histories keyed by caller-supplied session id
#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<StdMutex<HashMap<String, Arc<Mutex<Vec<ChatTurn>>>>>>,
    max_turns: usize,
}

impl ConversationStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: Arc::new(StdMutex::new(HashMap::new())),
            max_turns,
        }
    }

    /// Create a store from environment variables
    ///
    /// # Environment Variables
    /// - `LLM_MAX_TURNS`: Per-session history cap (default: 64)
    pub fn from_env() -> Self {
        let max_turns = std::env::var("LLM_MAX_TURNS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_TURNS);

        Self::new(max_turns)
    }

    /// Get the session's history handle, seeding a new session with the
    /// system instruction.
    ///
    /// The outer map lock is only held for the lookup; the returned
    /// per-session mutex is what serializes appends and upstream calls.
    pub fn session(&self, session_id: &str) -> Arc<Mutex<Vec<ChatTurn>>> {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(vec![ChatTurn::system(SYSTEM_PROMPT)])))
            .clone()
    }

    /// Drop the oldest non-system turns until the history fits the cap
    pub fn enforce_cap(&self, history: &mut Vec<ChatTurn>) {
        while history.len() > self.max_turns && history.len() > 1 {
            history.remove(1);
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

/// Client for the Groq chat-completions endpoint
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl CompletionClient {
    /// Create a new client from environment variables
    ///
    /// # Environment Variables
    /// - `GROQ_API_KEY`: API key; when unset every completion call fails
    /// - `GROQ_BASE_URL`: Override for the API base URL
    pub fn from_env() -> Self {
        let api_key = std::env::var("GROQ_API_KEY").ok();
        let base_url =
            std::env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        if api_key.is_none() {
            warn!("GROQ_API_KEY not set, the generate endpoint will fail");
        }

        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    fn build_request(model: &str, history: &[ChatTurn]) -> Value {
        json!({
            "model": model,
            "messages": history,
        })
    }

    /// Send the full history to the completion API and return the reply
    pub async fn complete(&self, model: &str, history: &[ChatTurn]) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("GROQ_API_KEY environment variable not set"))?;

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&Self::build_request(model, history))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion API returned {}: {}", status, detail);
        }

        let completion: CompletionResponse = response.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Completion API returned no choices"))?;

        Ok(reply)
    }
}
