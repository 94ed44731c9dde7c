//! Support-chat models: chats, messages, and the admin presence record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat entity
#[derive(Debug, Clone, Serialize)]
pub struct Chat {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub is_admin_chat: bool,
    pub created_at: DateTime<Utc>,
}

/// Chat message entity
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
    pub is_read: bool,
}

/// Chat with its full ordered message list
#[derive(Debug, Clone, Serialize)]
pub struct ChatWithMessages {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub is_admin_chat: bool,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

impl ChatWithMessages {
    pub fn new(chat: Chat, messages: Vec<ChatMessage>) -> Self {
        Self {
            id: chat.id,
            user_id: chat.user_id,
            title: chat.title,
            is_admin_chat: chat.is_admin_chat,
            created_at: chat.created_at,
            messages,
        }
    }
}

/// Payload for creating an admin chat
#[derive(Debug, Clone, Deserialize)]
pub struct ChatPayload {
    pub title: String,
}

/// Payload for posting a message
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub content: String,
}

/// Singleton admin presence record, lazily created on first read
#[derive(Debug, Clone, Serialize)]
pub struct AdminStatus {
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

/// Payload for updating the admin presence record
#[derive(Debug, Clone, Deserialize)]
pub struct AdminStatusUpdate {
    pub is_online: bool,
}
