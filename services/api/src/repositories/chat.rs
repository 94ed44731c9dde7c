//! Chat repository for database operations
//!
//! Covers support chats, their messages, and the singleton admin
//! presence record.

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::chat::{AdminStatus, Chat, ChatMessage};

const CHAT_COLUMNS: &str = "id, user_id, title, is_admin_chat, created_at";
const MESSAGE_COLUMNS: &str = "id, chat_id, sender_id, content, created_at, is_admin, is_read";

fn chat_from_row(row: &PgRow) -> Chat {
    Chat {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        is_admin_chat: row.get("is_admin_chat"),
        created_at: row.get("created_at"),
    }
}

fn message_from_row(row: &PgRow) -> ChatMessage {
    ChatMessage {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        is_admin: row.get("is_admin"),
        is_read: row.get("is_read"),
    }
}

/// Chat repository
#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    /// Create a new chat repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the user's admin chat, creating it if absent.
    ///
    /// Backed by the partial unique index on `(user_id) WHERE
    /// is_admin_chat`; concurrent first messages both land on the same
    /// row instead of creating duplicates. The no-op DO UPDATE makes
    /// RETURNING yield the existing row on conflict, and an existing
    /// title is kept.
    pub async fn get_or_create_admin_chat(&self, user_id: i64, title: &str) -> Result<Chat> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO chats (title, user_id, is_admin_chat)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (user_id) WHERE is_admin_chat
            DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {CHAT_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(chat_from_row(&row))
    }

    /// Find the user's admin chat
    pub async fn find_admin_chat(&self, user_id: i64) -> Result<Option<Chat>> {
        let row = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE user_id = $1 AND is_admin_chat"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(chat_from_row))
    }

    /// Find any chat by ID
    pub async fn find(&self, chat_id: i64) -> Result<Option<Chat>> {
        let row = sqlx::query(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"))
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(chat_from_row))
    }

    /// List every admin chat
    pub async fn list_admin_chats(&self) -> Result<Vec<Chat>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE is_admin_chat ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(chat_from_row).collect())
    }

    /// Messages of a chat in timestamp order
    pub async fn messages(&self, chat_id: i64) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Append a message to a chat, unread
    pub async fn add_message(
        &self,
        chat_id: i64,
        sender_id: i64,
        content: &str,
        is_admin: bool,
    ) -> Result<ChatMessage> {
        info!("Adding message to chat {} from sender {}", chat_id, sender_id);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO chat_messages (chat_id, sender_id, content, is_admin, is_read)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(message_from_row(&row))
    }

    /// Mark unread messages authored by the given side as read; returns
    /// the number of messages flipped. Callers pass the side *opposite*
    /// to their own, so nobody marks their own messages.
    pub async fn mark_read(&self, chat_id: i64, authored_by_admin: bool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages
            SET is_read = TRUE
            WHERE chat_id = $1 AND is_admin = $2 AND NOT is_read
            "#,
        )
        .bind(chat_id)
        .bind(authored_by_admin)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Total unread user-authored messages across all admin chats
    pub async fn unread_user_authored_total(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM chat_messages m
            JOIN chats c ON c.id = m.chat_id
            WHERE c.is_admin_chat AND NOT m.is_admin AND NOT m.is_read
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Per-username breakdown of unread user-authored messages
    pub async fn unread_user_authored_by_user(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT u.username AS username, COUNT(*) AS unread
            FROM chat_messages m
            JOIN chats c ON c.id = m.chat_id
            JOIN users u ON u.id = c.user_id
            WHERE c.is_admin_chat AND NOT m.is_admin AND NOT m.is_read
            GROUP BY u.username
            ORDER BY u.username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("username"), row.get("unread")))
            .collect())
    }

    /// Unread admin-authored messages within one chat
    pub async fn unread_admin_authored_in(&self, chat_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM chat_messages
            WHERE chat_id = $1 AND is_admin AND NOT is_read
            "#,
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Read the admin presence record, creating the default offline row
    /// on first access
    pub async fn admin_status(&self) -> Result<AdminStatus> {
        sqlx::query("INSERT INTO admin_status (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT is_online, last_seen FROM admin_status WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(AdminStatus {
            is_online: row.get("is_online"),
            last_seen: row.get("last_seen"),
        })
    }

    /// Set the admin presence flag, touching last_seen
    pub async fn set_admin_status(&self, is_online: bool) -> Result<AdminStatus> {
        let row = sqlx::query(
            r#"
            INSERT INTO admin_status (id, is_online, last_seen)
            VALUES (1, $1, now())
            ON CONFLICT (id)
            DO UPDATE SET is_online = EXCLUDED.is_online, last_seen = EXCLUDED.last_seen
            RETURNING is_online, last_seen
            "#,
        )
        .bind(is_online)
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminStatus {
            is_online: row.get("is_online"),
            last_seen: row.get("last_seen"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::UserRepository;
    use crate::repositories::test_support::{test_pool, unique_suffix};
    use sqlx::PgPool;

    async fn make_user(pool: &PgPool, name: &str) -> i64 {
        let suffix = unique_suffix();
        let username = format!("{name}_{suffix}");
        UserRepository::new(pool.clone())
            .create(&username, &format!("{username}@example.com"), "hunter2abc")
            .await
            .expect("create user")
            .id
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn get_or_create_returns_one_chat_per_user() {
        let pool = test_pool().await;
        let repo = ChatRepository::new(pool.clone());
        let user = make_user(&pool, "chatter").await;

        let first = repo
            .get_or_create_admin_chat(user, "Support")
            .await
            .expect("create chat");
        let second = repo
            .get_or_create_admin_chat(user, "Other title")
            .await
            .expect("get chat");

        assert_eq!(first.id, second.id);
        // The existing title wins over later creation attempts
        assert_eq!(second.title.as_deref(), Some("Support"));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn messages_keep_order_and_mark_read_only_flips_the_other_side() {
        let pool = test_pool().await;
        let repo = ChatRepository::new(pool.clone());
        let user = make_user(&pool, "chatter").await;
        let admin = make_user(&pool, "support").await;

        let chat = repo
            .get_or_create_admin_chat(user, "Support")
            .await
            .expect("create chat");

        repo.add_message(chat.id, user, "hello", false)
            .await
            .expect("user message");
        repo.add_message(chat.id, admin, "hi there", true)
            .await
            .expect("admin message");
        repo.add_message(chat.id, user, "my task is stuck", false)
            .await
            .expect("user message");

        let messages = repo.messages(chat.id).await.expect("messages");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[2].content, "my task is stuck");
        assert!(messages.iter().all(|m| !m.is_read));

        // Admin marks user-authored messages read
        let marked = repo.mark_read(chat.id, false).await.expect("mark read");
        assert_eq!(marked, 2);

        let messages = repo.messages(chat.id).await.expect("messages");
        assert!(messages.iter().filter(|m| !m.is_admin).all(|m| m.is_read));
        assert!(messages.iter().filter(|m| m.is_admin).all(|m| !m.is_read));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn unread_counts_track_user_authored_messages() {
        let pool = test_pool().await;
        let repo = ChatRepository::new(pool.clone());
        let user = make_user(&pool, "chatter").await;

        let chat = repo
            .get_or_create_admin_chat(user, "Support")
            .await
            .expect("create chat");
        repo.add_message(chat.id, user, "anyone there?", false)
            .await
            .expect("user message");

        let total = repo
            .unread_user_authored_total()
            .await
            .expect("total unread");
        assert!(total >= 1);

        assert_eq!(
            repo.unread_admin_authored_in(chat.id)
                .await
                .expect("unread admin"),
            0
        );
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn admin_status_is_lazily_created_and_updatable() {
        let pool = test_pool().await;
        let repo = ChatRepository::new(pool.clone());

        // First read lazily creates the singleton row
        repo.admin_status().await.expect("status");

        let updated = repo.set_admin_status(true).await.expect("set status");
        assert!(updated.is_online);
        assert!(repo.admin_status().await.expect("status").is_online);
    }
}
