//! Conversation and message model module.
//!
//! A conversation is a thread between two users, optionally tied to a
//! context such as an offer. Either participant may be `sender_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;
use crate::models::UserSummary;
use crate::utils::PageParams;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub related_type: Option<String>,
    pub related_id: Option<i64>,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: i64) -> i64 {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

/// A context only counts when both its kind and id are given.
pub fn thread_context(
    related_type: Option<&str>,
    related_id: Option<i64>,
) -> (Option<&str>, Option<i64>) {
    match (related_type, related_id) {
        (Some(kind), Some(id)) => (Some(kind), Some(id)),
        _ => (None, None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Message with its author's display fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MessageWithSender {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
    pub sender_role: String,
}

#[derive(Debug, FromRow)]
struct InboxRow {
    id: i64,
    related_type: Option<String>,
    related_id: Option<i64>,
    is_blocked: bool,
    other_id: i64,
    other_name: String,
    other_email: String,
    other_role: String,
    last_message: Option<String>,
    last_message_time: DateTime<Utc>,
    unread_count: i64,
}

/// One entry of a user's inbox.
#[derive(Debug, Clone, Serialize)]
pub struct InboxEntry {
    pub id: i64,
    pub other_user: UserSummary,
    pub last_message: Option<String>,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: i64,
    pub related_type: Option<String>,
    pub related_id: Option<i64>,
    pub is_blocked: bool,
}

impl From<InboxRow> for InboxEntry {
    fn from(row: InboxRow) -> Self {
        Self {
            id: row.id,
            other_user: UserSummary {
                id: row.other_id,
                name: row.other_name,
                email: row.other_email,
                role: row.other_role,
            },
            last_message: row.last_message,
            last_message_time: row.last_message_time,
            unread_count: row.unread_count,
            related_type: row.related_type,
            related_id: row.related_id,
            is_blocked: row.is_blocked,
        }
    }
}

/// Conversation as seen by moderators.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConversationOverview {
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub receiver_id: i64,
    pub receiver_name: String,
    pub related_type: Option<String>,
    pub related_id: Option<i64>,
    pub is_blocked: bool,
    pub messages_count: i64,
    pub last_message_time: DateTime<Utc>,
}

const CONVERSATION_COLUMNS: &str = "c.id, c.sender_id, c.receiver_id, c.related_type, \
     c.related_id, c.is_blocked, c.created_at, c.updated_at";

const MESSAGE_COLUMNS: &str = "m.id, m.conversation_id, m.sender_id, m.receiver_id, m.content, \
     m.read_at, m.created_at, m.updated_at";

const OVERVIEW_FILTER: &str = r"
    FROM conversations c
    JOIN users su ON su.id = c.sender_id
    JOIN users ru ON ru.id = c.receiver_id
    WHERE ($1::TEXT IS NULL OR su.name ILIKE $1 OR ru.name ILIKE $1)
";

/// Conversation repository for database operations.
pub struct ConversationRepository;

impl ConversationRepository {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(conversation)
    }

    /// Finds the thread between two users in either direction.
    ///
    /// The context only narrows the search when both parts are given.
    pub async fn find_between(
        pool: &PgPool,
        user_a: i64,
        user_b: i64,
        related_type: Option<&str>,
        related_id: Option<i64>,
    ) -> AppResult<Option<Conversation>> {
        let (related_type, related_id) = thread_context(related_type, related_id);

        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r"
            SELECT {CONVERSATION_COLUMNS} FROM conversations c
            WHERE ((c.sender_id = $1 AND c.receiver_id = $2)
                OR (c.sender_id = $2 AND c.receiver_id = $1))
              AND ($3::TEXT IS NULL OR (c.related_type = $3 AND c.related_id = $4))
            ORDER BY c.id
            LIMIT 1
            "
        ))
        .bind(user_a)
        .bind(user_b)
        .bind(related_type)
        .bind(related_id)
        .fetch_optional(pool)
        .await?;

        Ok(conversation)
    }

    /// Inserts a thread, or returns `None` when an identical one already exists.
    pub async fn create(
        pool: &PgPool,
        sender_id: i64,
        receiver_id: i64,
        related_type: Option<&str>,
        related_id: Option<i64>,
        is_blocked: bool,
    ) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r"
            INSERT INTO conversations AS c
                (sender_id, receiver_id, related_type, related_id, is_blocked)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING {CONVERSATION_COLUMNS}
            "
        ))
        .bind(sender_id)
        .bind(receiver_id)
        .bind(related_type)
        .bind(related_id)
        .bind(is_blocked)
        .fetch_optional(pool)
        .await?;

        Ok(conversation)
    }

    /// Inbox of `user_id`, most recent activity first.
    pub async fn inbox(pool: &PgPool, user_id: i64) -> AppResult<Vec<InboxEntry>> {
        let rows = sqlx::query_as::<_, InboxRow>(
            r"
            SELECT c.id, c.related_type, c.related_id, c.is_blocked,
                   ou.id AS other_id, ou.name AS other_name,
                   ou.email AS other_email, ou.role AS other_role,
                   lm.content AS last_message,
                   COALESCE(lm.created_at, c.created_at) AS last_message_time,
                   (SELECT COUNT(*) FROM messages um
                    WHERE um.conversation_id = c.id AND um.receiver_id = $1 AND um.read_at IS NULL
                   ) AS unread_count
            FROM conversations c
            JOIN users ou
              ON ou.id = CASE WHEN c.sender_id = $1 THEN c.receiver_id ELSE c.sender_id END
            LEFT JOIN LATERAL (
                SELECT m.content, m.created_at FROM messages m
                WHERE m.conversation_id = c.id
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT 1
            ) lm ON TRUE
            WHERE c.sender_id = $1 OR c.receiver_id = $1
            ORDER BY last_message_time DESC, c.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(InboxEntry::from).collect())
    }

    pub async fn touch(pool: &PgPool, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Sets the blocked flag on every thread between two users.
    pub async fn set_blocked_between(
        pool: &PgPool,
        user_a: i64,
        user_b: i64,
        is_blocked: bool,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE conversations SET is_blocked = $3, updated_at = NOW()
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ",
        )
        .bind(user_a)
        .bind(user_b)
        .bind(is_blocked)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// All threads for moderators, most recent activity first.
    pub async fn overview(
        pool: &PgPool,
        search: Option<&str>,
        page: PageParams,
    ) -> AppResult<(Vec<ConversationOverview>, i64)> {
        let (limit, offset) = page.limit_offset(15);
        let pattern = search.map(|s| format!("%{s}%"));

        let conversations = sqlx::query_as::<_, ConversationOverview>(&format!(
            r"
            SELECT c.id, c.sender_id, su.name AS sender_name,
                   c.receiver_id, ru.name AS receiver_name,
                   c.related_type, c.related_id, c.is_blocked,
                   (SELECT COUNT(*) FROM messages m
                    WHERE m.conversation_id = c.id) AS messages_count,
                   COALESCE(
                       (SELECT MAX(m.created_at) FROM messages m WHERE m.conversation_id = c.id),
                       c.created_at
                   ) AS last_message_time
            {OVERVIEW_FILTER}
            ORDER BY last_message_time DESC, c.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {OVERVIEW_FILTER}"))
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        Ok((conversations, total))
    }
}

/// Message repository for database operations.
pub struct MessageRepository;

impl MessageRepository {
    pub async fn create(
        pool: &PgPool,
        conversation_id: i64,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
    ) -> AppResult<Message> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r"
            INSERT INTO messages AS m (conversation_id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(conversation_id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(pool)
        .await?;

        Ok(message)
    }

    /// Messages of a thread, oldest first.
    pub async fn for_conversation(
        pool: &PgPool,
        conversation_id: i64,
    ) -> AppResult<Vec<MessageWithSender>> {
        let messages = sqlx::query_as::<_, MessageWithSender>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS}, u.name AS sender_name, u.role AS sender_role
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = $1
            ORDER BY m.created_at, m.id
            "
        ))
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;

        Ok(messages)
    }

    /// Marks what `receiver_id` received in a thread as read.
    pub async fn mark_read(
        pool: &PgPool,
        conversation_id: i64,
        receiver_id: i64,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE messages SET read_at = NOW(), updated_at = NOW()
            WHERE conversation_id = $1 AND receiver_id = $2 AND read_at IS NULL
            ",
        )
        .bind(conversation_id)
        .bind(receiver_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn unread_count(pool: &PgPool, receiver_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND read_at IS NULL",
        )
        .bind(receiver_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Every message exchanged by two users across all their threads, newest first.
    pub async fn between_users(
        pool: &PgPool,
        user_a: i64,
        user_b: i64,
        page: PageParams,
    ) -> AppResult<(Vec<MessageWithSender>, i64)> {
        let (limit, offset) = page.limit_offset(50);

        let messages = sqlx::query_as::<_, MessageWithSender>(&format!(
            r"
            SELECT {MESSAGE_COLUMNS}, u.name AS sender_name, u.role AS sender_role
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE (m.sender_id = $1 AND m.receiver_id = $2)
               OR (m.sender_id = $2 AND m.receiver_id = $1)
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(user_a)
        .bind(user_b)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(pool)
        .await?;

        Ok((messages, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation {
            id: 1,
            sender_id: 4,
            receiver_id: 8,
            related_type: Some("offer".to_string()),
            related_id: Some(12),
            is_blocked: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_participants() {
        let conversation = conversation();
        assert!(conversation.has_participant(4));
        assert!(conversation.has_participant(8));
        assert!(!conversation.has_participant(15));
    }

    #[test]
    fn test_other_participant_from_both_sides() {
        let conversation = conversation();
        assert_eq!(conversation.other_participant(4), 8);
        assert_eq!(conversation.other_participant(8), 4);
    }

    #[test]
    fn test_thread_context_needs_kind_and_id() {
        assert_eq!(thread_context(Some("offer"), Some(12)), (Some("offer"), Some(12)));
        assert_eq!(thread_context(Some("offer"), None), (None, None));
        assert_eq!(thread_context(None, Some(12)), (None, None));
        assert_eq!(thread_context(None, None), (None, None));
    }

    #[test]
    fn test_inbox_entry_nests_other_user() {
        let entry = InboxEntry::from(InboxRow {
            id: 3,
            related_type: None,
            related_id: None,
            is_blocked: true,
            other_id: 8,
            other_name: "Karim".to_string(),
            other_email: "karim@example.com".to_string(),
            other_role: "provider".to_string(),
            last_message: Some("Bonjour".to_string()),
            last_message_time: Utc::now(),
            unread_count: 2,
        });

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["other_user"]["id"], 8);
        assert_eq!(json["other_user"]["role"], "provider");
        assert_eq!(json["unread_count"], 2);
        assert_eq!(json["is_blocked"], true);
    }
}
