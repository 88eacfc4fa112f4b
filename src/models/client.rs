//! Client profile model module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::AppResult;

/// Client profile row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub user_id: i64,
    /// `individual` or `company`.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub client_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client repository for database operations.
pub struct ClientRepository;

impl ClientRepository {
    pub async fn find_by_user_id(pool: &PgPool, user_id: i64) -> AppResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, user_id, type, created_at, updated_at FROM clients WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(client)
    }

    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: i64,
        client_type: Option<&str>,
    ) -> AppResult<Client> {
        let client = sqlx::query_as::<_, Client>(
            r"
            INSERT INTO clients (user_id, type) VALUES ($1, $2)
            RETURNING id, user_id, type, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(client_type)
        .fetch_one(executor)
        .await?;

        Ok(client)
    }

    /// Sets the client type, creating the profile when missing.
    pub async fn upsert_type(
        pool: &PgPool,
        user_id: i64,
        client_type: Option<&str>,
    ) -> AppResult<Client> {
        let client = sqlx::query_as::<_, Client>(
            r"
            INSERT INTO clients (user_id, type) VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET type = COALESCE(EXCLUDED.type, clients.type), updated_at = NOW()
            RETURNING id, user_id, type, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(client_type)
        .fetch_one(pool)
        .await?;

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_type_serializes_as_type() {
        let client = Client {
            id: 3,
            user_id: 9,
            client_type: Some("company".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["type"], "company");
        assert!(json.get("client_type").is_none());
    }
}
