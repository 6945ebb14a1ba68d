use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::MySqlStore;
use crate::model::calendar::{CalendarCredentials, EventLink, EventSource};
use crate::repository::{CredentialRepository, EventLinkRepository, RepoResult};

#[async_trait]
impl CredentialRepository for MySqlStore {
    async fn upsert(&self, credentials: &CalendarCredentials) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO calendar_credentials
                (employee_id, token, refresh_token, token_uri, client_id, client_secret, scopes, expiry)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                token = VALUES(token),
                refresh_token = VALUES(refresh_token),
                token_uri = VALUES(token_uri),
                client_id = VALUES(client_id),
                client_secret = VALUES(client_secret),
                scopes = VALUES(scopes),
                expiry = VALUES(expiry),
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(credentials.employee_id)
        .bind(&credentials.token)
        .bind(&credentials.refresh_token)
        .bind(&credentials.token_uri)
        .bind(&credentials.client_id)
        .bind(&credentials.client_secret)
        .bind(&credentials.scopes)
        .bind(credentials.expiry)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, employee_id: u64) -> RepoResult<Option<CalendarCredentials>> {
        Ok(sqlx::query_as::<_, CalendarCredentials>(
            r#"
            SELECT employee_id, token, refresh_token, token_uri, client_id, client_secret, scopes, expiry
            FROM calendar_credentials
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_token(
        &self,
        employee_id: u64,
        token: &str,
        expiry: Option<DateTime<Utc>>,
    ) -> RepoResult<()> {
        sqlx::query(
            "UPDATE calendar_credentials SET token = ?, expiry = ? WHERE employee_id = ?",
        )
        .bind(token)
        .bind(expiry)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, employee_id: u64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM calendar_credentials WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EventLinkRepository for MySqlStore {
    async fn record(&self, link: &EventLink) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO calendar_event_links (employee_id, source_kind, source_id, event_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(link.employee_id)
        .bind(link.source_kind)
        .bind(link.source_id)
        .bind(&link.event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, employee_id: u64, source: EventSource) -> RepoResult<Vec<EventLink>> {
        Ok(sqlx::query_as::<_, EventLink>(
            r#"
            SELECT employee_id, source_kind, source_id, event_id
            FROM calendar_event_links
            WHERE employee_id = ? AND source_kind = ? AND source_id = ?
            "#,
        )
        .bind(employee_id)
        .bind(source.kind)
        .bind(source.id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn remove(&self, employee_id: u64, event_id: &str) -> RepoResult<()> {
        sqlx::query("DELETE FROM calendar_event_links WHERE employee_id = ? AND event_id = ?")
            .bind(employee_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
