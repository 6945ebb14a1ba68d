use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::MySqlStore;
use crate::model::user::{NewUser, RefreshTokenRecord, User};
use crate::repository::{RepoResult, UserRepository};

#[async_trait]
impl UserRepository for MySqlStore {
    async fn insert(&self, user: &NewUser) -> RepoResult<u64> {
        let result = sqlx::query(
            "INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)",
        )
        .bind(user.username.to_lowercase())
        .bind(&user.password_hash)
        .bind(user.role.id())
        .bind(user.employee_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password, role_id, employee_id, is_active
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username.to_lowercase())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn exists(&self, username: &str) -> RepoResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
        )
        .bind(username.to_lowercase())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn touch_last_login(&self, user_id: u64) -> RepoResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> RepoResult<Option<RefreshTokenRecord>> {
        Ok(sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn revoke_refresh_token(&self, jti: &str) -> RepoResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
