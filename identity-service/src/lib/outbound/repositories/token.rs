use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::auth::models::AuthToken;
use crate::domain::auth::models::TokenId;
use crate::domain::auth::models::TokenType;
use crate::domain::auth::ports::TokenLedger;
use crate::domain::errors::RepositoryError;
use crate::user::models::UserId;

const SELECT_TOKEN: &str = r#"
    SELECT id, user_id, token, token_type, issued_at, expires_at,
           used_at, revoked_at, ip_address, user_agent
    FROM auth_tokens
"#;

/// Token ledger backed by the auth_tokens table.
///
/// State transitions are single conditional UPDATEs so two concurrent
/// presentations of the same token race on the database row, and exactly one
/// observes `rows_affected == 1`.
pub struct PostgresTokenLedger {
    pool: PgPool,
}

impl PostgresTokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    user_id: Uuid,
    token: String,
    token_type: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl TryFrom<TokenRow> for AuthToken {
    type Error = RepositoryError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let token_type = TokenType::parse(&row.token_type).ok_or_else(|| {
            RepositoryError::Database(format!("Corrupt token row: unknown type {}", row.token_type))
        })?;

        Ok(AuthToken {
            id: TokenId(row.id),
            user_id: UserId(row.user_id),
            token: row.token,
            token_type,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            used_at: row.used_at,
            revoked_at: row.revoked_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
        })
    }
}

#[async_trait]
impl TokenLedger for PostgresTokenLedger {
    async fn save(&self, token: AuthToken) -> Result<AuthToken, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (id, user_id, token, token_type, issued_at,
                                     expires_at, used_at, revoked_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(token.id.0)
        .bind(token.user_id.0)
        .bind(&token.token)
        .bind(token.token_type.as_str())
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(token.revoked_at)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    async fn find_by_token(&self, value: &str) -> Result<Option<AuthToken>, RepositoryError> {
        let query = format!("{} WHERE token = $1", SELECT_TOKEN);
        let row: Option<TokenRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AuthToken::try_from).transpose()
    }

    async fn find_valid_by_user_and_type(
        &self,
        user_id: &UserId,
        token_type: TokenType,
    ) -> Result<Vec<AuthToken>, RepositoryError> {
        let query = format!(
            "{} WHERE user_id = $1 AND token_type = $2 \
             AND used_at IS NULL AND revoked_at IS NULL AND expires_at > now() \
             ORDER BY issued_at DESC",
            SELECT_TOKEN
        );
        let rows: Vec<TokenRow> = sqlx::query_as(&query)
            .bind(user_id.0)
            .bind(token_type.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AuthToken::try_from).collect()
    }

    async fn mark_token_as_used(&self, id: &TokenId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET used_at = now()
            WHERE id = $1 AND used_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_token(&self, id: &TokenId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked_at = now()
            WHERE id = $1 AND used_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_user_tokens(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked_at = now()
            WHERE user_id = $1 AND used_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn revoke_user_tokens_by_type(
        &self,
        user_id: &UserId,
        token_type: TokenType,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked_at = now()
            WHERE user_id = $1 AND token_type = $2
              AND used_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(user_id.0)
        .bind(token_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn cleanup_expired_tokens(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_all_for_user(&self, user_id: &UserId) -> Result<Vec<AuthToken>, RepositoryError> {
        let query = format!("{} WHERE user_id = $1 ORDER BY issued_at DESC", SELECT_TOKEN);
        let rows: Vec<TokenRow> = sqlx::query_as(&query)
            .bind(user_id.0)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AuthToken::try_from).collect()
    }

    async fn delete_used_tokens_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM auth_tokens WHERE used_at IS NOT NULL AND used_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
