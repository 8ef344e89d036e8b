use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::errors::RepositoryError;
use crate::user::models::EmailAddress;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::models::Username;
use crate::user::ports::UserRepository;

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.password_hash, u.password_salt,
           u.created_at, u.last_login_at, u.active, u.first_name, u.last_name,
           COALESCE(
               array_agg(ur.role_id) FILTER (WHERE ur.role_id IS NOT NULL),
               '{}'
           ) AS role_ids
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
"#;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    password_salt: String,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    active: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    role_ids: Vec<String>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            username: Username::new(row.username)
                .map_err(|e| RepositoryError::Database(format!("Corrupt user row: {}", e)))?,
            email: EmailAddress::new(row.email)
                .map_err(|e| RepositoryError::Database(format!("Corrupt user row: {}", e)))?,
            password_hash: row.password_hash,
            password_salt: row.password_salt,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
            active: row.active,
            first_name: row.first_name,
            last_name: row.last_name,
            role_ids: row.role_ids,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, password_salt,
                               created_at, last_login_at, active, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .bind(user.created_at)
        .bind(user.last_login_at)
        .bind(user.active)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let query = format!("{} WHERE u.id = $1 GROUP BY u.id", SELECT_USER);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let query = format!("{} WHERE u.username = $1 GROUP BY u.id", SELECT_USER);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let query = format!("{} WHERE u.email = $1 GROUP BY u.id", SELECT_USER);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn exists_by_username(&self, username: &Username) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, password_salt = $5,
                last_login_at = $6, active = $7, first_name = $8, last_name = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .bind(user.last_login_at)
        .bind(user.active)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn deactivate(&self, id: &UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE id = $1 AND active")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
