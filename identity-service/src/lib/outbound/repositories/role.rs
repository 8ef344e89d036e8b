use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::errors::RepositoryError;
use crate::user::models::Role;
use crate::user::models::UserId;
use crate::user::ports::RoleRepository;

pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: String,
    name: String,
    permissions: Vec<String>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            permissions: row.permissions,
        }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn get_user_roles(&self, user_id: &UserId) -> Result<Vec<Role>, RepositoryError> {
        let rows: Vec<RoleRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.name, r.permissions
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.id
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn get_user_permissions(
        &self,
        user_id: &UserId,
    ) -> Result<BTreeSet<String>, RepositoryError> {
        let permissions: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT unnest(r.permissions)
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions.into_iter().collect())
    }

    async fn user_has_permission(
        &self,
        user_id: &UserId,
        permission: &str,
    ) -> Result<bool, RepositoryError> {
        let has: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM roles r
                JOIN user_roles ur ON ur.role_id = r.id
                WHERE ur.user_id = $1 AND $2 = ANY(r.permissions)
            )
            "#,
        )
        .bind(user_id.0)
        .bind(permission)
        .fetch_one(&self.pool)
        .await?;

        Ok(has)
    }

    async fn assign_role(&self, user_id: &UserId, role_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id.0)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_role(&self, user_id: &UserId, role_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id.0)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
