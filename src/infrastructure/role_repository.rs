use crate::domain::role::Role;
use crate::infrastructure::RepoResult;
use crate::infrastructure::RoleRepository;
use crate::infrastructure::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

const ROLE_COLUMNS: &str = "id, name, permissions, created_at, updated_at";

#[derive(Debug, FromRow)]
struct RoleRow {
    id: String,
    name: String,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            permissions: row.permissions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresRoleRepository {
    pub pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    #[instrument(skip(self))]
    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, role_id: &str) -> RepoResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
        ))
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Role::from))
    }

    #[instrument(skip(self), fields(count = role_ids.len()))]
    async fn find_by_ids(&self, role_ids: &[String]) -> RepoResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Role::from))
    }

    #[instrument(skip(self, role), fields(role_id = %role.id, name = %role.name))]
    async fn create_role(&self, role: Role) -> RepoResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "INSERT INTO roles (id, name, permissions) VALUES ($1, $2, $3) \
             RETURNING {ROLE_COLUMNS}"
        ))
        .bind(&role.id)
        .bind(&role.name)
        .bind(&role.permissions)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, role), fields(role_id = %role.id))]
    async fn update_role(&self, role: &Role) -> RepoResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "UPDATE roles SET name = $1, permissions = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING {ROLE_COLUMNS}"
        ))
        .bind(&role.name)
        .bind(&role.permissions)
        .bind(&role.id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Role::from).ok_or_else(|| StoreError::NotFound {
            entity: "role",
            id: role.id.clone(),
        })
    }

    #[instrument(skip(self))]
    async fn delete_role(&self, role_id: &str) -> RepoResult<bool> {
        // users.role_id is ON DELETE RESTRICT; a concurrent assignment
        // surfaces here as a conflict rather than a dangling user.
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
