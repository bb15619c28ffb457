use super::{RepoResult, StoreError, UserRepository};
use crate::domain::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::PgPool;
use std::sync::Mutex;
use tracing::instrument;

const USER_COLUMNS: &str = "id, name, email, role_id, status, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            role_id: row.role_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// In-memory user store, insertion ordered. Enforces the unique-email rule of
/// the `users` table but not the role foreign key.
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn email_taken(users: &[User], email: &str, except_id: &str) -> bool {
        users.iter().any(|u| u.email == email && u.id != except_id)
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new(vec![])
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.lock().clone())
    }

    async fn find_by_id(&self, user_id: &str) -> RepoResult<Option<User>> {
        Ok(self.lock().iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: User) -> RepoResult<User> {
        let mut users = self.lock();
        if Self::email_taken(&users, &user.email, &user.id) {
            return Err(StoreError::Conflict(format!(
                "User with email {} already exists",
                user.email
            )));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> RepoResult<User> {
        let mut users = self.lock();
        if Self::email_taken(&users, &user.email, &user.id) {
            return Err(StoreError::Conflict(format!(
                "User with email {} already exists",
                user.email
            )));
        }
        let stored = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: user.id.clone(),
            })?;
        *stored = user.clone();
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: &str) -> RepoResult<bool> {
        let mut users = self.lock();
        let before = users.len();
        users.retain(|u| u.id != user_id);
        Ok(users.len() != before)
    }

    async fn exists_with_role(&self, role_id: &str) -> RepoResult<bool> {
        Ok(self.lock().iter().any(|u| u.has_role(role_id)))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self))]
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn create_user(&self, user: User) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, name, email, role_id, status) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role_id)
        .bind(&user.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = $1, email = $2, role_id = $3, status = $4, updated_at = NOW() \
             WHERE id = $5 RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role_id)
        .bind(&user.status)
        .bind(&user.id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::from).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user.id.clone(),
        })
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn exists_with_role(&self, role_id: &str) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE role_id = $1)",
        )
        .bind(role_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, role_id: &str) -> User {
        User::new("Test".to_string(), email.to_string(), role_id.to_string(), None)
    }

    #[tokio::test]
    async fn test_in_memory_user_repository_unique_email() {
        let repo = InMemoryUserRepository::default();
        repo.create_user(user("a@example.com", "r1")).await.unwrap();

        let result = repo.create_user(user("a@example.com", "r1")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_in_memory_user_repository_update_and_find() {
        let repo = InMemoryUserRepository::default();
        let mut created = repo.create_user(user("a@example.com", "r1")).await.unwrap();

        created.role_id = "r2".to_string();
        repo.update_user(&created).await.unwrap();

        let found = repo.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.role_id, "r2");
        assert!(repo.exists_with_role("r2").await.unwrap());
        assert!(!repo.exists_with_role("r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_in_memory_user_repository_update_email_collision() {
        let repo = InMemoryUserRepository::default();
        repo.create_user(user("a@example.com", "r1")).await.unwrap();
        let mut other = repo.create_user(user("b@example.com", "r1")).await.unwrap();

        other.email = "a@example.com".to_string();
        let result = repo.update_user(&other).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_in_memory_user_repository_delete() {
        let repo = InMemoryUserRepository::default();
        let created = repo.create_user(user("a@example.com", "r1")).await.unwrap();

        assert!(repo.delete_user(&created.id).await.unwrap());
        assert!(!repo.delete_user(&created.id).await.unwrap());
        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
    }
}
