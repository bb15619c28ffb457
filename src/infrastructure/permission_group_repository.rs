use crate::domain::permission_group::{
    ItemRemoval, ItemUpdate, MergeOutcome, NewPermissionItem, PermissionGroup, PermissionItem,
};
use crate::infrastructure::{RepoResult, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

/// Storage for permission groups.
///
/// Every mutating method is a single atomic operation on the store side: the
/// group is read, changed and written back without another writer observing
/// or overwriting the intermediate state.
#[async_trait]
pub trait PermissionGroupRepository: Send + Sync {
    async fn list_groups(&self) -> RepoResult<Vec<PermissionGroup>>;
    /// Creates the group if unseen, otherwise appends items whose name is free.
    async fn merge_items(
        &self,
        group_name: &str,
        items: Vec<NewPermissionItem>,
    ) -> RepoResult<MergeOutcome>;
    async fn update_item(
        &self,
        group_id: &str,
        item_id: &str,
        name: String,
        description: Option<String>,
    ) -> RepoResult<ItemUpdate>;
    /// Removes an item and deletes the group when it becomes empty.
    async fn delete_item(&self, group_id: &str, item_id: &str) -> RepoResult<ItemRemoval>;
    /// Every group holding at least one of the given item ids, in one query.
    async fn find_by_item_ids(&self, item_ids: &[String]) -> RepoResult<Vec<PermissionGroup>>;
}

const GROUP_COLUMNS: &str = "id, group_name, items, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PermissionGroupRow {
    id: String,
    group_name: String,
    items: Json<Vec<PermissionItem>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PermissionGroupRow> for PermissionGroup {
    fn from(row: PermissionGroupRow) -> Self {
        PermissionGroup {
            id: row.id,
            group_name: row.group_name,
            items: row.items.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row returned by the merge upsert; `created` is false when the group existed.
#[derive(Debug, FromRow)]
struct UpsertedGroupRow {
    #[sqlx(flatten)]
    group: PermissionGroupRow,
    created: bool,
}

#[derive(Debug, Clone)]
pub struct PostgresPermissionGroupRepository {
    pub pool: PgPool,
}

impl PostgresPermissionGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads a group by id and holds its row lock until the transaction ends.
    async fn lock_group(
        tx: &mut Transaction<'_, Postgres>,
        group_id: &str,
    ) -> RepoResult<PermissionGroup> {
        let row = sqlx::query_as::<_, PermissionGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM permission_groups WHERE id = $1 FOR UPDATE"
        ))
        .bind(group_id)
        .fetch_optional(&mut **tx)
        .await?;
        row.map(PermissionGroup::from)
            .ok_or_else(|| StoreError::NotFound {
                entity: "permission group",
                id: group_id.to_string(),
            })
    }

    async fn write_items(
        tx: &mut Transaction<'_, Postgres>,
        group: &PermissionGroup,
    ) -> RepoResult<PermissionGroup> {
        let row = sqlx::query_as::<_, PermissionGroupRow>(&format!(
            "UPDATE permission_groups SET items = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING {GROUP_COLUMNS}"
        ))
        .bind(Json(&group.items))
        .bind(&group.id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl PermissionGroupRepository for PostgresPermissionGroupRepository {
    #[instrument(skip(self))]
    async fn list_groups(&self) -> RepoResult<Vec<PermissionGroup>> {
        let rows = sqlx::query_as::<_, PermissionGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM permission_groups ORDER BY group_name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PermissionGroup::from).collect())
    }

    #[instrument(skip(self, items), fields(incoming = items.len()))]
    async fn merge_items(
        &self,
        group_name: &str,
        items: Vec<NewPermissionItem>,
    ) -> RepoResult<MergeOutcome> {
        let mut tx = self.pool.begin().await?;

        // Creates the group or takes its row lock in a single statement.
        let row = sqlx::query_as::<_, UpsertedGroupRow>(&format!(
            "INSERT INTO permission_groups (id, group_name, items) \
             VALUES ($1, $2, '[]'::jsonb) \
             ON CONFLICT (group_name) DO UPDATE SET group_name = EXCLUDED.group_name \
             RETURNING {GROUP_COLUMNS}, (xmax = 0) AS created"
        ))
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(group_name)
        .fetch_one(&mut *tx)
        .await?;
        let created = row.created;
        let mut group = PermissionGroup::from(row.group);

        let appended = group.merge_items(items);
        debug!(group_id = %group.id, appended, created, "Merged permission items");

        let group = if appended > 0 {
            Self::write_items(&mut tx, &group).await?
        } else {
            group
        };
        tx.commit().await?;

        Ok(MergeOutcome { group, created })
    }

    #[instrument(skip(self, description))]
    async fn update_item(
        &self,
        group_id: &str,
        item_id: &str,
        name: String,
        description: Option<String>,
    ) -> RepoResult<ItemUpdate> {
        let mut tx = self.pool.begin().await?;
        let mut group = Self::lock_group(&mut tx, group_id).await?;

        let item = group.update_item(item_id, name, description)?.clone();
        let group = Self::write_items(&mut tx, &group).await?;
        tx.commit().await?;

        Ok(ItemUpdate { group, item })
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, group_id: &str, item_id: &str) -> RepoResult<ItemRemoval> {
        let mut tx = self.pool.begin().await?;
        let mut group = Self::lock_group(&mut tx, group_id).await?;
        group.remove_item(item_id)?;

        let removal = if group.is_empty() {
            sqlx::query("DELETE FROM permission_groups WHERE id = $1")
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
            ItemRemoval {
                group_deleted: true,
                group: None,
            }
        } else {
            ItemRemoval {
                group_deleted: false,
                group: Some(Self::write_items(&mut tx, &group).await?),
            }
        };
        tx.commit().await?;

        Ok(removal)
    }

    #[instrument(skip(self, item_ids), fields(count = item_ids.len()))]
    async fn find_by_item_ids(&self, item_ids: &[String]) -> RepoResult<Vec<PermissionGroup>> {
        let rows = sqlx::query_as::<_, PermissionGroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM permission_groups \
             WHERE EXISTS ( \
                 SELECT 1 FROM jsonb_array_elements(items) AS item \
                 WHERE item->>'id' = ANY($1) \
             ) \
             ORDER BY group_name"
        ))
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PermissionGroup::from).collect())
    }
}

/// In-memory implementation for testing.
///
/// A single mutex guard spans each read-modify-write, which gives the same
/// atomicity as the row lock in the Postgres implementation. Batched lookups
/// are counted so tests can assert how many store queries a resolution costs.
#[derive(Debug, Default)]
pub struct InMemoryPermissionGroupRepository {
    groups: Mutex<Vec<PermissionGroup>>,
    item_lookups: AtomicUsize,
}

impl InMemoryPermissionGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_by_item_ids` calls served so far.
    pub fn item_lookup_count(&self) -> usize {
        self.item_lookups.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PermissionGroup>> {
        self.groups.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn group_mut<'a>(
        groups: &'a mut [PermissionGroup],
        group_id: &str,
    ) -> RepoResult<&'a mut PermissionGroup> {
        groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "permission group",
                id: group_id.to_string(),
            })
    }
}

#[async_trait]
impl PermissionGroupRepository for InMemoryPermissionGroupRepository {
    async fn list_groups(&self) -> RepoResult<Vec<PermissionGroup>> {
        let mut result = self.lock().clone();
        result.sort_by(|a, b| a.group_name.cmp(&b.group_name));
        Ok(result)
    }

    async fn merge_items(
        &self,
        group_name: &str,
        items: Vec<NewPermissionItem>,
    ) -> RepoResult<MergeOutcome> {
        let mut groups = self.lock();
        if let Some(group) = groups.iter_mut().find(|g| g.group_name == group_name) {
            group.merge_items(items);
            return Ok(MergeOutcome {
                group: group.clone(),
                created: false,
            });
        }

        let group = PermissionGroup::new(group_name.to_string(), items);
        groups.push(group.clone());
        Ok(MergeOutcome {
            group,
            created: true,
        })
    }

    async fn update_item(
        &self,
        group_id: &str,
        item_id: &str,
        name: String,
        description: Option<String>,
    ) -> RepoResult<ItemUpdate> {
        let mut groups = self.lock();
        let group = Self::group_mut(&mut groups, group_id)?;
        let item = group.update_item(item_id, name, description)?.clone();
        Ok(ItemUpdate {
            group: group.clone(),
            item,
        })
    }

    async fn delete_item(&self, group_id: &str, item_id: &str) -> RepoResult<ItemRemoval> {
        let mut groups = self.lock();
        let group = Self::group_mut(&mut groups, group_id)?;
        group.remove_item(item_id)?;

        if group.is_empty() {
            groups.retain(|g| g.id != group_id);
            return Ok(ItemRemoval {
                group_deleted: true,
                group: None,
            });
        }
        Ok(ItemRemoval {
            group_deleted: false,
            group: Some(group.clone()),
        })
    }

    async fn find_by_item_ids(&self, item_ids: &[String]) -> RepoResult<Vec<PermissionGroup>> {
        self.item_lookups.fetch_add(1, Ordering::SeqCst);
        let mut result: Vec<PermissionGroup> = self
            .lock()
            .iter()
            .filter(|g| item_ids.iter().any(|id| g.contains_item(id)))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.group_name.cmp(&b.group_name));
        Ok(result)
    }
}
