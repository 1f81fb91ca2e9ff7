//! Category Resolver
//!
//! Maps (user, name, type) to a category, creating it on first use.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::{Category, CategoryType, User};
use crate::error::{LedgerError, LedgerResult};

use super::{classify_insert_error, normalize_name};

type CategoryRow = (i64, i64, String, String, DateTime<Utc>);

fn category_from_row(
    (id, user_id, name, category_type, created_at): CategoryRow,
) -> LedgerResult<Category> {
    let category_type = category_type
        .parse::<CategoryType>()
        .map_err(|e| LedgerError::Internal(format!("category {}: {}", id, e)))?;

    Ok(Category {
        id,
        user_id,
        name,
        category_type,
        created_at,
    })
}

/// Resolver and repository for the categories relation
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    pool: PgPool,
}

impl CategoryResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up the category for the triple, creating it if none exists
    pub async fn resolve(
        &self,
        user: &User,
        name: &str,
        category_type: CategoryType,
    ) -> LedgerResult<Category> {
        let mut conn = self.pool.acquire().await?;
        Self::resolve_in(&mut *conn, user.id, name, category_type).await
    }

    /// Create a category; fails with `Conflict` if the triple already exists
    pub async fn create(
        &self,
        user: &User,
        name: &str,
        category_type: CategoryType,
    ) -> LedgerResult<Category> {
        let name = normalize_name("category", name)?;

        let row: CategoryRow = sqlx::query_as(
            r#"
            INSERT INTO categories (user_id, name, type)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, type, created_at
            "#,
        )
        .bind(user.id)
        .bind(name)
        .bind(category_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify_insert_error(e, || {
                format!("category {:?} ({}) already exists", name, category_type)
            })
        })?;

        let category = category_from_row(row)?;
        tracing::info!(
            user_id = user.id,
            category_id = category.id,
            category = %category.name,
            category_type = %category.category_type,
            "Category created"
        );
        Ok(category)
    }

    /// All categories of a user
    pub async fn list_for_user(&self, user: &User) -> LedgerResult<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, type, created_at
            FROM categories
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(category_from_row).collect()
    }

    /// Resolve on the given connection.
    ///
    /// A racing creator of the same triple does not fail this call: the insert
    /// yields to the committed row and the re-read returns it. Only when the
    /// row is still invisible afterwards does this fail with `Conflict`, and
    /// the caller may retry by resolving again.
    pub(crate) async fn resolve_in(
        conn: &mut PgConnection,
        user_id: i64,
        name: &str,
        category_type: CategoryType,
    ) -> LedgerResult<Category> {
        let name = normalize_name("category", name)?;

        if let Some(existing) = Self::find_in(&mut *conn, user_id, name, category_type).await? {
            return Ok(existing);
        }

        let created: Option<CategoryRow> = sqlx::query_as(
            r#"
            INSERT INTO categories (user_id, name, type)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, name, type) DO NOTHING
            RETURNING id, user_id, name, type, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(category_type.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(row) = created {
            let category = category_from_row(row)?;
            tracing::debug!(
                user_id,
                category_id = category.id,
                category = %category.name,
                category_type = %category.category_type,
                "Category created on first use"
            );
            return Ok(category);
        }

        Self::find_in(&mut *conn, user_id, name, category_type)
            .await?
            .ok_or_else(|| {
                LedgerError::Conflict(format!(
                    "category {:?} ({}) was created concurrently",
                    name, category_type
                ))
            })
    }

    /// Re-read a category by id within the user's scope
    pub(crate) async fn get_in(
        conn: &mut PgConnection,
        user_id: i64,
        category_id: i64,
    ) -> LedgerResult<Category> {
        let row: Option<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, type, created_at
            FROM categories
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        row.map(category_from_row)
            .transpose()?
            .ok_or_else(|| LedgerError::NotFound(format!("category {} not found", category_id)))
    }

    async fn find_in(
        conn: &mut PgConnection,
        user_id: i64,
        name: &str,
        category_type: CategoryType,
    ) -> LedgerResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, type, created_at
            FROM categories
            WHERE user_id = $1 AND name = $2 AND type = $3
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(category_type.as_str())
        .fetch_optional(conn)
        .await?;

        row.map(category_from_row).transpose()
    }
}
