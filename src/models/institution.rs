use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Institution {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateInstitutionData {
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

impl Institution {
    /// Creates a new institution profile, unapproved until moderated.
    pub async fn create(
        db: impl SqliteExecutor<'_>,
        data: CreateInstitutionData,
    ) -> Result<Self, sqlx::Error> {
        let institution = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO institutions (user_id, name, phone, website, description, logo_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(&data.name)
        .bind(&data.phone)
        .bind(&data.website)
        .bind(&data.description)
        .bind(&data.logo_url)
        .fetch_one(db)
        .await?;

        Ok(institution)
    }

    pub async fn find_by_id(
        db: impl SqliteExecutor<'_>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let institution = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM institutions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        Ok(institution)
    }

    /// Finds the institution owned by a user. Each user owns at most one.
    pub async fn find_by_user_id(
        db: impl SqliteExecutor<'_>,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let institution = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM institutions WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;

        Ok(institution)
    }

    pub async fn list_all(db: impl SqliteExecutor<'_>) -> Result<Vec<Self>, sqlx::Error> {
        let institutions = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM institutions ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;

        Ok(institutions)
    }

    /// Marks an institution approved, stamping the approval time. Returns
    /// the number of rows updated (zero when the row no longer exists).
    pub async fn mark_approved(
        db: impl SqliteExecutor<'_>,
        id: i64,
        approved_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE institutions
            SET approved = TRUE, approved_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(approved_at)
        .execute(db)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_all(db: impl SqliteExecutor<'_>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM institutions")
            .fetch_one(db)
            .await
    }

    pub async fn count_unapproved(db: impl SqliteExecutor<'_>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM institutions WHERE approved = FALSE")
            .fetch_one(db)
            .await
    }
}
