use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Product category a card is marketed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CardCategory {
    Student,
    Young,
    Classic,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Card {
    pub id: i64,
    pub institution_id: i64,
    pub name: String,
    pub category: CardCategory,
    /// Annual cost of credit, as a percentage.
    pub cat_pct: f64,
    pub annual_fee: f64,
    pub min_age: i64,
    pub benefits: Option<String>,
    pub image_url: Option<String>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Mutable card fields, shared by creation and edit.
#[derive(Debug, Clone, Deserialize)]
pub struct CardInput {
    pub name: String,
    pub category: CardCategory,
    pub cat_pct: f64,
    pub annual_fee: f64,
    pub min_age: i64,
    pub benefits: Option<String>,
    pub image_url: Option<String>,
}

impl Card {
    pub async fn create(
        db: impl SqliteExecutor<'_>,
        institution_id: i64,
        input: &CardInput,
    ) -> Result<Self, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO cards (
                institution_id, name, category, cat_pct, annual_fee,
                min_age, benefits, image_url, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(&input.name)
        .bind(input.category)
        .bind(input.cat_pct)
        .bind(input.annual_fee)
        .bind(input.min_age)
        .bind(&input.benefits)
        .bind(&input.image_url)
        .bind(Utc::now())
        .fetch_one(db)
        .await?;

        Ok(card)
    }

    /// Finds a card by id scoped to its owning institution. A card owned by
    /// a different institution is indistinguishable from a missing one.
    pub async fn find_owned(
        db: impl SqliteExecutor<'_>,
        id: i64,
        institution_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards WHERE id = $1 AND institution_id = $2
            "#,
        )
        .bind(id)
        .bind(institution_id)
        .fetch_optional(db)
        .await?;

        Ok(card)
    }

    /// Overwrites all mutable fields and drops the approval flag; the card
    /// stays invisible in the catalog until moderated again.
    pub async fn update_owned(
        db: impl SqliteExecutor<'_>,
        id: i64,
        institution_id: i64,
        input: &CardInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            UPDATE cards
            SET name = $3, category = $4, cat_pct = $5, annual_fee = $6,
                min_age = $7, benefits = $8, image_url = $9,
                approved = FALSE, approved_at = NULL
            WHERE id = $1 AND institution_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(institution_id)
        .bind(&input.name)
        .bind(input.category)
        .bind(input.cat_pct)
        .bind(input.annual_fee)
        .bind(input.min_age)
        .bind(&input.benefits)
        .bind(&input.image_url)
        .fetch_optional(db)
        .await?;

        Ok(card)
    }

    pub async fn mark_approved(
        db: impl SqliteExecutor<'_>,
        id: i64,
        approved_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE cards
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

    pub async fn list_by_institution(
        db: impl SqliteExecutor<'_>,
        institution_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let cards = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards WHERE institution_id = $1 ORDER BY id
            "#,
        )
        .bind(institution_id)
        .fetch_all(db)
        .await?;

        Ok(cards)
    }

    pub async fn list_all(db: impl SqliteExecutor<'_>) -> Result<Vec<Self>, sqlx::Error> {
        let cards = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;

        Ok(cards)
    }

    /// All approved cards, in insertion order.
    pub async fn list_approved(db: impl SqliteExecutor<'_>) -> Result<Vec<Self>, sqlx::Error> {
        let cards = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards WHERE approved = TRUE ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;

        Ok(cards)
    }

    /// Approved cards of a category open to an applicant of the given age.
    pub async fn search_approved(
        db: impl SqliteExecutor<'_>,
        age: i64,
        category: CardCategory,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let cards = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards
            WHERE approved = TRUE AND category = $1 AND min_age <= $2
            ORDER BY id
            "#,
        )
        .bind(category)
        .bind(age)
        .fetch_all(db)
        .await?;

        Ok(cards)
    }

    pub async fn count_all(db: impl SqliteExecutor<'_>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cards")
            .fetch_one(db)
            .await
    }

    pub async fn count_unapproved(db: impl SqliteExecutor<'_>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE approved = FALSE")
            .fetch_one(db)
            .await
    }

    pub async fn count_approved_by_institution(
        db: impl SqliteExecutor<'_>,
        institution_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM cards WHERE institution_id = $1 AND approved = TRUE",
        )
        .bind(institution_id)
        .fetch_one(db)
        .await
    }

    pub async fn count_by_institution(
        db: impl SqliteExecutor<'_>,
        institution_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE institution_id = $1")
            .bind(institution_id)
            .fetch_one(db)
            .await
    }
}
