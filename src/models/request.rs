use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteExecutor};

/// The entity a moderation request refers to. Stored as a kind tag plus a
/// numeric id; surfaced as a sum type so an institution id can never be
/// dereferenced against the cards table or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    Institution(i64),
    Card(i64),
}

impl Subject {
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Institution(_) => "institution",
            Subject::Card(_) => "card",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Subject::Institution(id) | Subject::Card(id) => *id,
        }
    }

    fn from_parts(kind: &str, id: i64) -> Result<Self, String> {
        match kind {
            "institution" => Ok(Subject::Institution(id)),
            "card" => Ok(Subject::Card(id)),
            other => Err(format!("unknown subject kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A moderation ticket: one approve/reject decision over its subject.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationRequest {
    pub id: i64,
    pub institution_id: i64,
    pub subject: Subject,
    pub status: RequestStatus,
    pub admin_comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl FromRow<'_, SqliteRow> for ModerationRequest {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("subject_kind")?;
        let subject_id: i64 = row.try_get("subject_id")?;
        let subject =
            Subject::from_parts(&kind, subject_id).map_err(|e| sqlx::Error::ColumnDecode {
                index: "subject_kind".to_string(),
                source: e.into(),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            institution_id: row.try_get("institution_id")?,
            subject,
            status: row.try_get("status")?,
            admin_comment: row.try_get("admin_comment")?,
            submitted_at: row.try_get("submitted_at")?,
            responded_at: row.try_get("responded_at")?,
        })
    }
}

impl ModerationRequest {
    /// Opens a new pending request for a subject.
    pub async fn create(
        db: impl SqliteExecutor<'_>,
        institution_id: i64,
        subject: Subject,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO requests (institution_id, subject_kind, subject_id, status, submitted_at)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(subject.kind())
        .bind(subject.id())
        .bind(Utc::now())
        .fetch_one(db)
        .await?;

        Ok(request)
    }

    pub async fn find_by_id(
        db: impl SqliteExecutor<'_>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM requests WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

        Ok(request)
    }

    /// All pending requests, newest submission first.
    pub async fn list_pending(db: impl SqliteExecutor<'_>) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM requests
            WHERE status = 'pending'
            ORDER BY submitted_at DESC, id DESC
            "#,
        )
        .fetch_all(db)
        .await?;

        Ok(requests)
    }

    /// The open (pending) request for a subject, if one exists. The
    /// workflow keeps at most one per subject.
    pub async fn find_open_for_subject(
        db: impl SqliteExecutor<'_>,
        subject: Subject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM requests
            WHERE subject_kind = $1 AND subject_id = $2 AND status = 'pending'
            ORDER BY submitted_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(subject.kind())
        .bind(subject.id())
        .fetch_optional(db)
        .await?;

        Ok(request)
    }

    /// Re-stamps an open request's submission time, moving it to the top
    /// of the moderation queue.
    pub async fn touch_submission(
        db: impl SqliteExecutor<'_>,
        id: i64,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            UPDATE requests SET submitted_at = $2 WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(db)
        .await?;

        Ok(request)
    }

    pub async fn mark_approved(
        db: impl SqliteExecutor<'_>,
        id: i64,
        responded_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            UPDATE requests
            SET status = 'approved', responded_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(responded_at)
        .fetch_one(db)
        .await?;

        Ok(request)
    }

    pub async fn mark_rejected(
        db: impl SqliteExecutor<'_>,
        id: i64,
        responded_at: DateTime<Utc>,
        admin_comment: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            UPDATE requests
            SET status = 'rejected', responded_at = $2, admin_comment = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(responded_at)
        .bind(admin_comment)
        .fetch_one(db)
        .await?;

        Ok(request)
    }

    pub async fn list_for_subject(
        db: impl SqliteExecutor<'_>,
        subject: Subject,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM requests
            WHERE subject_kind = $1 AND subject_id = $2
            ORDER BY id
            "#,
        )
        .bind(subject.kind())
        .bind(subject.id())
        .fetch_all(db)
        .await?;

        Ok(requests)
    }

    pub async fn count_pending(db: impl SqliteExecutor<'_>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE status = 'pending'")
            .fetch_one(db)
            .await
    }

    pub async fn count_pending_by_institution(
        db: impl SqliteExecutor<'_>,
        institution_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM requests WHERE institution_id = $1 AND status = 'pending'",
        )
        .bind(institution_id)
        .fetch_one(db)
        .await
    }
}
