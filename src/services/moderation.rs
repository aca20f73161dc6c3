use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::{
    card::Card,
    institution::Institution,
    request::{ModerationRequest, RequestStatus, Subject},
};

/// Administrator verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

/// The moderation queue: pending requests, newest submission first.
pub async fn list_pending_requests(pool: &SqlitePool) -> Result<Vec<ModerationRequest>> {
    Ok(ModerationRequest::list_pending(pool).await?)
}

/// Resolves a pending request. Resolution is terminal; a request that has
/// already been resolved cannot change status again.
///
/// Approval flips the subject entity's `approved` flag and stamps its
/// approval time in the same transaction. If the subject row was deleted
/// in the meantime the whole resolution rolls back with `NotFound` and the
/// request stays pending, rather than silently approving a ticket that
/// points at nothing.
///
/// Rejection stores an HTML-escaped administrator comment and touches no
/// downstream entity.
pub async fn resolve_request(
    pool: &SqlitePool,
    request_id: i64,
    decision: Decision,
    comment: Option<&str>,
) -> Result<ModerationRequest> {
    let mut tx = pool.begin().await?;

    let request = ModerationRequest::find_by_id(&mut *tx, request_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if request.status != RequestStatus::Pending {
        return Err(AppError::Validation(
            "request has already been resolved".to_string(),
        ));
    }

    let now = Utc::now();

    let resolved = match decision {
        Decision::Approved => {
            let updated = match request.subject {
                Subject::Institution(id) => Institution::mark_approved(&mut *tx, id, now).await?,
                Subject::Card(id) => Card::mark_approved(&mut *tx, id, now).await?,
            };
            if updated == 0 {
                // Subject deleted out from under the request; leave it pending.
                return Err(AppError::NotFound);
            }
            ModerationRequest::mark_approved(&mut *tx, request.id, now).await?
        }
        Decision::Rejected => {
            let sanitized = comment.map(|c| html_escape::encode_text(c).into_owned());
            ModerationRequest::mark_rejected(&mut *tx, request.id, now, sanitized.as_deref())
                .await?
        }
    };

    tx.commit().await?;

    tracing::info!(
        request_id = resolved.id,
        status = ?resolved.status,
        "moderation request resolved"
    );

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::card::{CardCategory, CardInput};
    use crate::services::listings;
    use crate::services::registration::{register_institution, RegistrationInput};

    fn registration(email: &str) -> RegistrationInput {
        RegistrationInput {
            email: email.to_string(),
            password: "secret-pw".to_string(),
            confirm_password: "secret-pw".to_string(),
            contact_name: "Ana Torres".to_string(),
            institution_name: "Test Bank".to_string(),
            phone: "555-0100".to_string(),
            website: None,
            description: None,
            logo_url: None,
        }
    }

    fn card_input(name: &str) -> CardInput {
        CardInput {
            name: name.to_string(),
            category: CardCategory::Classic,
            cat_pct: 30.0,
            annual_fee: 550.0,
            min_age: 21,
            benefits: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn approving_institution_request_flips_the_flag() {
        let pool = db::in_memory_pool().await.unwrap();
        let (_, institution, request) =
            register_institution(&pool, registration("bank@example.com"))
                .await
                .unwrap();

        let resolved = resolve_request(&pool, request.id, Decision::Approved, None)
            .await
            .unwrap();

        assert_eq!(resolved.status, RequestStatus::Approved);
        assert!(resolved.responded_at.unwrap() >= resolved.submitted_at);

        let institution = Institution::find_by_id(&pool, institution.id)
            .await
            .unwrap()
            .unwrap();
        assert!(institution.approved);
        assert!(institution.approved_at.is_some());
    }

    #[tokio::test]
    async fn rejection_stores_escaped_comment_and_touches_nothing() {
        let pool = db::in_memory_pool().await.unwrap();
        let (_, institution, request) =
            register_institution(&pool, registration("bank@example.com"))
                .await
                .unwrap();

        let resolved = resolve_request(
            &pool,
            request.id,
            Decision::Rejected,
            Some("<script>alert(1)</script> incomplete paperwork"),
        )
        .await
        .unwrap();

        assert_eq!(resolved.status, RequestStatus::Rejected);
        let comment = resolved.admin_comment.unwrap();
        assert!(!comment.contains("<script>"));
        assert!(comment.contains("incomplete paperwork"));

        let institution = Institution::find_by_id(&pool, institution.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!institution.approved);
    }

    #[tokio::test]
    async fn resolution_is_terminal() {
        let pool = db::in_memory_pool().await.unwrap();
        let (_, _, request) = register_institution(&pool, registration("bank@example.com"))
            .await
            .unwrap();

        resolve_request(&pool, request.id, Decision::Approved, None)
            .await
            .unwrap();

        let again = resolve_request(&pool, request.id, Decision::Rejected, None).await;
        assert!(matches!(again, Err(AppError::Validation(_))));

        let request = ModerationRequest::find_by_id(&pool, request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let pool = db::in_memory_pool().await.unwrap();
        let result = resolve_request(&pool, 4242, Decision::Approved, None).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn approving_a_deleted_subject_leaves_the_request_pending() {
        let pool = db::in_memory_pool().await.unwrap();
        let (_, institution, request) =
            register_institution(&pool, registration("bank@example.com"))
                .await
                .unwrap();
        resolve_request(&pool, request.id, Decision::Approved, None)
            .await
            .unwrap();

        let (card, card_request) = listings::submit_card(&pool, institution.id, card_input("Card"))
            .await
            .unwrap();

        // Delete the card out from under its pending request.
        sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(card.id)
            .execute(&pool)
            .await
            .unwrap();

        let result = resolve_request(&pool, card_request.id, Decision::Approved, None).await;
        assert!(matches!(result, Err(AppError::NotFound)));

        let request = ModerationRequest::find_by_id(&pool, card_request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.responded_at.is_none());
    }

    #[tokio::test]
    async fn queue_lists_newest_first() {
        let pool = db::in_memory_pool().await.unwrap();
        let (_, _, first) = register_institution(&pool, registration("a@example.com"))
            .await
            .unwrap();
        let (_, _, second) = register_institution(&pool, registration("b@example.com"))
            .await
            .unwrap();

        let queue = list_pending_requests(&pool).await.unwrap();
        let ids: Vec<i64> = queue.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
