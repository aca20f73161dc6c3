use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{AppError, Result};
use crate::models::{
    card::{Card, CardInput},
    institution::Institution,
    request::{ModerationRequest, Subject},
};

fn validate(input: &CardInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("card name is required".to_string()));
    }
    if !input.cat_pct.is_finite() || input.cat_pct < 0.0 {
        return Err(AppError::Validation(
            "annual cost of credit must be a non-negative percentage".to_string(),
        ));
    }
    if !input.annual_fee.is_finite() || input.annual_fee < 0.0 {
        return Err(AppError::Validation(
            "annual fee must be non-negative".to_string(),
        ));
    }
    if !(18..=100).contains(&input.min_age) {
        return Err(AppError::Validation(
            "minimum age must be between 18 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Attaches a pending moderation request to a subject, keeping at most one
/// open request per subject: if one is already pending its submission time
/// is re-stamped instead of inserting a duplicate.
async fn attach_open_request(
    tx: &mut SqliteConnection,
    institution_id: i64,
    subject: Subject,
) -> Result<ModerationRequest> {
    let request = match ModerationRequest::find_open_for_subject(&mut *tx, subject).await? {
        Some(open) => ModerationRequest::touch_submission(&mut *tx, open.id).await?,
        None => ModerationRequest::create(&mut *tx, institution_id, subject).await?,
    };
    Ok(request)
}

/// Submits a new card listing. The institution must already be approved;
/// the card starts unapproved with a pending request attached, both rows
/// written in one transaction.
pub async fn submit_card(
    pool: &SqlitePool,
    institution_id: i64,
    input: CardInput,
) -> Result<(Card, ModerationRequest)> {
    validate(&input)?;

    let institution = Institution::find_by_id(pool, institution_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !institution.approved {
        return Err(AppError::NotApproved);
    }

    let mut tx = pool.begin().await?;

    let card = Card::create(&mut *tx, institution_id, &input).await?;
    let request = attach_open_request(&mut tx, institution_id, Subject::Card(card.id)).await?;

    tx.commit().await?;

    tracing::info!(
        card_id = card.id,
        institution_id,
        request_id = request.id,
        "card submitted, awaiting moderation"
    );

    Ok((card, request))
}

/// Overwrites a card's mutable fields and sends it back through
/// moderation. Ownership is checked by (card, institution) equality; a
/// card owned by someone else reads as `NotFound` so existence is not
/// leaked.
pub async fn edit_card(
    pool: &SqlitePool,
    institution_id: i64,
    card_id: i64,
    input: CardInput,
) -> Result<(Card, ModerationRequest)> {
    validate(&input)?;

    let mut tx = pool.begin().await?;

    let card = Card::update_owned(&mut *tx, card_id, institution_id, &input)
        .await?
        .ok_or(AppError::NotFound)?;
    let request = attach_open_request(&mut tx, institution_id, Subject::Card(card.id)).await?;

    tx.commit().await?;

    tracing::info!(
        card_id = card.id,
        institution_id,
        request_id = request.id,
        "card edited, approval reset"
    );

    Ok((card, request))
}

/// Hard-deletes a card and every request referencing it. No audit trail
/// is kept.
pub async fn delete_card(pool: &SqlitePool, institution_id: i64, card_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    Card::find_owned(&mut *tx, card_id, institution_id)
        .await?
        .ok_or(AppError::NotFound)?;

    sqlx::query("DELETE FROM requests WHERE subject_kind = 'card' AND subject_id = $1")
        .bind(card_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM cards WHERE id = $1")
        .bind(card_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(card_id, institution_id, "card deleted");

    Ok(())
}

/// Removes an institution and everything hanging off it, in dependency
/// order inside one transaction: requests for its cards, the cards,
/// requests for the institution itself, then the institution row.
pub async fn delete_institution(pool: &SqlitePool, institution_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    Institution::find_by_id(&mut *tx, institution_id)
        .await?
        .ok_or(AppError::NotFound)?;

    sqlx::query(
        r#"
        DELETE FROM requests
        WHERE subject_kind = 'card'
          AND subject_id IN (SELECT id FROM cards WHERE institution_id = $1)
        "#,
    )
    .bind(institution_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM cards WHERE institution_id = $1")
        .bind(institution_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM requests WHERE institution_id = $1")
        .bind(institution_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM institutions WHERE id = $1")
        .bind(institution_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(institution_id, "institution and its listings deleted");

    Ok(())
}
