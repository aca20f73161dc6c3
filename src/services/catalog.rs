use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::card::{Card, CardCategory};

/// Every approved card, in insertion order. Unapproved listings are never
/// visible here, whatever their history.
pub async fn list_approved_cards(pool: &SqlitePool) -> Result<Vec<Card>> {
    Ok(Card::list_approved(pool).await?)
}

/// Approved cards of the requested category that an applicant of the given
/// age qualifies for. An empty result is a normal outcome, not an error.
pub async fn search_cards(
    pool: &SqlitePool,
    age: i64,
    category: CardCategory,
) -> Result<Vec<Card>> {
    if !(18..=100).contains(&age) {
        return Err(AppError::Validation(
            "age must be between 18 and 100".to_string(),
        ));
    }

    Ok(Card::search_approved(pool, age, category).await?)
}
