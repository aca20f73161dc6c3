use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::session::AppState;
use crate::error::Result;
use crate::models::card::CardCategory;
use crate::services::catalog;

/// Public listing of every approved card.
async fn list_cards(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let cards = catalog::list_approved_cards(&state.pool).await?;
    Ok(Json(cards))
}

#[derive(Deserialize)]
struct SearchParams {
    age: i64,
    category: CardCategory,
}

/// Filtered search over the approved catalog by applicant age and category.
async fn search_cards(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse> {
    let cards = catalog::search_cards(&state.pool, params.age, params.category).await?;
    Ok(Json(cards))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards))
        .route("/cards/search", get(search_cards))
}
