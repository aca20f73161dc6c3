use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_sessions::Session;

use crate::api::middleware::{auth::require_institution, session::AppState};
use crate::error::Result;
use crate::models::{
    card::{Card, CardInput},
    request::ModerationRequest,
};
use crate::services::listings;

/// Institution overview: listing counts and moderation state.
async fn dashboard(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let principal = require_institution(&state.pool, &session).await?;
    let institution = &principal.institution;

    let cards = Card::count_by_institution(&state.pool, institution.id).await?;
    let approved_cards =
        Card::count_approved_by_institution(&state.pool, institution.id).await?;
    let pending_requests =
        ModerationRequest::count_pending_by_institution(&state.pool, institution.id).await?;

    Ok(Json(json!({
        "institution": institution,
        "stats": {
            "cards": cards,
            "approved_cards": approved_cards,
            "pending_requests": pending_requests,
        },
    })))
}

async fn list_cards(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let principal = require_institution(&state.pool, &session).await?;

    let cards = Card::list_by_institution(&state.pool, principal.institution.id).await?;
    Ok(Json(cards))
}

/// Submits a new card for moderation.
async fn create_card(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<CardInput>,
) -> Result<impl IntoResponse> {
    let principal = require_institution(&state.pool, &session).await?;

    let (card, request) =
        listings::submit_card(&state.pool, principal.institution.id, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "card": card, "request": request })),
    ))
}

/// Edits a card; the listing drops out of the catalog until re-approved.
async fn update_card(
    State(state): State<AppState>,
    session: Session,
    Path(card_id): Path<i64>,
    Json(input): Json<CardInput>,
) -> Result<impl IntoResponse> {
    let principal = require_institution(&state.pool, &session).await?;

    let (card, request) =
        listings::edit_card(&state.pool, principal.institution.id, card_id, input).await?;

    Ok(Json(json!({ "card": card, "request": request })))
}

async fn delete_card(
    State(state): State<AppState>,
    session: Session,
    Path(card_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let principal = require_institution(&state.pool, &session).await?;

    listings::delete_card(&state.pool, principal.institution.id, card_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/institution/dashboard", get(dashboard))
        .route("/institution/cards", get(list_cards).post(create_card))
        .route(
            "/institution/cards/:id",
            axum::routing::put(update_card).delete(delete_card),
        )
}
