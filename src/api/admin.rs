use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;

use crate::api::middleware::{auth::require_admin, session::AppState};
use crate::error::Result;
use crate::models::{card::Card, institution::Institution, request::ModerationRequest};
use crate::services::{listings, moderation};

/// Moderation overview counts.
async fn dashboard(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    require_admin(&state.pool, &session).await?;

    let total_institutions = Institution::count_all(&state.pool).await?;
    let pending_institutions = Institution::count_unapproved(&state.pool).await?;
    let total_cards = Card::count_all(&state.pool).await?;
    let pending_cards = Card::count_unapproved(&state.pool).await?;
    let pending_requests = ModerationRequest::count_pending(&state.pool).await?;

    Ok(Json(json!({
        "total_institutions": total_institutions,
        "pending_institutions": pending_institutions,
        "total_cards": total_cards,
        "pending_cards": pending_cards,
        "pending_requests": pending_requests,
    })))
}

/// The moderation queue, newest submission first.
async fn list_requests(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    require_admin(&state.pool, &session).await?;

    let requests = moderation::list_pending_requests(&state.pool).await?;
    Ok(Json(requests))
}

async fn approve_request(
    State(state): State<AppState>,
    session: Session,
    Path(request_id): Path<i64>,
) -> Result<impl IntoResponse> {
    require_admin(&state.pool, &session).await?;

    let request = moderation::resolve_request(
        &state.pool,
        request_id,
        moderation::Decision::Approved,
        None,
    )
    .await?;

    Ok(Json(request))
}

#[derive(Deserialize, Default)]
struct RejectBody {
    comment: Option<String>,
}

async fn reject_request(
    State(state): State<AppState>,
    session: Session,
    Path(request_id): Path<i64>,
    Json(body): Json<RejectBody>,
) -> Result<impl IntoResponse> {
    require_admin(&state.pool, &session).await?;

    let request = moderation::resolve_request(
        &state.pool,
        request_id,
        moderation::Decision::Rejected,
        body.comment.as_deref(),
    )
    .await?;

    Ok(Json(request))
}

async fn list_institutions(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    require_admin(&state.pool, &session).await?;

    let institutions = Institution::list_all(&state.pool).await?;
    Ok(Json(institutions))
}

/// Removes an institution with its cards and requests.
async fn delete_institution(
    State(state): State<AppState>,
    session: Session,
    Path(institution_id): Path<i64>,
) -> Result<impl IntoResponse> {
    require_admin(&state.pool, &session).await?;

    listings::delete_institution(&state.pool, institution_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_cards(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    require_admin(&state.pool, &session).await?;

    let cards = Card::list_all(&state.pool).await?;
    Ok(Json(cards))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/requests", get(list_requests))
        .route("/admin/requests/:id/approve", post(approve_request))
        .route("/admin/requests/:id/reject", post(reject_request))
        .route(
            "/admin/institutions",
            get(list_institutions),
        )
        .route(
            "/admin/institutions/:id",
            axum::routing::delete(delete_institution),
        )
        .route("/admin/cards", get(list_cards))
}
