use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;

use crate::api::middleware::session::{AppState, SESSION_KEY_USER_ID};
use crate::error::{AppError, Result};
use crate::services::{auth, registration};

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

/// Signs a user in and stores the account id in the session.
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<impl IntoResponse> {
    let user = auth::authenticate(&state.pool, &form.email, &form.password).await?;

    session
        .insert(SESSION_KEY_USER_ID, user.id)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    tracing::info!(user_id = user.id, "user signed in");

    Ok(Json(json!({
        "id": user.id,
        "display_name": user.display_name,
        "role": user.role,
    })))
}

/// Registers an institution account. The account stays unable to post
/// listings until an administrator approves the registration request.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<registration::RegistrationInput>,
) -> Result<impl IntoResponse> {
    let (user, institution, request) =
        registration::register_institution(&state.pool, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": user,
            "institution": institution,
            "request": request,
        })),
    ))
}

async fn logout(session: Session) -> Result<impl IntoResponse> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", get(logout))
}
