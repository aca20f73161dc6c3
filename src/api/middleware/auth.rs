use sqlx::SqlitePool;
use tower_sessions::Session;

use super::session::SESSION_KEY_USER_ID;
use crate::error::{AppError, Result};
use crate::models::{
    institution::Institution,
    user::{Role, User},
};

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub user: User,
}

/// An authenticated institution account together with the institution it
/// owns.
#[derive(Debug, Clone)]
pub struct InstitutionPrincipal {
    pub user: User,
    pub institution: Institution,
}

/// Resolves the session to its account. Fails `Unauthenticated` when there
/// is no session, the account vanished, or the account was deactivated.
pub async fn current_user(pool: &SqlitePool, session: &Session) -> Result<User> {
    let user_id: i64 = session
        .get(SESSION_KEY_USER_ID)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?
        .ok_or(AppError::Unauthenticated)?;

    let user = User::find_by_id(pool, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !user.is_active {
        return Err(AppError::Unauthenticated);
    }

    Ok(user)
}

/// Guard for moderation endpoints.
pub async fn require_admin(pool: &SqlitePool, session: &Session) -> Result<AdminPrincipal> {
    let user = current_user(pool, session).await?;
    if user.role != Role::Administrator {
        return Err(AppError::Forbidden);
    }
    Ok(AdminPrincipal { user })
}

/// Guard for submission endpoints. An institution-role account without an
/// institution row is corrupt state: the session is flushed and the caller
/// must sign in again.
pub async fn require_institution(
    pool: &SqlitePool,
    session: &Session,
) -> Result<InstitutionPrincipal> {
    let user = current_user(pool, session).await?;
    if user.role != Role::Institution {
        return Err(AppError::Forbidden);
    }

    let institution = match Institution::find_by_user_id(pool, user.id).await? {
        Some(institution) => institution,
        None => {
            tracing::warn!(user_id = user.id, "institution account without institution row");
            session
                .flush()
                .await
                .map_err(|e| AppError::Session(e.to_string()))?;
            return Err(AppError::InvalidState);
        }
    };

    Ok(InstitutionPrincipal { user, institution })
}
