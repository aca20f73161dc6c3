use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::{
    institution::{CreateInstitutionData, Institution},
    request::{ModerationRequest, Subject},
    user::{CreateUserData, Role, User},
};
use crate::services::auth;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationInput {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub contact_name: String,
    pub institution_name: String,
    pub phone: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

fn validate(input: &RegistrationInput) -> Result<()> {
    if !input.email.contains('@') {
        return Err(AppError::Validation("email is not valid".to_string()));
    }
    if input.password.len() < 6 {
        return Err(AppError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    if input.password != input.confirm_password {
        return Err(AppError::Validation(
            "password confirmation does not match".to_string(),
        ));
    }
    if input.contact_name.trim().is_empty() {
        return Err(AppError::Validation("contact name is required".to_string()));
    }
    if input.institution_name.trim().is_empty() {
        return Err(AppError::Validation(
            "institution name is required".to_string(),
        ));
    }
    if input.phone.trim().is_empty() {
        return Err(AppError::Validation("phone is required".to_string()));
    }
    Ok(())
}

/// Registers an institution: the account, its unapproved profile, and the
/// pending moderation request are created in one transaction. On any
/// failure nothing is committed, so the caller may simply retry.
///
/// Email uniqueness follows the storage collation (byte-wise here); a
/// concurrent insert of the same email is caught by the unique constraint
/// and reported as a duplicate, not as a storage failure.
pub async fn register_institution(
    pool: &SqlitePool,
    input: RegistrationInput,
) -> Result<(User, Institution, ModerationRequest)> {
    validate(&input)?;

    let password_hash = auth::hash_password(&input.password)?;

    let mut tx = pool.begin().await?;

    if User::find_by_email(&mut *tx, &input.email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let user = User::create(
        &mut *tx,
        CreateUserData {
            email: input.email,
            password_hash,
            display_name: input.contact_name,
            role: Role::Institution,
        },
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateEmail,
        _ => AppError::Database(e),
    })?;

    let institution = Institution::create(
        &mut *tx,
        CreateInstitutionData {
            user_id: user.id,
            name: input.institution_name,
            phone: input.phone,
            website: input.website,
            description: input.description,
            logo_url: input.logo_url,
        },
    )
    .await?;

    let request =
        ModerationRequest::create(&mut *tx, institution.id, Subject::Institution(institution.id))
            .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = user.id,
        institution_id = institution.id,
        request_id = request.id,
        "institution registered, awaiting moderation"
    );

    Ok((user, institution, request))
}
