use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::SqlitePool;

use crate::error::{AppError, Result};
use crate::models::user::User;

/// Hashes a plaintext password with argon2id. Only the hash is ever stored.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Verifies a plaintext password against a stored hash. An unparseable
/// hash verifies as false rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Resolves credentials to an account. Unknown email, wrong password, and
/// deactivated accounts all fail with the same `Auth` error.
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> Result<User> {
    let user = User::find_by_email(pool, email)
        .await?
        .ok_or(AppError::Auth)?;

    if !verify_password(password, &user.password_hash) {
        return Err(AppError::Auth);
    }

    if !user.is_active {
        return Err(AppError::Auth);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::user::{CreateUserData, Role};

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter42").unwrap();
        assert!(verify_password("hunter42", &hash));
        assert!(!verify_password("hunter43", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials_uniformly() {
        let pool = db::in_memory_pool().await.unwrap();

        let hash = hash_password("correct-horse").unwrap();
        User::create(
            &pool,
            CreateUserData {
                email: "bank@example.com".to_string(),
                password_hash: hash,
                display_name: "Bank".to_string(),
                role: Role::Institution,
            },
        )
        .await
        .unwrap();

        let ok = authenticate(&pool, "bank@example.com", "correct-horse").await;
        assert!(ok.is_ok());

        let wrong_password = authenticate(&pool, "bank@example.com", "nope").await;
        assert!(matches!(wrong_password, Err(AppError::Auth)));

        let unknown_email = authenticate(&pool, "ghost@example.com", "nope").await;
        assert!(matches!(unknown_email, Err(AppError::Auth)));
    }

    #[tokio::test]
    async fn authenticate_rejects_inactive_account() {
        let pool = db::in_memory_pool().await.unwrap();

        let hash = hash_password("secret-pw").unwrap();
        let user = User::create(
            &pool,
            CreateUserData {
                email: "inactive@example.com".to_string(),
                password_hash: hash,
                display_name: "Inactive".to_string(),
                role: Role::Institution,
            },
        )
        .await
        .unwrap();

        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        let result = authenticate(&pool, "inactive@example.com", "secret-pw").await;
        assert!(matches!(result, Err(AppError::Auth)));
    }
}
