use secrecy::{ExposeSecret, Secret};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::time::Duration;

use crate::models::user::{CreateUserData, Role, User};
use crate::services::auth;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // SQLite serializes writes anyway; a small pool is plenty for the
    // low request volume this directory is designed for.
    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Creates a single-connection in-memory database with the schema applied.
/// Used by the test suites; a shared pool would hand each connection its
/// own empty in-memory database.
pub async fn in_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Ensures the bootstrap administrator account exists. Idempotent: does
/// nothing if an account with the given email is already registered.
pub async fn ensure_admin(
    pool: &SqlitePool,
    email: &str,
    password: &Secret<String>,
) -> crate::error::Result<()> {
    if User::find_by_email(pool, email).await?.is_some() {
        return Ok(());
    }

    let password_hash = auth::hash_password(password.expose_secret())?;
    let admin = User::create(
        pool,
        CreateUserData {
            email: email.to_string(),
            password_hash,
            display_name: "Administrator".to_string(),
            role: Role::Administrator,
        },
    )
    .await?;

    tracing::info!(user_id = admin.id, "bootstrap administrator created");

    Ok(())
}
