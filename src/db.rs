use crate::{
    auth::password::{hash_password, random_secret, validate_pin},
    config::SeedAdmin,
    model::role::Role,
};
use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Utc};
use sqlx::MySqlPool;
use tracing::info;

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Creates the bootstrap admin when the username is not taken yet. Existing accounts are left alone.
pub async fn seed_admin(pool: &MySqlPool, seed: &SeedAdmin, initial_vacation_days: i32) -> Result<()> {
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(&seed.username)
        .fetch_one(pool)
        .await
        .context("Failed to look up seed admin")?;
    if exists > 0 {
        return Ok(());
    }

    validate_pin(&seed.pin).context("SEED_ADMIN_PIN is invalid")?;
    let password = seed.password.clone().unwrap_or_else(random_secret);
    let password_hash =
        hash_password(&password).map_err(|e| anyhow!("Failed to hash seed password: {e}"))?;
    let pin_hash =
        hash_password(&seed.pin).map_err(|e| anyhow!("Failed to hash seed PIN: {e}"))?;

    sqlx::query(
        r#"
        INSERT INTO users
            (username, email, full_name, password, pin_hash, role_id,
             vacation_days_available, last_vacation_credit_year, is_active_employee)
        VALUES (?, ?, NULL, ?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(&seed.username)
    .bind(&seed.email)
    .bind(&password_hash)
    .bind(&pin_hash)
    .bind(Role::Admin.id())
    .bind(initial_vacation_days)
    .bind(Utc::now().year())
    .execute(pool)
    .await
    .context("Failed to insert seed admin")?;

    info!(username = %seed.username, "Seed admin created");
    Ok(())
}
