use sqlx::{Pool, Postgres};
use tracing::info;

/// Run all pending database migrations.
///
/// The SQL files under `migrations/` are embedded at compile time; applying
/// them is idempotent because sqlx tracks what already ran.
pub async fn run(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Database migrations up to date");
    Ok(())
}
