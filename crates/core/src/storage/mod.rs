pub mod reports;

use anyhow::Context;

/// Applies the embedded migrations for the report store.
pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("report store migrations failed")?;
    Ok(())
}
