use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates the graph store connection pool
///
/// Each query checks a connection out for its own duration and returns it
/// on every exit path, so the pool can be shared by concurrent requests.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the graph schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Graph store migrations applied");
    Ok(())
}
