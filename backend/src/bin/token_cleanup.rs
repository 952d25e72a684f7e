//! Deletes expired refresh-token rows. Intended to run on a schedule.

use courseware_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::refresh_token::delete_expired_tokens,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;

    let removed = delete_expired_tokens(pool.as_ref()).await?;
    tracing::info!(removed, "expired refresh tokens deleted");
    Ok(())
}
