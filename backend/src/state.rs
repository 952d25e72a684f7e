use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{SqlxCourseStore, SqlxEnrollmentStore},
    services::{MediaAuthorizer, TokenAuthSigner},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub media: Arc<MediaAuthorizer>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let media = Arc::new(MediaAuthorizer::new(
            Arc::new(SqlxCourseStore::new(pool.clone())),
            Arc::new(SqlxEnrollmentStore::new(pool.clone())),
            Arc::new(TokenAuthSigner::new(
                config.media_signing_key.clone(),
                config.media_delivery_base_url.clone(),
            )),
            Duration::from_secs(config.playback_ttl_seconds),
        ));
        Self {
            pool,
            config,
            media,
        }
    }
}
