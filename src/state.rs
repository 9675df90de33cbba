use sqlx::SqlitePool;

use crate::config::Config;
use crate::flash::FlashStore;
use crate::io::Uploads;

/// Shared handles passed to every handler through an `Extension` layer.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub uploads: Uploads,
    pub flashes: FlashStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        Self {
            pool,
            uploads: Uploads::new(config.upload_dir.clone()),
            flashes: FlashStore::new(config.flash_ttl),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}
