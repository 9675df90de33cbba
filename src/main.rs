pub mod auth;
pub mod config;
pub mod db;
pub mod err;
pub mod flash;
pub mod handlers;
pub mod io;
pub mod models;
pub mod pages;
pub mod routes;
pub mod state;
pub mod validate;

pub use crate::err::Error;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    let state = AppState::new(pool, &config);
    state.uploads.prepare().await?;
    let app = routes::router(state);

    log::info!(
        "Starting student registry on http://{} (uploads in {})",
        config.bind_addr,
        config.upload_dir.display()
    );
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
