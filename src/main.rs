use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use football_api::api;
use football_api::config::{self, Config};
use football_api::logging;
use football_api::match_store::MatchStore;

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = Config::from_env()?.with_args(&args)?;
    logging::init(&config.log_level);

    let store = Arc::new(MatchStore::open(&config.db_path)?);
    if let Some(path) = store.path() {
        info!(db = %path.display(), "match store opened");
    }
    let (addr, server) = warp::serve(api::routes(store.clone()))
        .try_bind_with_graceful_shutdown(config.api_addr, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c, shutting down: {err}");
            }
        })
        .with_context(|| format!("bind {}", config.api_addr))?;

    info!("Football match API listening on http://{addr}");
    info!("Matches endpoint: http://{addr}/matches");
    server.await;
    info!("shutting down");

    match Arc::try_unwrap(store) {
        Ok(store) => store.close()?,
        Err(_) => warn!("match store still in use at shutdown, leaving it to drop"),
    }
    Ok(())
}
