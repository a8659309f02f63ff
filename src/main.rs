use std::sync::Arc;

use mercurio::config::AppConfig;
use mercurio::db::establish_connection_pool;
use mercurio::embedding::FastembedEmbedder;
use mercurio::repository::{DieselRepository, QueueConfig};
use mercurio::scraper::fetcher::{Fetcher, FetcherConfig};
use mercurio::scraper::mercadolibre::MercadoLibre;
use mercurio::services::worker::run_worker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::load()?;
    let pool = establish_connection_pool(&config.database_url)?;
    let repo = DieselRepository::new(pool).with_queue_config(QueueConfig::from(&config.queue));

    let marketplace = Arc::new(MercadoLibre::new()?);
    let fetcher = Arc::new(Fetcher::new(FetcherConfig::from(&config.fetcher))?);
    let embedder = FastembedEmbedder::new()?;

    log::info!("worker started, polling every {:?}", config.poll_interval());
    run_worker(
        &repo,
        &marketplace,
        &fetcher,
        &embedder,
        config.poll_interval(),
    )
    .await;

    Ok(())
}
