use std::sync::Arc;

use mercurio::config::AppConfig;
use mercurio::db::establish_connection_pool;
use mercurio::embedding::FastembedEmbedder;
use mercurio::repository::DieselRepository;
use mercurio::scraper::fetcher::{Fetcher, FetcherConfig};
use mercurio::scraper::mercadolibre::MercadoLibre;
use mercurio::services::dispatch::{dispatch_inline, dispatch_jobs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let inline = std::env::args().any(|arg| arg == "--inline");

    let config = AppConfig::load()?;
    let pool = establish_connection_pool(&config.database_url)?;
    let repo = DieselRepository::new(pool);

    if inline {
        let marketplace = Arc::new(MercadoLibre::new()?);
        let fetcher = Arc::new(Fetcher::new(FetcherConfig::from(&config.fetcher))?);
        let embedder = FastembedEmbedder::new()?;

        let processed = dispatch_inline(&repo, &marketplace, &fetcher, &embedder).await?;
        log::info!("inline dispatch processed {processed} queries");
    } else {
        let ids = dispatch_jobs(&repo)?;
        log::info!("enqueued {} crawl jobs", ids.len());
    }

    Ok(())
}
