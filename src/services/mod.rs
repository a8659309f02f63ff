//! Orchestration over the repository traits and the scraping capabilities.

pub mod crawl;
pub mod dispatch;
pub mod errors;
pub mod worker;
