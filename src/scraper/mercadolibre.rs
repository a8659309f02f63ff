//! MercadoLibre search-result crawling: URL building and page extraction.

use scraper::{Html, Selector};
use thiserror::Error;

use crate::domain::listing::RawListing;
use crate::domain::types::{
    ExternalId, ImageUrl, ListingTitle, ListingUrl, MarketplaceId, PriceValue, QueryText,
    TypeConstraintError,
};
use crate::scraper::Marketplace;

/// Seeded marketplace row the listings attach to.
pub const MERCADOLIBRE_MARKETPLACE_ID: i32 = 1;

const BASE_SEARCH_URL: &str = "https://listado.mercadolibre.com.ar/";

/// Items per search-result page; pagination offsets go 0, 50, 100, ...
const PAGE_SIZE: u32 = 50;

/// URL marker of internal ad-click entries, which are skipped outright.
const AD_CLICK_MARKER: &str = "mclics";

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid selector {0}: {1}")]
    Selector(&'static str, String),
    #[error(transparent)]
    Constraint(#[from] TypeConstraintError),
}

/// The MercadoLibre implementation of the [`Marketplace`] capability.
pub struct MercadoLibre {
    id: MarketplaceId,
    item: Selector,
    link: Selector,
    title: Selector,
    image: Selector,
    price: Selector,
}

impl MercadoLibre {
    pub fn new() -> Result<Self, ExtractorError> {
        Ok(Self {
            id: MarketplaceId::new(MERCADOLIBRE_MARKETPLACE_ID)?,
            item: compile("li.ui-search-layout__item")?,
            link: compile("a")?,
            title: compile("a.poly-component__title")?,
            image: compile("div.poly-card__portada img")?,
            price: compile("span.andes-money-amount__fraction")?,
        })
    }
}

fn compile(selector: &'static str) -> Result<Selector, ExtractorError> {
    Selector::parse(selector).map_err(|err| ExtractorError::Selector(selector, err.to_string()))
}

impl Marketplace for MercadoLibre {
    fn marketplace_id(&self) -> MarketplaceId {
        self.id
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn search_url(&self, query: &QueryText, offset: u32) -> String {
        let slug = query.as_str().replace(' ', "-");
        if offset == 0 {
            format!("{BASE_SEARCH_URL}{slug}_NoIndex_True")
        } else {
            format!("{BASE_SEARCH_URL}{slug}_Desde_{}_NoIndex_True", offset + 1)
        }
    }

    fn extract(&self, html: &str, query: &QueryText, page_offset: u32) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for item in document.select(&self.item) {
            let Some(url) = item
                .select(&self.link)
                .find_map(|a| a.value().attr("href"))
            else {
                continue;
            };
            // Fragment carries tracking state, not page identity.
            let url = url.split('#').next().unwrap_or(url);
            if url.contains(AD_CLICK_MARKER) {
                continue;
            }

            let Some(external_id) = external_id_from_url(url) else {
                continue;
            };
            let Some(title) = item
                .select(&self.title)
                .next()
                .map(|node| node.text().collect::<String>())
            else {
                continue;
            };
            let Some(img_url) = item.select(&self.image).next().and_then(|img| {
                match img.value().attr("src") {
                    // Lazy-loaded cards ship a data: placeholder in src and
                    // the real URL in data-src.
                    Some(src) if !src.starts_with("data:") => Some(src),
                    _ => img.value().attr("data-src"),
                }
            }) else {
                continue;
            };
            let Some(price) = item
                .select(&self.price)
                .next()
                .and_then(|node| parse_price(&node.text().collect::<String>()))
            else {
                continue;
            };

            let record = (|| -> Result<RawListing, TypeConstraintError> {
                Ok(RawListing {
                    external_id: ExternalId::new(external_id.as_str())?,
                    title: ListingTitle::new(title.as_str())?,
                    price: PriceValue::new(price)?,
                    url: ListingUrl::new(url)?,
                    img_url: ImageUrl::new(img_url)?,
                    query: query.clone(),
                    page_offset,
                })
            })();
            match record {
                Ok(record) => listings.push(record),
                // One bad entry never aborts the page.
                Err(err) => log::debug!("skipping malformed listing on {url}: {err}"),
            }
        }

        listings
    }
}

/// Derive the marketplace-assigned id from a listing URL: the canonical
/// `/p/` path segment when present, otherwise the first two dash-delimited
/// tokens of the item path concatenated (`MLA1234...`).
fn external_id_from_url(url: &str) -> Option<String> {
    let url = url.split(['?', '#']).next()?;

    if let Some(index) = url.find("/p/") {
        let id = url[index + 3..].split('/').next()?;
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    let path = url.splitn(4, '/').nth(3)?;
    let mut tokens = path.split('-');
    match (tokens.next(), tokens.next()) {
        (Some(prefix), Some(serial)) if !prefix.is_empty() && !serial.is_empty() => {
            Some(format!("{prefix}{serial}"))
        }
        _ => None,
    }
}

/// Parse a localized price: `.` separates thousands, `,` separates
/// decimals.
fn parse_price(text: &str) -> Option<f64> {
    let normalized = text.trim().replace('.', "").replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse().ok()
}
