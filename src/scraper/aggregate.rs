//! Merges the raw listings of all (query, page) fetches into one record per
//! distinct marketplace item.

use std::collections::BTreeSet;

use crate::domain::listing::{AggregatedListing, QUERY_SEPARATOR, RawListing};
use crate::domain::types::ExternalId;

/// Group raw listings by external id. Concurrent fetches complete in
/// arbitrary order, so the input is first sorted by `(page_offset, title)`
/// to make the per-group winner deterministic; the first record of each
/// group then provides title, price, url and image. The contributing query
/// texts are deduplicated, sorted and joined into the reversible tag field.
pub fn aggregate(mut raw: Vec<RawListing>) -> Vec<AggregatedListing> {
    raw.sort_by(|a, b| {
        a.page_offset
            .cmp(&b.page_offset)
            .then_with(|| a.title.cmp(&b.title))
    });

    let mut order: Vec<ExternalId> = Vec::new();
    let mut groups: Vec<(AggregatedListing, BTreeSet<String>)> = Vec::new();

    for listing in raw {
        match order.iter().position(|id| *id == listing.external_id) {
            Some(index) => {
                groups[index]
                    .1
                    .insert(listing.query.as_str().to_string());
            }
            None => {
                let mut queries = BTreeSet::new();
                queries.insert(listing.query.as_str().to_string());
                order.push(listing.external_id.clone());
                groups.push((
                    AggregatedListing {
                        external_id: listing.external_id,
                        title: listing.title,
                        price: listing.price,
                        url: listing.url,
                        img_url: listing.img_url,
                        query_tags: String::new(),
                    },
                    queries,
                ));
            }
        }
    }

    groups
        .into_iter()
        .map(|(mut aggregated, queries)| {
            aggregated.query_tags = queries.into_iter().collect::<Vec<_>>().join(QUERY_SEPARATOR);
            aggregated
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ImageUrl, ListingTitle, ListingUrl, PriceValue, QueryText};

    fn raw(external_id: &str, title: &str, price: f64, query: &str, page_offset: u32) -> RawListing {
        RawListing {
            external_id: ExternalId::new(external_id).unwrap(),
            title: ListingTitle::new(title).unwrap(),
            price: PriceValue::new(price).unwrap(),
            url: ListingUrl::new(format!(
                "https://articulo.mercadolibre.com.ar/{external_id}-x-_JM"
            ))
            .unwrap(),
            img_url: ImageUrl::new("https://http2.mlstatic.com/a.webp").unwrap(),
            query: QueryText::new(query).unwrap(),
            page_offset,
        }
    }

    #[test]
    fn merges_duplicates_into_one_record() {
        let merged = aggregate(vec![
            raw("MLA-1", "Notebook", 100.0, "laptop", 0),
            raw("MLA-1", "Notebook refurb", 90.0, "laptop", 50),
            raw("MLA-2", "Mouse", 10.0, "laptop", 0),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].external_id, "MLA-1");
        assert_eq!(merged[1].external_id, "MLA-2");
    }

    #[test]
    fn winner_is_deterministic_regardless_of_input_order() {
        let a = raw("MLA-1", "Zeta title", 50.0, "laptop", 50);
        let b = raw("MLA-1", "Alpha title", 100.0, "laptop", 0);

        let forward = aggregate(vec![a.clone(), b.clone()]);
        let backward = aggregate(vec![b, a]);

        assert_eq!(forward, backward);
        // Lowest page offset wins, then lexical title.
        assert_eq!(forward[0].title, "Alpha title");
        assert_eq!(forward[0].price, 100.0);
    }

    #[test]
    fn title_breaks_ties_within_one_page() {
        let merged = aggregate(vec![
            raw("MLA-1", "Beta", 1.0, "laptop", 0),
            raw("MLA-1", "Alpha", 2.0, "laptop", 0),
        ]);

        assert_eq!(merged[0].title, "Alpha");
    }

    #[test]
    fn collects_each_contributing_query_exactly_once() {
        let merged = aggregate(vec![
            raw("MLA-1", "Notebook", 100.0, "laptop", 0),
            raw("MLA-1", "Notebook", 100.0, "notebook", 0),
            raw("MLA-1", "Notebook", 100.0, "laptop", 50),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].query_tags, "laptop-QUERYSEP-notebook");
        let queries: Vec<&str> = merged[0].queries().collect();
        assert_eq!(queries, vec!["laptop", "notebook"]);
    }

    #[test]
    fn empty_input_aggregates_to_nothing() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
