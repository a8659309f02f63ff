//! The transactional unit of work behind one crawl cycle: entity
//! resolution against the stored product embeddings, then reconciliation
//! of listings, candidate audit rows and price observations.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::domain::resolution::Resolution;
use crate::domain::types::MatchMethod;
use crate::embedding::{EMBEDDING_DIM, vector_to_blob};
use crate::models::candidate::NewCandidate;
use crate::models::listing::{Listing as DbListing, NewListing};
use crate::models::price::NewPrice;
use crate::models::product::{NewProduct, NewProductEmbedding};
use crate::models::query::Query as DbQuery;
use crate::repository::product::nearest_product_with_conn;
use crate::repository::{
    CrawlSummary, CrawlUnit, CrawlUnitWriter, DieselRepository, RepositoryError, RepositoryResult,
};

impl CrawlUnitWriter for DieselRepository {
    fn persist_crawl(&self, unit: &CrawlUnit) -> RepositoryResult<CrawlSummary> {
        if unit.listings.len() != unit.embeddings.len() {
            return Err(RepositoryError::Validation(format!(
                "{} listings but {} embeddings",
                unit.listings.len(),
                unit.embeddings.len()
            )));
        }
        if let Some(embedding) = unit.embeddings.iter().find(|e| e.len() != EMBEDDING_DIM) {
            return Err(RepositoryError::Validation(format!(
                "expected {EMBEDDING_DIM}-dimension embeddings, got {}",
                embedding.len()
            )));
        }

        let mut conn = self.conn()?;

        // One transaction per unit: resolution reads and every write commit
        // or roll back together. Concurrent workers serialize on the SQLite
        // write lock here, so two units cannot race a duplicate product
        // into existence.
        conn.transaction::<CrawlSummary, RepositoryError, _>(|conn| {
            let queries_map = load_queries(conn, unit)?;
            let (product_ids, new_products) = resolve_products(conn, unit)?;

            let now = Utc::now().naive_utc();
            let mut summary = CrawlSummary {
                new_products,
                ..CrawlSummary::default()
            };

            for (listing, resolution) in unit.listings.iter().zip(&product_ids) {
                use crate::schema::{listings, prices, product_candidates};

                let existing = listings::table
                    .filter(listings::marketplace_id.eq(unit.marketplace_id.get()))
                    .filter(listings::external_id.eq(listing.external_id.as_str()))
                    .first::<DbListing>(conn)
                    .optional()?;

                let listing_id = match existing {
                    Some(row) => {
                        // A repeat sighting only refreshes the image and
                        // the last-seen marker.
                        if row.img_url.as_deref() != Some(listing.img_url.as_str()) {
                            diesel::update(listings::table.filter(listings::id.eq(row.id)))
                                .set((
                                    listings::img_url.eq(listing.img_url.as_str()),
                                    listings::last_seen.eq(now),
                                ))
                                .execute(conn)?;
                        } else {
                            diesel::update(listings::table.filter(listings::id.eq(row.id)))
                                .set(listings::last_seen.eq(now))
                                .execute(conn)?;
                        }
                        row.id
                    }
                    None => {
                        let listing_id = diesel::insert_into(listings::table)
                            .values(NewListing {
                                marketplace_id: unit.marketplace_id.get(),
                                external_id: listing.external_id.as_str(),
                                title: listing.title.as_str(),
                                url: listing.url.as_str(),
                                img_url: Some(listing.img_url.as_str()),
                                last_seen: Some(now),
                                created_at: now,
                            })
                            .returning(listings::id)
                            .get_result::<i32>(conn)?;
                        summary.new_listings += 1;

                        // Discovery event: one audit row per known query
                        // that produced this listing.
                        for tag in listing.queries() {
                            let Some(query_id) = queries_map.get(tag) else {
                                continue;
                            };
                            diesel::insert_into(product_candidates::table)
                                .values(NewCandidate {
                                    query_id: *query_id,
                                    product_id: resolution.product_id,
                                    listing_id,
                                    match_method: MatchMethod::Cosine.as_str(),
                                    distance: resolution.distance,
                                    decided: false,
                                    created_at: now,
                                })
                                .execute(conn)?;
                            summary.candidates_created += 1;
                        }
                        listing_id
                    }
                };

                // Prices append unconditionally, every cycle. This is the
                // time-series contract: re-running a unit grows the series.
                diesel::insert_into(prices::table)
                    .values(NewPrice {
                        listing_id,
                        price: listing.price.get(),
                        scraped_at: now,
                    })
                    .execute(conn)?;
                summary.prices_appended += 1;
            }

            Ok(summary)
        })
    }
}

/// The resolved product for one aggregated listing, plus the distance that
/// goes on its candidate audit rows.
struct ResolvedProduct {
    product_id: i32,
    distance: f32,
}

fn load_queries(
    conn: &mut SqliteConnection,
    unit: &CrawlUnit,
) -> RepositoryResult<HashMap<String, i32>> {
    use crate::schema::queries;

    let tags: BTreeSet<&str> = unit.listings.iter().flat_map(|l| l.queries()).collect();
    let tags: Vec<&str> = tags.into_iter().collect();

    let rows = queries::table
        .filter(queries::query_text.eq_any(&tags))
        .filter(queries::removed_at.is_null())
        .load::<DbQuery>(conn)?;

    Ok(rows
        .into_iter()
        .map(|row| (row.query_text, row.id))
        .collect())
}

/// Run the threshold decision for every listing against the embeddings
/// that existed before this unit, then batch-insert the products and
/// embeddings the unmatched listings mint.
fn resolve_products(
    conn: &mut SqliteConnection,
    unit: &CrawlUnit,
) -> RepositoryResult<(Vec<ResolvedProduct>, usize)> {
    use crate::schema::{product_embeddings, products};

    let now = Utc::now().naive_utc();

    // Snapshot semantics: every listing in the unit resolves against the
    // same pre-existing set, so the outcome does not depend on the order
    // the unit is walked in.
    let mut resolutions = Vec::with_capacity(unit.listings.len());
    for embedding in &unit.embeddings {
        let nearest = nearest_product_with_conn(conn, embedding)?
            .map(|(id, distance)| Ok::<_, RepositoryError>((id.try_into()?, distance)))
            .transpose()?;
        resolutions.push(Resolution::decide(nearest));
    }

    let mut resolved = Vec::with_capacity(resolutions.len());
    let mut new_products = 0usize;
    for (listing, (resolution, embedding)) in unit
        .listings
        .iter()
        .zip(resolutions.iter().zip(&unit.embeddings))
    {
        match resolution {
            Resolution::Existing {
                product_id,
                distance,
            } => resolved.push(ResolvedProduct {
                product_id: product_id.get(),
                distance: distance.get(),
            }),
            Resolution::New => {
                let product_id = diesel::insert_into(products::table)
                    .values(NewProduct {
                        name: listing.title.as_str(),
                        manual_override: false,
                        created_at: now,
                    })
                    .returning(products::id)
                    .get_result::<i32>(conn)?;

                let blob = vector_to_blob(embedding);
                diesel::insert_into(product_embeddings::table)
                    .values(NewProductEmbedding {
                        product_id,
                        embedding: &blob,
                        created_at: now,
                    })
                    .execute(conn)?;

                new_products += 1;
                resolved.push(ResolvedProduct {
                    product_id,
                    distance: resolution.audit_distance().get(),
                });
            }
        }
    }

    Ok((resolved, new_products))
}
