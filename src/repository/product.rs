use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::domain::product::Product;
use crate::domain::types::ProductId;
use crate::embedding::{blob_to_vector, cosine_distance};
use crate::models::product::{Product as DbProduct, ProductEmbedding as DbProductEmbedding};
use crate::repository::{DieselRepository, ProductReader, RepositoryResult};

/// Linear top-1 scan over all stored embedding blobs. The embedding count
/// stays small enough that delegating to a vector index is not worth the
/// moving parts; callers only ever consume the single nearest result.
pub(crate) fn nearest_product_with_conn(
    conn: &mut SqliteConnection,
    target: &[f32],
) -> RepositoryResult<Option<(i32, f32)>> {
    use crate::schema::product_embeddings;

    let rows = product_embeddings::table.load::<DbProductEmbedding>(conn)?;

    let mut nearest: Option<(i32, f32)> = None;
    for row in rows {
        let stored = blob_to_vector(&row.embedding)?;
        let distance = cosine_distance(target, &stored);
        match nearest {
            Some((_, best)) if best <= distance => {}
            _ => nearest = Some((row.product_id, distance)),
        }
    }
    Ok(nearest)
}

impl ProductReader for DieselRepository {
    fn get_product_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        use crate::schema::products;

        let mut conn = self.conn()?;

        let product = products::table
            .filter(products::id.eq(id.get()))
            .first::<DbProduct>(&mut conn)
            .optional()?;

        product.map(TryInto::try_into).transpose().map_err(Into::into)
    }

    fn nearest_product(&self, embedding: &[f32]) -> RepositoryResult<Option<(ProductId, f32)>> {
        let mut conn = self.conn()?;

        let nearest = nearest_product_with_conn(&mut conn, embedding)?;
        nearest
            .map(|(id, distance)| Ok((ProductId::new(id)?, distance)))
            .transpose()
    }
}
