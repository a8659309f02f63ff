use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::product::Product as DomainProduct;
use crate::domain::types::{ProductId, ProductName, TypeConstraintError};

/// Diesel representation of a product row.
#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::products)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub manual_override: bool,
    pub created_at: NaiveDateTime,
}

/// Insertable form of [`Product`] used for creating new rows.
#[derive(Insertable)]
#[diesel(table_name = crate::schema::products)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub manual_override: bool,
    pub created_at: NaiveDateTime,
}

impl TryFrom<Product> for DomainProduct {
    type Error = TypeConstraintError;

    fn try_from(product: Product) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(product.id)?,
            name: ProductName::new(product.name)?,
            manual_override: product.manual_override,
            created_at: product.created_at,
        })
    }
}

/// Diesel representation of a product embedding row. The blob holds the
/// 384-dimension vector as little-endian `f32`s.
#[derive(Debug, Clone, Identifiable, Queryable, Associations)]
#[diesel(belongs_to(Product))]
#[diesel(table_name = crate::schema::product_embeddings)]
pub struct ProductEmbedding {
    pub id: i32,
    pub product_id: i32,
    pub embedding: Vec<u8>,
    pub created_at: NaiveDateTime,
}

/// Insertable form of [`ProductEmbedding`].
#[derive(Insertable)]
#[diesel(table_name = crate::schema::product_embeddings)]
pub struct NewProductEmbedding<'a> {
    pub product_id: i32,
    pub embedding: &'a [u8],
    pub created_at: NaiveDateTime,
}
