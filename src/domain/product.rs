use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::types::{ProductId, ProductName};

/// A canonical real-world item that one or more listings resolve to.
/// Products are only ever minted by entity resolution, named after the
/// listing title that created them.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: ProductName,
    /// Set by an external reviewer when the name was corrected by hand.
    pub manual_override: bool,
    pub created_at: NaiveDateTime,
}
