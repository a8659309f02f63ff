//! The similarity-threshold decision procedure of the entity resolution
//! engine.

use crate::domain::types::{ProductId, SimilarityDistance};

/// Listings whose nearest product embedding lies strictly below this cosine
/// distance reuse that product; everything else mints a new one.
pub const MATCH_THRESHOLD: f32 = 0.15;

/// Outcome of resolving one aggregated listing against the existing
/// product embeddings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Reuse an existing product. The decision is final; no tie handling
    /// among further candidates.
    Existing {
        product_id: ProductId,
        distance: SimilarityDistance,
    },
    /// Mint a new product named after the listing title, together with its
    /// embedding. The audit distance recorded for this case is 0.0 since
    /// no match was attempted against the new product itself.
    New,
}

impl Resolution {
    /// Decide from the top-1 nearest-neighbour result, if any.
    pub fn decide(nearest: Option<(ProductId, f32)>) -> Self {
        match nearest {
            Some((product_id, distance)) if distance < MATCH_THRESHOLD => {
                // Floating point dot products can dip a hair below zero for
                // identical vectors.
                let distance = distance.max(0.0);
                match SimilarityDistance::new(distance) {
                    Ok(distance) => Self::Existing {
                        product_id,
                        distance,
                    },
                    Err(_) => Self::New,
                }
            }
            _ => Self::New,
        }
    }

    /// The distance recorded on the candidate audit row.
    pub fn audit_distance(&self) -> SimilarityDistance {
        match self {
            Self::Existing { distance, .. } => *distance,
            Self::New => SimilarityDistance::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> ProductId {
        ProductId::new(7).unwrap()
    }

    #[test]
    fn reuses_product_strictly_below_threshold() {
        let resolution = Resolution::decide(Some((product(), 0.149_999_9)));
        assert!(matches!(
            resolution,
            Resolution::Existing { product_id, .. } if product_id == product()
        ));
    }

    #[test]
    fn mints_new_product_at_exact_threshold() {
        assert_eq!(Resolution::decide(Some((product(), 0.15))), Resolution::New);
    }

    #[test]
    fn mints_new_product_above_threshold() {
        assert_eq!(Resolution::decide(Some((product(), 0.9))), Resolution::New);
    }

    #[test]
    fn mints_new_product_when_no_neighbour_exists() {
        assert_eq!(Resolution::decide(None), Resolution::New);
    }

    #[test]
    fn audit_distance_is_zero_for_new_products() {
        assert_eq!(Resolution::New.audit_distance(), 0.0);
    }

    #[test]
    fn clamps_negative_float_noise() {
        let resolution = Resolution::decide(Some((product(), -1.0e-7)));
        assert!(matches!(
            resolution,
            Resolution::Existing { distance, .. } if distance == 0.0
        ));
    }
}
