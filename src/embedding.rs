//! Title embedding capability and vector helpers.
//!
//! Product identity is compared through fixed-dimension title embeddings.
//! The production implementation wraps `fastembed`; the trait keeps the
//! pipeline testable with deterministic stand-ins.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

/// Dimension of every title embedding.
pub const EMBEDDING_DIM: usize = 384;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Empty embedding")]
    EmptyEmbedding,
    #[error("Load model error")]
    LoadModel,
    #[error("Embedding generation error")]
    EmbeddingGeneration,
    #[error("Expected a {EMBEDDING_DIM}-dimension vector, got {0}")]
    WrongDimension(usize),
}

/// Converts listing titles into unit-length vectors of [`EMBEDDING_DIM`]
/// floats. Implementations must be deterministic for the same input.
pub trait TitleEmbedder {
    fn embed(&self, title: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// `fastembed`-backed embedder using the 384-dimension MiniLM model.
///
/// Loading the model is expensive, so it happens once in [`Self::new`]; the
/// mutex exists because `fastembed` requires `&mut` access per call.
pub struct FastembedEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastembedEmbedder {
    pub fn new() -> Result<Self, EmbeddingError> {
        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2);
        let model = TextEmbedding::try_new(options).map_err(|_| EmbeddingError::LoadModel)?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl TitleEmbedder for FastembedEmbedder {
    fn embed(&self, title: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::EmbeddingGeneration)?;
        let embeddings = model
            .embed(vec![title], None)
            .map_err(|_| EmbeddingError::EmbeddingGeneration)?;
        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or(EmbeddingError::EmptyEmbedding)?;
        if embedding.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::WrongDimension(embedding.len()));
        }
        Ok(normalize(embedding))
    }
}

/// Rescale a vector to unit length so cosine distance is meaningful.
/// Zero vectors are returned unchanged.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

/// Cosine distance (1 - cosine similarity) between two vectors. Lower means
/// more similar; 0.0 for identical directions.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Encode a vector into the little-endian `f32` blob stored on embedding
/// rows.
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a stored blob back into a vector, validating the dimension.
pub fn blob_to_vector(blob: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
    if blob.len() != EMBEDDING_DIM * 4 {
        return Err(EmbeddingError::WrongDimension(blob.len() / 4));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
