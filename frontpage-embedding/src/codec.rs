//! pgvector text encoding for stored embeddings
//!
//! Vectors cross the repository boundary as `[0.1,0.2,...]` literals. The
//! clustering math never sees this format; it only works on decoded
//! `Vec<f32>` values.

use frontpage_core::EmbeddingVector;

use crate::error::{EmbeddingError, Result};

/// Encode a vector as a pgvector literal
pub fn encode_vector(vector: &[f32]) -> Result<String> {
    if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
        return Err(EmbeddingError::MalformedVector(format!(
            "non-finite value at position {}",
            position
        )));
    }

    serde_json::to_string(vector).map_err(|e| EmbeddingError::MalformedVector(e.to_string()))
}

/// Decode a pgvector literal, checking it has `expected_dimension` values
pub fn decode_vector(raw: &str, expected_dimension: usize) -> Result<EmbeddingVector> {
    let vector: EmbeddingVector = serde_json::from_str(raw.trim())
        .map_err(|e| EmbeddingError::MalformedVector(format!("unparsable vector: {}", e)))?;

    if vector.len() != expected_dimension {
        return Err(EmbeddingError::InvalidDimension {
            expected: expected_dimension,
            actual: vector.len(),
        });
    }

    Ok(vector)
}
