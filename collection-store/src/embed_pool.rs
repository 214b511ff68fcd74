//! Embedding executor with concurrency and dimension checks.

use embedding_functions::EmbeddingFunction;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::errors::StoreError;

/// Embeds `texts` with `function`, returning vectors in input order.
///
/// # Arguments
/// - `expected_dim`: every vector must have exactly this length.
/// - `concurrency`: maximum number of in-flight embedding calls.
///
/// # Errors
/// [`StoreError::DimensionMismatch`] on a wrong-sized vector,
/// [`StoreError::Embedding`] if the provider fails.
pub async fn embed_texts(
    texts: &[String],
    function: &dyn EmbeddingFunction,
    expected_dim: usize,
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, StoreError> {
    if texts.is_empty() {
        debug!("embed_pool::embed_texts: nothing to embed");
        return Ok(Vec::new());
    }

    info!(
        "embed_pool::embed_texts: provider={} total={} concurrency={}",
        function.name(),
        texts.len(),
        concurrency
    );

    let mut results: Vec<(usize, Vec<f32>)> = stream::iter(texts.iter().enumerate())
        .map(|(i, text)| async move {
            let out = function.generate_text(text).await?;
            Ok::<(usize, Vec<f32>), StoreError>((i, out.embedding))
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, StoreError>>()?;

    for (_, v) in &results {
        if v.len() != expected_dim {
            return Err(StoreError::DimensionMismatch {
                got: v.len(),
                want: expected_dim,
            });
        }
    }

    results.sort_unstable_by_key(|(i, _)| *i);
    debug!("embed_pool::embed_texts: {} embeddings ready", results.len());
    Ok(results.into_iter().map(|(_, v)| v).collect())
}
