//! Text cleanup: turn raw per-page extractions into grade-delimited text.
//!
//! Two oracle stages with different failure policies:
//!
//! 1. **Per-chunk cleanup** — bounded concurrent fan-out, order-preserving.
//!    A failed chunk falls back to its raw text: losing one cleanup pass is
//!    cheaper than losing the words in it.
//! 2. **Final structuring** — one call over the joined cleaned text that
//!    emits the `=== GRADE: … ===` sections. There is no sensible fallback
//!    for this one; its failure fails the request.

use crate::config::ServiceConfig;
use crate::error::CurriculumError;
use crate::oracle::{Oracle, OracleRequest};
use crate::pipeline::chunk::split_into_chunks;
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Completion budget for one chunk's cleanup call.
const CHUNK_CLEAN_MAX_TOKENS: usize = 1500;
/// Completion budget for the final structuring call.
const STRUCTURE_MAX_TOKENS: usize = 2500;

/// Clean the extracted page texts and structure them into grade-delimited
/// form.
///
/// `extracted_text` is one entry per page, joined with blank lines before
/// chunking so page boundaries survive as paragraph breaks.
pub async fn clean_text(
    oracle: &Arc<dyn Oracle>,
    extracted_text: &[String],
    config: &ServiceConfig,
) -> Result<String, CurriculumError> {
    let combined = extracted_text.join("\n\n");
    info!("cleaning extracted text: {} chars", combined.len());

    let chunks = split_into_chunks(&combined, config.words_per_chunk);
    let total = chunks.len();
    debug!("split into {total} chunks for cleanup");

    // Order-preserving bounded fan-out; each task resolves to cleaned text
    // or falls back to the raw chunk.
    let cleaned_chunks: Vec<String> = stream::iter(chunks.into_iter().enumerate().map(
        |(index, chunk)| {
            let oracle = Arc::clone(oracle);
            async move {
                let request = OracleRequest::text(prompts::chunk_clean_prompt(
                    &chunk, index, total,
                ))
                .with_system(prompts::CHUNK_CLEAN_SYSTEM)
                .with_max_tokens(CHUNK_CLEAN_MAX_TOKENS)
                .with_temperature(config.temperature);

                match oracle.complete(request).await {
                    Ok(cleaned) => cleaned,
                    Err(e) => {
                        warn!("chunk {}/{total}: cleanup failed, keeping raw text: {e}", index + 1);
                        chunk
                    }
                }
            }
        },
    ))
    .buffered(config.concurrency)
    .collect()
    .await;

    let combined_cleaned = cleaned_chunks.join("\n\n");
    debug!("combined cleaned chunks: {} chars", combined_cleaned.len());

    let request = OracleRequest::text(prompts::structure_text_prompt(&combined_cleaned))
        .with_system(prompts::STRUCTURE_SYSTEM)
        .with_max_tokens(STRUCTURE_MAX_TOKENS)
        .with_temperature(config.temperature);
    let structured = oracle.complete(request).await?;

    info!("structured cleaned text: {} chars", structured.len());
    Ok(structured)
}
