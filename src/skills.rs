//! Topic-to-skill matching: batched relevancy scoring over the taxonomy.
//!
//! The taxonomy is partitioned into fixed-size batches and each batch becomes
//! one oracle request carrying the scoring rubric plus the batch's rows.
//! Batches fan out with bounded, order-preserving concurrency; every batch
//! task resolves to its own outcome, so an unparsable reply costs exactly one
//! batch's skills and one error string, never the request.
//!
//! Concatenation is in batch-index order. Within a batch, skills keep
//! whatever order the oracle returned (it is asked for most-relevant first);
//! there is no global re-sort across batches.

use crate::categorize::Category;
use crate::config::ServiceConfig;
use crate::oracle::{parse_json_reply, Oracle, OracleRequest};
use crate::prompts;
use crate::taxonomy::Taxonomy;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Completion budget for one matching batch.
const MATCH_MAX_TOKENS: usize = 1500;

/// A taxonomy record scored against a topic. Field names match the wire
/// format of the taxonomy file plus the score and optional category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedSkill {
    #[serde(rename = "Domain", default)]
    pub domain: String,
    #[serde(rename = "Topic", default)]
    pub topic: String,
    #[serde(rename = "Skill", default)]
    pub skill: String,
    #[serde(rename = "Sub-skill", default)]
    pub sub_skill: String,
    #[serde(rename = "RelevancyScore", default)]
    pub relevancy_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// Combined result of all matching batches.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub skills: Vec<MatchedSkill>,
    /// One entry per failed batch; empty when every batch parsed.
    pub errors: Vec<String>,
    pub batches_processed: usize,
}

/// Shape of one batch's oracle reply. A reply without a `skills` array is a
/// valid empty batch, not an error.
#[derive(Debug, Deserialize)]
struct BatchReply {
    #[serde(default)]
    skills: Vec<MatchedSkill>,
}

/// Outcome of one batch task: skills on success, an error string otherwise.
struct BatchOutcome {
    skills: Vec<MatchedSkill>,
    error: Option<String>,
}

/// Score the whole taxonomy against `topic`, one oracle call per batch.
pub async fn match_topic(
    oracle: &Arc<dyn Oracle>,
    taxonomy: &Taxonomy,
    topic: &str,
    config: &ServiceConfig,
) -> MatchOutcome {
    let batches: Vec<&[crate::taxonomy::SkillRecord]> =
        taxonomy.batches(config.skill_batch_size).collect();
    let batch_count = batches.len();
    info!(
        "matching {} skills against \"{topic}\" in {batch_count} batches",
        taxonomy.len()
    );

    // Build each batch's owned request eagerly so the async stream below
    // captures only owned data (no borrow of the `&[SkillRecord]` slices),
    // which the closure's higher-ranked lifetime inference requires.
    let prepared: Vec<(usize, OracleRequest)> = batches
        .into_iter()
        .enumerate()
        .map(|(batch_index, batch)| {
            let skills_text = batch
                .iter()
                .map(|record| record.prompt_line())
                .collect::<Vec<_>>()
                .join("\n");
            let batch_len = batch.len();
            let request = OracleRequest::text(prompts::match_batch_prompt(
                topic,
                &skills_text,
                batch_index,
                batch_count,
            ))
            .with_system(prompts::MATCH_SYSTEM)
            .with_max_tokens(MATCH_MAX_TOKENS)
            .with_temperature(config.temperature);
            (batch_len, request)
        })
        .collect();

    let outcomes: Vec<BatchOutcome> = stream::iter(prepared.into_iter().enumerate().map(
        |(batch_index, (batch_len, request))| {
            let oracle = Arc::clone(oracle);
            async move {
                debug!(
                    "batch {}/{batch_count} prepared with {} skills",
                    batch_index + 1,
                    batch_len
                );

                match oracle.complete(request).await {
                    Ok(reply) => match parse_json_reply(&reply)
                        .and_then(serde_json::from_value::<BatchReply>)
                    {
                        Ok(parsed) => BatchOutcome {
                            skills: parsed.skills,
                            error: None,
                        },
                        Err(e) => {
                            warn!("batch {}: unparsable reply: {e}", batch_index + 1);
                            BatchOutcome {
                                skills: Vec::new(),
                                error: Some(format!(
                                    "Failed to parse JSON for batch {}: {e}",
                                    batch_index + 1
                                )),
                            }
                        }
                    },
                    Err(e) => {
                        warn!("batch {}: call failed: {e}", batch_index + 1);
                        BatchOutcome {
                            skills: Vec::new(),
                            error: Some(format!(
                                "Failed to process batch {}: {e}",
                                batch_index + 1
                            )),
                        }
                    }
                }
            }
        },
    ))
    .buffered(config.concurrency)
    .collect()
    .await;

    let mut skills = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        skills.extend(outcome.skills);
        if let Some(error) = outcome.error {
            errors.push(error);
        }
    }

    info!(
        "matched {} skills, {} batch errors",
        skills.len(),
        errors.len()
    );
    MatchOutcome {
        skills,
        errors,
        batches_processed: batch_count,
    }
}
