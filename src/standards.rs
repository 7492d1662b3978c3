//! Jurisdiction standards lookup for a topic.
//!
//! One oracle call per request; the model is the source of the standards
//! themselves, so the local job is the prompt, the null-tolerant parse, and
//! the descending relevancy sort. Every failure mode yields an empty list;
//! a topic with no findable standards is an ordinary answer, not an error.

use crate::categorize::Category;
use crate::config::ServiceConfig;
use crate::oracle::{parse_json_reply, Oracle, OracleRequest};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Completion budget for one standards lookup.
const STANDARDS_MAX_TOKENS: usize = 2000;

/// One educational standard scored against a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardRecord {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// Missing scores deserialize to 0 and sort last.
    #[serde(rename = "relevancyScore", default)]
    pub relevancy_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// Reply shape. `standards: null` is the model saying "none found" and
/// deserializes to an empty list.
#[derive(Debug, Deserialize)]
struct StandardsReply {
    #[serde(default)]
    standards: Option<Vec<StandardRecord>>,
}

/// Find the jurisdiction's standards relevant to `topic`, sorted by
/// descending relevancy (stable, so ties keep the model's order).
pub async fn find_standards(
    oracle: &Arc<dyn Oracle>,
    topic: &str,
    state: &str,
    config: &ServiceConfig,
) -> Vec<StandardRecord> {
    // "Common Core" alone under-specifies; the full name steers the model to
    // real CCSS codes.
    let jurisdiction = if state == "Common Core" {
        "Common Core State Standards (CCSS)"
    } else {
        state
    };

    info!("finding {jurisdiction} standards for topic \"{topic}\"");

    let request = OracleRequest::text(prompts::standards_prompt(topic, jurisdiction))
        .with_system(prompts::STANDARDS_SYSTEM)
        .with_max_tokens(STANDARDS_MAX_TOKENS)
        .with_temperature(config.temperature);

    let reply = match oracle.complete(request).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("standards call failed, returning no standards: {e}");
            return Vec::new();
        }
    };

    let mut standards = match parse_json_reply(&reply)
        .and_then(serde_json::from_value::<StandardsReply>)
    {
        Ok(parsed) => parsed.standards.unwrap_or_default(),
        Err(e) => {
            warn!("standards reply unparsable, returning no standards: {e}");
            return Vec::new();
        }
    };

    standards.sort_by(|a, b| b.relevancy_score.cmp(&a.relevancy_score));
    info!("found {} standards", standards.len());
    standards
}
