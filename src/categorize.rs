//! Core/Foundational categorization of shortlisted skills and standards.
//!
//! One oracle call labels every item as taught-at-this-grade ("Core") or a
//! lower-grade prerequisite ("Foundational"). Skills are grouped to the
//! Domain > Topic > Skill level first: sub-skills of one skill always share
//! a label, and a grouped list keeps the prompt a fraction of the size.
//!
//! The reply is keyed by 0-based position into the prompted list, mapped back
//! onto the original records afterwards. The whole pass is **fail-open**: an
//! omitted index, an unparsable reply, or a failed call defaults to "Core";
//! mislabelling a prerequisite as core is recoverable downstream, dropping
//! records is not.

use crate::config::ServiceConfig;
use crate::oracle::{parse_json_reply, Oracle, OracleRequest};
use crate::prompts::{self, CategorizeKind};
use crate::skills::MatchedSkill;
use crate::standards::StandardRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Completion budget for one categorization call.
const CATEGORIZE_MAX_TOKENS: usize = 1500;

/// Whether an item is taught at the target grade or is a lower-grade
/// prerequisite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Core,
    Foundational,
}

#[derive(Debug, Deserialize)]
struct CategorizedReply {
    #[serde(default)]
    categorized: Vec<CategoryLabel>,
}

#[derive(Debug, Deserialize)]
struct CategoryLabel {
    index: usize,
    category: Category,
}

/// Skills collapsed to the Domain > Topic > Skill level for prompting.
struct SkillGroup {
    domain: String,
    topic: String,
    skill: String,
    sub_skills: Vec<String>,
}

/// Label shortlisted skills for `topic` at `grade`.
///
/// Returns the input records (grouped order) with `category` set on every
/// one; sub-skills inherit their group's label.
pub async fn categorize_skills(
    oracle: &Arc<dyn Oracle>,
    topic: &str,
    grade: &str,
    items: &[MatchedSkill],
    config: &ServiceConfig,
) -> Vec<MatchedSkill> {
    if items.is_empty() {
        return Vec::new();
    }

    // Group to skill level, preserving first-seen order so reply indices
    // stay aligned with the prompt.
    let mut groups: Vec<SkillGroup> = Vec::new();
    let mut group_index: HashMap<(String, String, String), usize> = HashMap::new();
    for item in items {
        let key = (item.domain.clone(), item.topic.clone(), item.skill.clone());
        let idx = *group_index.entry(key).or_insert_with(|| {
            groups.push(SkillGroup {
                domain: item.domain.clone(),
                topic: item.topic.clone(),
                skill: item.skill.clone(),
                sub_skills: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].sub_skills.push(item.sub_skill.clone());
    }

    let items_text = groups
        .iter()
        .map(|g| {
            format!(
                "{} > {} > {} (Sub-skills: {})",
                g.domain,
                g.topic,
                g.skill,
                g.sub_skills.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    info!(
        "categorizing {} skill groups for topic \"{topic}\", grade {grade}",
        groups.len()
    );

    let Some(labels) =
        fetch_labels(oracle, topic, grade, &items_text, CategorizeKind::Skills, config).await
    else {
        // Fail-open: every record keeps its data, labelled Core.
        return items
            .iter()
            .cloned()
            .map(|mut item| {
                item.category = Some(Category::Core);
                item
            })
            .collect();
    };

    let mut labelled = Vec::with_capacity(items.len());
    for (index, group) in groups.iter().enumerate() {
        let category = labels.get(&index).copied().unwrap_or(Category::Core);
        for item in items.iter().filter(|item| {
            item.domain == group.domain && item.topic == group.topic && item.skill == group.skill
        }) {
            let mut item = item.clone();
            item.category = Some(category);
            labelled.push(item);
        }
    }
    labelled
}

/// Label shortlisted standards for `topic` at `grade`.
///
/// Standards are prompted as-is (one line per record) and mapped back by
/// position; the same fail-open rules apply.
pub async fn categorize_standards(
    oracle: &Arc<dyn Oracle>,
    topic: &str,
    grade: &str,
    items: &[StandardRecord],
    config: &ServiceConfig,
) -> Vec<StandardRecord> {
    if items.is_empty() {
        return Vec::new();
    }

    let items_text = items
        .iter()
        .map(|s| format!("{}: {}", s.code, s.description))
        .collect::<Vec<_>>()
        .join("\n");

    info!(
        "categorizing {} standards for topic \"{topic}\", grade {grade}",
        items.len()
    );

    let Some(labels) = fetch_labels(
        oracle,
        topic,
        grade,
        &items_text,
        CategorizeKind::Standards,
        config,
    )
    .await
    else {
        return items
            .iter()
            .cloned()
            .map(|mut item| {
                item.category = Some(Category::Core);
                item
            })
            .collect();
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut item = item.clone();
            item.category = Some(labels.get(&index).copied().unwrap_or(Category::Core));
            item
        })
        .collect()
}

/// Issue the categorization call and parse its index-keyed labels.
/// `None` means the caller should fail open.
async fn fetch_labels(
    oracle: &Arc<dyn Oracle>,
    topic: &str,
    grade: &str,
    items_text: &str,
    kind: CategorizeKind,
    config: &ServiceConfig,
) -> Option<HashMap<usize, Category>> {
    let request =
        OracleRequest::text(prompts::categorize_prompt(topic, grade, items_text, kind))
            .with_system(prompts::CATEGORIZE_SYSTEM)
            .with_max_tokens(CATEGORIZE_MAX_TOKENS)
            .with_temperature(config.temperature);

    let reply = match oracle.complete(request).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("categorization call failed, defaulting to Core: {e}");
            return None;
        }
    };

    match parse_json_reply(&reply).and_then(serde_json::from_value::<CategorizedReply>) {
        Ok(parsed) => Some(
            parsed
                .categorized
                .into_iter()
                .map(|label| (label.index, label.category))
                .collect(),
        ),
        Err(e) => {
            warn!("categorization reply unparsable, defaulting to Core: {e}");
            None
        }
    }
}
