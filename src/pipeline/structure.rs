//! Curriculum structuring: delimited text → metadata + merged tree.
//!
//! Drives the tail of the document pipeline: school metadata extraction over
//! the header, one structuring call per grade section, and the merge.
//!
//! ## Why are grades sequential?
//!
//! Grade sections are processed one at a time, not fanned out. Each call then
//! carries only one grade's text, which keeps the oracle's context small and
//! its JSON shape reliable; latency is the accepted cost. Failed grades are
//! skipped, recorded in `warnings`, and never abort their siblings.

use crate::config::ServiceConfig;
use crate::error::CurriculumError;
use crate::oracle::{parse_json_reply, Oracle, OracleRequest};
use crate::pipeline::merge::merge_curriculum;
use crate::pipeline::segment::{extract_school_info, split_by_grade};
use crate::prompts;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Completion budget for the metadata call.
const METADATA_MAX_TOKENS: usize = 500;
/// Completion budget for one grade's structuring call.
const GRADE_MAX_TOKENS: usize = 2000;

/// School identity extracted from the document header.
///
/// Sentinel defaults are used whenever the metadata reply cannot be parsed;
/// a curriculum with an unknown school is still a usable curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolMetadata {
    #[serde(default = "default_school_name")]
    pub school_name: String,
    #[serde(default = "default_school_state")]
    pub school_state: String,
    #[serde(default = "default_school_logo")]
    pub school_logo: String,
}

fn default_school_name() -> String {
    "Unknown School".to_string()
}

fn default_school_state() -> String {
    "Unknown State".to_string()
}

fn default_school_logo() -> String {
    "https://logo.clearbit.com/example.com".to_string()
}

impl Default for SchoolMetadata {
    fn default() -> Self {
        Self {
            school_name: default_school_name(),
            school_state: default_school_state(),
            school_logo: default_school_logo(),
        }
    }
}

/// The structured output of one document: metadata, merged tree, and the
/// grades that had to be skipped along the way.
#[derive(Debug, Clone, Serialize)]
pub struct CurriculumExtraction {
    pub metadata: SchoolMetadata,
    pub curriculum: Value,
    /// One entry per grade section whose structuring call failed. Empty when
    /// every grade made it into the tree.
    pub warnings: Vec<String>,
}

/// Build the curriculum tree from grade-delimited cleaned text.
///
/// Metadata call failure is fatal (there is no tree without a school to hang
/// it on); metadata *parse* failure falls back to sentinel defaults.
/// Per-grade failures are absorbed: the grade is skipped and recorded in
/// `warnings`.
pub async fn create_curriculum(
    oracle: &Arc<dyn Oracle>,
    cleaned_text: &str,
    config: &ServiceConfig,
) -> Result<CurriculumExtraction, CurriculumError> {
    // ── School metadata ──────────────────────────────────────────────────
    let school_info = extract_school_info(cleaned_text);
    let request = OracleRequest::text(prompts::metadata_prompt(school_info))
        .with_system(prompts::METADATA_SYSTEM)
        .with_max_tokens(METADATA_MAX_TOKENS)
        .with_temperature(config.temperature);
    let raw = oracle.complete(request).await?;

    let metadata = match parse_json_reply(&raw).and_then(serde_json::from_value::<SchoolMetadata>) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("metadata reply unparsable, using defaults: {e}");
            SchoolMetadata::default()
        }
    };
    info!(school = %metadata.school_name, "extracted school metadata");

    // ── Per-grade structuring, one grade at a time ───────────────────────
    let sections = split_by_grade(cleaned_text);
    info!("split cleaned text into {} grade sections", sections.len());

    let mut grade_results: Vec<Value> = Vec::with_capacity(sections.len());
    let mut warnings = Vec::new();

    for (index, section) in sections.iter().enumerate() {
        info!(
            "structuring grade {}/{}: {}",
            index + 1,
            sections.len(),
            section.grade_name
        );

        let request = OracleRequest::text(prompts::grade_structure_prompt(
            &metadata.school_name,
            &section.grade_name,
            &section.text,
        ))
        .with_system(prompts::GRADE_SYSTEM)
        .with_max_tokens(GRADE_MAX_TOKENS)
        .with_temperature(config.temperature);

        match oracle.complete(request).await {
            Ok(reply) => match parse_json_reply(&reply) {
                Ok(tree) => grade_results.push(json!({ "curriculum": tree })),
                Err(e) => {
                    warn!("grade '{}': unparsable reply: {e}", section.grade_name);
                    warnings.push(format!(
                        "grade '{}' skipped: unparsable structuring reply",
                        section.grade_name
                    ));
                }
            },
            Err(e) => {
                warn!("grade '{}': structuring call failed: {e}", section.grade_name);
                warnings.push(format!(
                    "grade '{}' skipped: structuring call failed",
                    section.grade_name
                ));
            }
        }
    }

    let curriculum = merge_curriculum(&grade_results, &metadata.school_name);
    info!(
        "merged {} of {} grade sections",
        grade_results.len(),
        sections.len()
    );

    Ok(CurriculumExtraction {
        metadata,
        curriculum,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use async_trait::async_trait;

    /// Replies to metadata and grade prompts with canned JSON; grades whose
    /// name contains "Broken" fail their call.
    struct ScriptedOracle;

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
            if request.system.as_deref() == Some(prompts::METADATA_SYSTEM) {
                return Ok(r#"{"schoolName": "Lincoln Middle", "schoolState": "Ohio",
                              "schoolLogo": "https://logo.clearbit.com/lincoln.edu"}"#
                    .to_string());
            }
            if request.user.contains("\"Broken") {
                return Err(OracleError::Api("overloaded".into()));
            }
            // The grade name is pre-filled in the prompt; echo a minimal tree
            // for Grade 6 regardless.
            Ok(r#"{"Mathematics": {"Lincoln Middle": {"Grade 6": {"Ratios": {"Rates": {}}}}}}"#
                .to_string())
        }
    }

    const TEXT: &str = "Lincoln Middle School, Ohio\n\
        === GRADE: Grade 6 ===\nRatios\n=== END GRADE ===\n\
        === GRADE: Broken Grade ===\nlost\n=== END GRADE ===";

    #[tokio::test]
    async fn failed_grade_becomes_warning_not_error() {
        let oracle: Arc<dyn Oracle> = Arc::new(ScriptedOracle);
        let config = ServiceConfig::default();

        let extraction = create_curriculum(&oracle, TEXT, &config).await.unwrap();

        assert_eq!(extraction.metadata.school_name, "Lincoln Middle");
        assert_eq!(extraction.warnings.len(), 1);
        assert!(extraction.warnings[0].contains("Broken Grade"));
        assert_eq!(
            extraction.curriculum["Mathematics"]["Lincoln Middle"]["Grade 6"]["Ratios"],
            serde_json::json!({"Rates": {}})
        );
    }

    #[tokio::test]
    async fn unparsable_metadata_falls_back_to_defaults() {
        struct BadMetadata;
        #[async_trait]
        impl Oracle for BadMetadata {
            async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
                if request.system.as_deref() == Some(prompts::METADATA_SYSTEM) {
                    Ok("this is not json".to_string())
                } else {
                    Ok(r#"{"Mathematics": {"S": {"G": {}}}}"#.to_string())
                }
            }
        }

        let oracle: Arc<dyn Oracle> = Arc::new(BadMetadata);
        let config = ServiceConfig::default();
        let extraction = create_curriculum(&oracle, "plain text, no markers", &config)
            .await
            .unwrap();

        assert_eq!(extraction.metadata, SchoolMetadata::default());
        // The unknown-grade fallback section still got structured and merged
        // under the sentinel school name.
        assert!(extraction.curriculum["Mathematics"]["Unknown School"].is_object());
    }

    #[tokio::test]
    async fn metadata_call_failure_is_fatal() {
        struct Down;
        #[async_trait]
        impl Oracle for Down {
            async fn complete(&self, _request: OracleRequest) -> Result<String, OracleError> {
                Err(OracleError::Api("down".into()))
            }
        }

        let oracle: Arc<dyn Oracle> = Arc::new(Down);
        let config = ServiceConfig::default();
        let err = create_curriculum(&oracle, "text", &config).await.unwrap_err();
        assert!(matches!(err, CurriculumError::Oracle(_)));
    }

    #[test]
    fn partial_metadata_reply_fills_sentinels() {
        let value = serde_json::json!({"schoolName": "X"});
        let metadata: SchoolMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(metadata.school_name, "X");
        assert_eq!(metadata.school_state, "Unknown State");
        assert!(metadata.school_logo.contains("clearbit"));
    }
}
