//! Integration tests for the pdf2curriculum HTTP service.
//!
//! These drive the full router through `tower::ServiceExt::oneshot` with a
//! deterministic stub oracle, so the whole client flow (clean text, build
//! the curriculum, match a topic) runs without any network dependency.
//!
//! Live-oracle runs are deliberately out of scope here; everything the
//! service does locally is covered deterministically.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pdf2curriculum::oracle::{Oracle, OracleError, OracleRequest};
use pdf2curriculum::{build_router, prompts, AppState, ServiceConfig, SkillRecord, Taxonomy};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────

/// Stub oracle for the full document flow: routes on the prompt family, like
/// a model that always cooperates except where a test poisons it.
struct DocumentOracle;

#[async_trait]
impl Oracle for DocumentOracle {
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let system = request.system.as_deref().unwrap_or_default();
        match system {
            s if s == prompts::STRUCTURE_SYSTEM => Ok("\
                Oakdale Junior High, Oregon, oakdale.edu\n\
                === GRADE: Grade 6 ===\nUnit: Ratios / topics: Unit Rates\n=== END GRADE ===\n\
                === GRADE: Grade 7 ===\nUnit: Proportions / topics: Scale Drawings\n=== END GRADE ==="
                .to_string()),
            s if s == prompts::METADATA_SYSTEM => Ok(json!({
                "schoolName": "Oakdale Junior High",
                "schoolState": "Oregon",
                "schoolLogo": "https://logo.clearbit.com/oakdale.edu"
            })
            .to_string()),
            s if s == prompts::GRADE_SYSTEM => {
                // The prompt pre-fills the grade name; answer for whichever
                // grade this call is about.
                let grade = if request.user.contains("\"Grade 7\"") {
                    "Grade 7"
                } else {
                    "Grade 6"
                };
                Ok(json!({
                    "Mathematics": {
                        "Oakdale Junior High": {
                            grade: { "Some Unit": { "Some Topic": {} } }
                        }
                    }
                })
                .to_string())
            }
            _ => Ok(request.user),
        }
    }
}

fn state_with(oracle: Arc<dyn Oracle>) -> Arc<AppState> {
    let taxonomy = Taxonomy::from_records(
        (0..7)
            .map(|i| SkillRecord {
                domain: "Number Sense".into(),
                topic: "Fractions".into(),
                skill: format!("Skill {i}"),
                sub_skill: format!("Sub-skill {i}"),
            })
            .collect(),
    );
    Arc::new(AppState {
        oracle,
        taxonomy: Arc::new(taxonomy),
        config: Arc::new(
            ServiceConfig::builder()
                .skill_batch_size(3)
                .concurrency(2)
                .build()
                .unwrap(),
        ),
    })
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ── Document flow ────────────────────────────────────────────────────────

#[tokio::test]
async fn clean_then_create_curriculum_round_trip() {
    let state = state_with(Arc::new(DocumentOracle));

    // Step 1: clean the extracted text.
    let app = build_router(state.clone());
    let response = app
        .oneshot(post_json(
            "/api/clean-text",
            json!({"extractedText": ["Oakdale Junior High", "Grade 6 ratios, Grade 7 proportions"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleaned = body_json(response).await;
    let cleaned_text = cleaned["cleanedText"].as_str().unwrap().to_string();
    assert!(cleaned_text.contains("=== GRADE: Grade 6 ==="));
    assert!(cleaned_text.contains("=== GRADE: Grade 7 ==="));

    // Step 2: feed the cleaned text back, exactly as the client does.
    let app = build_router(state);
    let response = app
        .oneshot(post_json(
            "/api/create-curriculum",
            json!({"cleanedText": cleaned_text}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let curriculum = body_json(response).await;
    assert_eq!(curriculum["metadata"]["schoolName"], "Oakdale Junior High");
    assert_eq!(curriculum["metadata"]["schoolState"], "Oregon");

    let school = &curriculum["curriculum"]["Mathematics"]["Oakdale Junior High"];
    assert!(school["Grade 6"]["Some Unit"]["Some Topic"].is_object());
    assert!(school["Grade 7"].is_object());
    assert!(curriculum.get("warnings").is_none());
}

#[tokio::test]
async fn skipped_grade_surfaces_as_warning() {
    /// Like [`DocumentOracle`] but Grade 7's structuring call fails.
    struct Grade7Down;

    #[async_trait]
    impl Oracle for Grade7Down {
        async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
            if request.system.as_deref() == Some(prompts::GRADE_SYSTEM)
                && request.user.contains("\"Grade 7\"")
            {
                return Err(OracleError::Api("rate limited".into()));
            }
            DocumentOracle.complete(request).await
        }
    }

    let state = state_with(Arc::new(Grade7Down));
    let app = build_router(state);
    let text = "Oakdale Junior High\n\
        === GRADE: Grade 6 === a === END GRADE ===\n\
        === GRADE: Grade 7 === b === END GRADE ===";
    let response = app
        .oneshot(post_json("/api/create-curriculum", json!({"cleanedText": text})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let curriculum = body_json(response).await;
    let school = &curriculum["curriculum"]["Mathematics"]["Oakdale Junior High"];
    assert!(school["Grade 6"].is_object());
    assert!(school.get("Grade 7").is_none());

    let warnings = curriculum["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("Grade 7"));
}

// ── Matching flow ────────────────────────────────────────────────────────

#[tokio::test]
async fn match_fans_out_over_batches_and_merges_in_order() {
    /// Scores every batch; replies carry the batch marker so cross-batch
    /// ordering is observable.
    struct BatchEcho;

    #[async_trait]
    impl Oracle for BatchEcho {
        async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
            // "Skills list (batch N/M)" appears in every match prompt.
            let marker = request
                .user
                .split("batch ")
                .nth(1)
                .and_then(|s| s.split('/').next())
                .unwrap_or("?")
                .to_string();
            Ok(json!({"skills": [{
                "Domain": "Number Sense", "Topic": "Fractions",
                "Skill": format!("from batch {marker}"), "Sub-skill": "s",
                "RelevancyScore": 90
            }]})
            .to_string())
        }
    }

    let state = state_with(Arc::new(BatchEcho));
    let app = build_router(state);
    let response = app
        .oneshot(post_json("/api/match", json!({"topic": "Fractions"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let matched = body_json(response).await;
    // 7 records at batch size 3 → 3 batches, one skill each, in batch order.
    assert_eq!(matched["batchesProcessed"], 3);
    let skills = matched["skills"].as_array().unwrap();
    assert_eq!(skills.len(), 3);
    assert_eq!(skills[0]["Skill"], "from batch 1");
    assert_eq!(skills[1]["Skill"], "from batch 2");
    assert_eq!(skills[2]["Skill"], "from batch 3");
    assert!(matched.get("errors").is_none());
}

#[tokio::test]
async fn one_unparsable_batch_is_one_error() {
    /// The second batch returns garbage; the rest score normally.
    struct SecondBatchGarbage;

    #[async_trait]
    impl Oracle for SecondBatchGarbage {
        async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
            if request.user.contains("batch 2/") {
                return Ok("<html>gateway timeout</html>".to_string());
            }
            Ok(json!({"skills": [{
                "Domain": "Number Sense", "Topic": "Fractions",
                "Skill": "S", "Sub-skill": "s", "RelevancyScore": 88
            }]})
            .to_string())
        }
    }

    let state = state_with(Arc::new(SecondBatchGarbage));
    let app = build_router(state);
    let response = app
        .oneshot(post_json("/api/match", json!({"topic": "Fractions"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let matched = body_json(response).await;
    assert_eq!(matched["batchesProcessed"], 3);
    assert_eq!(matched["skills"].as_array().unwrap().len(), 2);
    let errors = matched["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("batch 2"));
}

#[tokio::test]
async fn standards_flow_sorts_and_labels() {
    struct StandardsOracle;

    #[async_trait]
    impl Oracle for StandardsOracle {
        async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
            let system = request.system.as_deref().unwrap_or_default();
            if system == prompts::STANDARDS_SYSTEM {
                return Ok(json!({"standards": [
                    {"code": "CCSS.MATH.5.NF.A.1", "description": "Add fractions", "relevancyScore": 80},
                    {"code": "CCSS.MATH.6.EE.A.2", "description": "Expressions", "relevancyScore": 95}
                ]})
                .to_string());
            }
            if system == prompts::CATEGORIZE_SYSTEM {
                // Index 1 in the *sorted* shortlist is the grade-5 standard.
                return Ok(json!({"categorized": [
                    {"index": 0, "category": "Core"},
                    {"index": 1, "category": "Foundational"}
                ]})
                .to_string());
            }
            Ok(request.user)
        }
    }

    let state = state_with(Arc::new(StandardsOracle));
    let app = build_router(state);
    let response = app
        .oneshot(post_json(
            "/api/standards",
            json!({"topic": "Expressions", "state": "Common Core", "grade": "6"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = body_json(response).await;
    let standards = parsed["standards"].as_array().unwrap();
    assert_eq!(standards.len(), 2);
    // Sorted descending by relevancy, then labelled by shortlist position.
    assert_eq!(standards[0]["code"], "CCSS.MATH.6.EE.A.2");
    assert_eq!(standards[0]["category"], "Core");
    assert_eq!(standards[1]["code"], "CCSS.MATH.5.NF.A.1");
    assert_eq!(standards[1]["category"], "Foundational");
}

// ── Input validation ─────────────────────────────────────────────────────

#[tokio::test]
async fn missing_fields_are_client_errors() {
    let cases = vec![
        ("/api/match", json!({})),
        ("/api/standards", json!({"topic": "Fractions"})),
        ("/api/standards", json!({"state": "Ohio"})),
        ("/api/clean-text", json!({"extractedText": []})),
        ("/api/create-curriculum", json!({"cleanedText": ""})),
    ];
    for (uri, body) in cases {
        let state = state_with(Arc::new(DocumentOracle));
        let response = build_router(state)
            .oneshot(post_json(uri, body.clone()))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for {uri} with {body}"
        );
        let parsed = body_json(response).await;
        assert!(parsed["error"].is_string());
    }
}
