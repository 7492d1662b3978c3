//! # pdf2curriculum
//!
//! Extract curriculum structure from scanned PDF curriculum documents using
//! Vision Language Models, and match free-text topics against a fixed
//! skill/standard taxonomy.
//!
//! ## Why this crate?
//!
//! Curriculum documents arrive as scans: text-layer extraction produces
//! garbage, and the interesting structure (grades, units, topics) is layout,
//! not text. Instead each page is rasterised to a PNG by an external tool and
//! read by a VLM as a human would; the model also does the cleanup,
//! structuring, and relevancy scoring. Everything here is the orchestration
//! around those calls (chunking, fan-out, segmentation, merging), which
//! is exactly the part that must keep working when individual calls fail.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Rasterize  external CLI tool → page-*.png
//!  ├─ 2. Extract    one vision call per page (batches of 5)
//!  ├─ 3. Clean      per-chunk cleanup fan-out + one structuring pass
//!  ├─ 4. Segment    === GRADE: … === sections + school-info header
//!  ├─ 5. Structure  metadata call + sequential per-grade calls
//!  └─ 6. Merge      per-grade JSON subtrees → one curriculum tree
//!
//! topic ──▶ Match (batched taxonomy scoring) ──▶ Categorize (Core/Foundational)
//! topic + jurisdiction ──▶ Standards lookup ──▶ Categorize
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2curriculum::{build_router, AppState, ServiceConfig, Taxonomy};
//! use pdf2curriculum::oracle::resolve_oracle;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ServiceConfig::default();
//!     let oracle = resolve_oracle(&config)?;
//!     let taxonomy = Taxonomy::load(&config.taxonomy_path)?;
//!
//!     let state = Arc::new(AppState {
//!         oracle,
//!         taxonomy: Arc::new(taxonomy),
//!         config: Arc::new(config),
//!     });
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, build_router(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! One bad oracle call never takes down a request. A failed page keeps its
//! siblings, a failed cleanup chunk falls back to its raw text, a failed
//! skill batch contributes one error string, a failed grade becomes a
//! warning on the response, and the categorizer fails open to `"Core"`.
//! Only rasterizer failures and the handful of calls with no sensible
//! substitute surface as HTTP 500.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod categorize;
pub mod config;
pub mod error;
pub mod oracle;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod skills;
pub mod standards;
pub mod taxonomy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use categorize::Category;
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::CurriculumError;
pub use oracle::{LlmOracle, Oracle, OracleError, OracleRequest};
pub use pipeline::segment::{split_by_grade, GradeSection};
pub use pipeline::structure::{CurriculumExtraction, SchoolMetadata};
pub use server::{build_router, AppState, SharedState};
pub use skills::{MatchOutcome, MatchedSkill};
pub use standards::StandardRecord;
pub use taxonomy::{SkillRecord, Taxonomy};
