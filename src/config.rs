//! Configuration for the extraction and matching pipelines.
//!
//! All behaviour is controlled through [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share the config across handlers behind an `Arc`, log it when the server
//! boots, and diff two deployments to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::CurriculumError;
use crate::oracle::Oracle;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for document extraction and topic matching.
///
/// Built via [`ServiceConfig::builder()`] or [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2curriculum::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .words_per_chunk(400)
///     .concurrency(4)
///     .model("gpt-4.1")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// LLM model identifier, e.g. "gpt-4.1". If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic"). If None along with
    /// `oracle`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed oracle. Takes precedence over `provider_name`.
    /// This is the injection point tests use for deterministic stubs.
    pub oracle: Option<Arc<dyn Oracle>>,

    /// Sampling temperature for all oracle calls. Default: 0.2.
    ///
    /// Low temperature keeps the model faithful to what is on the page and to
    /// the requested JSON shapes; creativity only hurts extraction.
    pub temperature: f32,

    /// Target word count per text chunk in the cleanup stage. Default: 550.
    ///
    /// Around 550 words a chunk stays comfortably inside the per-call
    /// completion budget while amortising the fixed prompt overhead.
    pub words_per_chunk: usize,

    /// Page images per vision batch during upload processing. Default: 5.
    ///
    /// Pages within a batch are extracted concurrently; batches run one after
    /// another so a hundred-page upload never holds a hundred open calls.
    pub page_batch_size: usize,

    /// Taxonomy records per matching batch. Default: 100.
    ///
    /// The whole batch is inlined into one prompt; 100 rows keeps the prompt
    /// a few thousand tokens and the scored reply inside its budget.
    pub skill_batch_size: usize,

    /// Bounded fan-out for chunk cleanup and skill-batch calls. Default: 8.
    ///
    /// Oracle calls are network-bound; a small bound recovers most of the
    /// wall-clock win of full parallelism without tripping rate limits.
    pub concurrency: usize,

    /// External rasterizer command. Default: "pdftocairo".
    ///
    /// Invoked as `<rasterizer> -png <pdf> <dir>/page`, producing
    /// `page-*.png` files the pipeline collects in name order.
    pub rasterizer: String,

    /// Path to the CSV skill taxonomy. Default: "Skills.csv".
    pub taxonomy_path: PathBuf,

    /// Minimum relevancy score for a skill to enter the categorization pass.
    /// Default: 80.
    pub skill_shortlist_min: u32,

    /// Minimum relevancy score for a standard to enter the categorization
    /// pass. Default: 75.
    pub standards_shortlist_min: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            oracle: None,
            temperature: 0.2,
            words_per_chunk: 550,
            page_batch_size: 5,
            skill_batch_size: 100,
            concurrency: 8,
            rasterizer: "pdftocairo".into(),
            taxonomy_path: PathBuf::from("Skills.csv"),
            skill_shortlist_min: 80,
            standards_shortlist_min: 75,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("oracle", &self.oracle.as_ref().map(|_| "<dyn Oracle>"))
            .field("temperature", &self.temperature)
            .field("words_per_chunk", &self.words_per_chunk)
            .field("page_batch_size", &self.page_batch_size)
            .field("skill_batch_size", &self.skill_batch_size)
            .field("concurrency", &self.concurrency)
            .field("rasterizer", &self.rasterizer)
            .field("taxonomy_path", &self.taxonomy_path)
            .field("skill_shortlist_min", &self.skill_shortlist_min)
            .field("standards_shortlist_min", &self.standards_shortlist_min)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.config.oracle = Some(oracle);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn words_per_chunk(mut self, n: usize) -> Self {
        self.config.words_per_chunk = n.max(1);
        self
    }

    pub fn page_batch_size(mut self, n: usize) -> Self {
        self.config.page_batch_size = n.max(1);
        self
    }

    pub fn skill_batch_size(mut self, n: usize) -> Self {
        self.config.skill_batch_size = n.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn rasterizer(mut self, command: impl Into<String>) -> Self {
        self.config.rasterizer = command.into();
        self
    }

    pub fn taxonomy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.taxonomy_path = path.into();
        self
    }

    pub fn skill_shortlist_min(mut self, score: u32) -> Self {
        self.config.skill_shortlist_min = score.min(100);
        self
    }

    pub fn standards_shortlist_min(mut self, score: u32) -> Self {
        self.config.standards_shortlist_min = score.min(100);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, CurriculumError> {
        let c = &self.config;
        if c.words_per_chunk == 0 {
            return Err(CurriculumError::InvalidConfig(
                "words_per_chunk must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(CurriculumError::InvalidConfig(
                "concurrency must be ≥ 1".into(),
            ));
        }
        if c.rasterizer.is_empty() {
            return Err(CurriculumError::InvalidConfig(
                "rasterizer command must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
