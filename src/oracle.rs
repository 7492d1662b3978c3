//! The oracle: every language-model interaction goes through one trait.
//!
//! ## Why a trait instead of calling the provider directly?
//!
//! The pipeline's real logic is orchestration: chunking, fan-out, merging.
//! None of it should need a live API key to test. [`Oracle`] is the single
//! seam: production code wraps an [`edgequake_llm::LLMProvider`] in
//! [`LlmOracle`]; tests substitute a deterministic stub and exercise the
//! orchestration end to end without any network dependency.
//!
//! Responses are plain `String`s. Callers that expect JSON parse with
//! [`parse_json_reply`], which first strips the code fences models sometimes
//! wrap JSON in despite being told not to.

use crate::config::ServiceConfig;
use crate::error::CurriculumError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Model used when neither config nor environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// A single completion request: at most one system message, one user message,
/// and optionally one image attachment.
///
/// That shape covers every call this service makes; a richer conversation
/// abstraction would be dead weight.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// Optional system message establishing the assistant's role.
    pub system: Option<String>,
    /// The user message carrying the actual task.
    pub user: String,
    /// Optional page image for vision extraction.
    pub image: Option<ImageAttachment>,
    /// Completion budget for this call.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
}

impl OracleRequest {
    /// A plain text request with the given user message.
    pub fn text(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            image: None,
            max_tokens: 1024,
            temperature: 0.2,
        }
    }

    /// Attach a system message.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach a page image.
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    /// Set the completion budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A base64-encoded image ready for a vision request.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub base64: String,
    pub mime_type: String,
}

impl ImageAttachment {
    pub fn png(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            mime_type: "image/png".into(),
        }
    }
}

/// Error from a single oracle call.
///
/// Deliberately coarse: the pipeline's only decision on failure is which
/// default to substitute, never *why* the call failed.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The underlying provider returned an error.
    #[error("provider error: {0}")]
    Api(String),

    /// The provider returned successfully but with no content.
    #[error("provider returned an empty completion")]
    Empty,
}

/// The language-model completion capability injected into the pipeline.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Issue one completion request and return the raw response text.
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError>;
}

/// Production [`Oracle`] backed by an [`edgequake_llm`] provider.
pub struct LlmOracle {
    provider: Arc<dyn LLMProvider>,
}

impl LlmOracle {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn complete(&self, request: OracleRequest) -> Result<String, OracleError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage::system(system));
        }
        match request.image {
            Some(ref img) => messages.push(ChatMessage::user_with_images(
                &request.user,
                vec![ImageData::new(img.base64.clone(), &img.mime_type).with_detail("high")],
            )),
            None => messages.push(ChatMessage::user(&request.user)),
        }

        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| OracleError::Api(e.to_string()))?;

        debug!(
            "oracle call: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(response.content)
    }
}

/// Resolve the oracle, from most-specific to least-specific.
///
/// The four-level fallback chain lets library users and server operators each
/// set exactly as much or as little as they need:
///
/// 1. **Pre-built oracle** (`config.oracle`) — the caller constructed the
///    capability entirely; used as-is. This is how tests inject stubs.
///
/// 2. **Named provider + model** (`config.provider_name`) — resolved through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`PDF2CURRICULUM_LLM_PROVIDER` +
///    `PDF2CURRICULUM_MODEL`) — a provider and model chosen at the execution
///    environment level (shell script, systemd unit, CI). Checked before full
///    auto-detection so the model choice is honoured even when multiple API
///    keys are present.
///
/// 4. **Full auto-detection** — prefer OpenAI when `OPENAI_API_KEY` is set,
///    otherwise let [`ProviderFactory::from_env`] scan all known key
///    variables and pick the first available provider.
pub fn resolve_oracle(config: &ServiceConfig) -> Result<Arc<dyn Oracle>, CurriculumError> {
    // 1) User-provided oracle takes priority
    if let Some(ref oracle) = config.oracle {
        return Ok(Arc::clone(oracle));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_oracle(name, model);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("PDF2CURRICULUM_LLM_PROVIDER"),
        std::env::var("PDF2CURRICULUM_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_oracle(&prov, &model);
        }
    }

    // 4) Prefer OpenAI explicitly when an OpenAI API key is present, so users
    // with multiple provider keys default to OpenAI unless they ask otherwise.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_oracle("openai", model);
        }
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| CurriculumError::OracleNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(LlmOracle::new(provider)))
}

/// Instantiate a named provider with the given model and wrap it.
fn create_oracle(provider_name: &str, model: &str) -> Result<Arc<dyn Oracle>, CurriculumError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        CurriculumError::OracleNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(LlmOracle::new(provider)))
}

// ── JSON reply parsing ───────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\n(.*)\n```\s*$").unwrap());

/// Parse an oracle reply as a JSON value.
///
/// Models occasionally wrap JSON in ` ```json ` fences despite the prompt
/// saying not to; the fence is stripped before parsing so that quirk does not
/// count as a parse failure.
pub fn parse_json_reply(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    let trimmed = raw.trim();
    let body = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    };
    serde_json::from_str(body)
}
