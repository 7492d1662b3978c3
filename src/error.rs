//! Error types for the pdf2curriculum library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CurriculumError`] — **Fatal**: the request cannot proceed at all
//!   (rasterizer failed, scratch I/O failed, no oracle configured, or one of
//!   the few structuring calls the pipeline cannot substitute a default for).
//!   Returned as `Err(CurriculumError)` from the pipeline entry points and
//!   mapped to HTTP 500 by the server layer.
//!
//! * [`crate::oracle::OracleError`] — **Absorbed**: a single outbound oracle
//!   call failed. Almost everywhere the pipeline catches it locally, logs it,
//!   and substitutes a default (a raw chunk, an empty batch, a skipped grade)
//!   so one bad call never takes down the units around it.
//!
//! The separation lets the server layer decide per-endpoint tolerance without
//! the pipeline code knowing anything about HTTP.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2curriculum library.
///
/// Per-unit oracle failures are absorbed inside the pipeline and never
/// propagated here; see the module docs.
#[derive(Debug, Error)]
pub enum CurriculumError {
    // ── Rasterizer errors ─────────────────────────────────────────────────
    /// The external rasterizer exited non-zero.
    #[error("Rasterizer '{command}' failed: {detail}")]
    RasterizeFailed { command: String, detail: String },

    /// The external rasterizer could not be spawned at all.
    #[error("Failed to launch rasterizer '{command}': {source}\nIs it installed and on PATH?")]
    RasterizerUnavailable {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The rasterizer ran but produced no page images.
    #[error("Rasterizer produced no page images for the uploaded document")]
    NoPages,

    // ── Scratch I/O errors ────────────────────────────────────────────────
    /// Temp-dir creation or temp-file I/O failed while staging the PDF.
    #[error("Scratch I/O failed: {detail}")]
    ScratchIo {
        detail: String,
        #[source]
        source: std::io::Error,
    },

    // ── Oracle errors ─────────────────────────────────────────────────────
    /// No oracle could be resolved (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    OracleNotConfigured { provider: String, hint: String },

    /// An oracle call the pipeline cannot substitute a default for failed.
    #[error("Oracle call failed: {0}")]
    Oracle(#[from] crate::oracle::OracleError),

    // ── Taxonomy errors ───────────────────────────────────────────────────
    /// The skill taxonomy file could not be read or parsed.
    #[error("Failed to load taxonomy from '{path}': {detail}")]
    TaxonomyLoad { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
