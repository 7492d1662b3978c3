//! Upload processing: rasterize the PDF and read each page with the oracle.
//!
//! ## Why an external rasterizer?
//!
//! PDF rendering is delegated wholesale to a command-line tool (`pdftocairo`
//! by default) writing `page-*.png` into a scratch directory. Scanned
//! curriculum documents defeat text-layer extraction anyway, so the only
//! local responsibility is staging bytes, invoking the tool, and collecting
//! its output; no PDF library enters the dependency tree.
//!
//! ## Per-page fan-out
//!
//! Vision calls run in batches of [`crate::config::ServiceConfig::page_batch_size`]
//! pages; within a batch every call runs concurrently and the batch is joined
//! before the next begins. Each page task captures its own outcome: a failed
//! page is reported in its analysis entry and contributes no image, and its
//! siblings are untouched.

use crate::config::ServiceConfig;
use crate::error::CurriculumError;
use crate::oracle::{ImageAttachment, Oracle, OracleRequest};
use crate::prompts::PAGE_EXTRACT_PROMPT;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Completion budget for one page's verbatim extraction.
const PAGE_EXTRACT_MAX_TOKENS: usize = 1000;

/// One rasterized page, base64-encoded, 1-indexed.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page: usize,
    pub base64: String,
}

/// Outcome of one page's oracle extraction.
///
/// `description` is present on success; `error`/`details` on failure. The
/// absent fields are omitted from the wire entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Images and per-page analyses for a whole document, page-ascending.
///
/// A page whose oracle call failed appears in `analyses` (with its error)
/// but not in `page_images`.
#[derive(Debug, Clone)]
pub struct DocumentScan {
    pub page_images: Vec<String>,
    pub analyses: Vec<PageAnalysis>,
}

/// Stage the PDF bytes in a scratch directory, run the external rasterizer,
/// and collect the page images it produced in name order.
pub async fn rasterize_pdf(
    pdf_bytes: &[u8],
    config: &ServiceConfig,
) -> Result<Vec<PageImage>, CurriculumError> {
    let scratch = TempDir::new().map_err(|e| CurriculumError::ScratchIo {
        detail: "failed to create scratch directory".into(),
        source: e,
    })?;

    let pdf_path = scratch.path().join("input.pdf");
    tokio::fs::write(&pdf_path, pdf_bytes)
        .await
        .map_err(|e| CurriculumError::ScratchIo {
            detail: "failed to stage uploaded PDF".into(),
            source: e,
        })?;

    // `<rasterizer> -png input.pdf <dir>/page` → page-1.png, page-2.png, …
    let prefix = scratch.path().join("page");
    let output = Command::new(&config.rasterizer)
        .arg("-png")
        .arg(&pdf_path)
        .arg(&prefix)
        .output()
        .await
        .map_err(|e| CurriculumError::RasterizerUnavailable {
            command: config.rasterizer.clone(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(CurriculumError::RasterizeFailed {
            command: config.rasterizer.clone(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let mut names: Vec<String> = std::fs::read_dir(scratch.path())
        .map_err(|e| CurriculumError::ScratchIo {
            detail: "failed to list rasterizer output".into(),
            source: e,
        })?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("page-") && name.ends_with(".png"))
        .collect();
    names.sort();

    if names.is_empty() {
        return Err(CurriculumError::NoPages);
    }

    let mut pages = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        let bytes = tokio::fs::read(scratch.path().join(name)).await.map_err(|e| {
            CurriculumError::ScratchIo {
                detail: format!("failed to read rendered page '{name}'"),
                source: e,
            }
        })?;
        let b64 = STANDARD.encode(&bytes);
        debug!("encoded {name} → {} bytes base64", b64.len());
        pages.push(PageImage {
            page: idx + 1,
            base64: b64,
        });
    }

    info!("rasterized {} pages", pages.len());
    Ok(pages)
}

/// Read every page image with the vision oracle, batched fan-out.
pub async fn analyze_pages(
    oracle: &Arc<dyn Oracle>,
    pages: &[PageImage],
    config: &ServiceConfig,
) -> DocumentScan {
    let mut page_images = Vec::with_capacity(pages.len());
    let mut analyses = Vec::with_capacity(pages.len());

    for batch in pages.chunks(config.page_batch_size.max(1)) {
        let tasks = batch.iter().map(|page| {
            let oracle = Arc::clone(oracle);
            async move {
                let request = OracleRequest::text(PAGE_EXTRACT_PROMPT)
                    .with_image(ImageAttachment::png(page.base64.clone()))
                    .with_max_tokens(PAGE_EXTRACT_MAX_TOKENS)
                    .with_temperature(config.temperature);
                match oracle.complete(request).await {
                    Ok(description) => (
                        Some(page.base64.clone()),
                        PageAnalysis {
                            page: page.page,
                            description: Some(description),
                            error: None,
                            details: None,
                        },
                    ),
                    Err(e) => {
                        warn!("page {}: oracle extraction failed: {e}", page.page);
                        (
                            None,
                            PageAnalysis {
                                page: page.page,
                                description: None,
                                error: Some("Failed to get description from AI.".into()),
                                details: Some(e.to_string()),
                            },
                        )
                    }
                }
            }
        });

        for (image, analysis) in join_all(tasks).await {
            if let Some(image) = image {
                page_images.push(image);
            }
            analyses.push(analysis);
        }
    }

    analyses.sort_by_key(|a| a.page);
    DocumentScan {
        page_images,
        analyses,
    }
}
