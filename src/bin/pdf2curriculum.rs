//! Server binary for pdf2curriculum.
//!
//! A thin shim over the library crate: parse flags, load the taxonomy,
//! resolve the oracle, and serve the router.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2curriculum::oracle::resolve_oracle;
use pdf2curriculum::{build_router, AppState, ServiceConfig, Taxonomy};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Extract curriculum structure from scanned PDFs and match topics against a
/// skill taxonomy, over HTTP.
#[derive(Parser, Debug)]
#[command(name = "pdf2curriculum", version, about)]
struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1", env = "PDF2CURRICULUM_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000, env = "PDF2CURRICULUM_PORT")]
    port: u16,

    /// Path to the CSV skill taxonomy (Domain, Topic, Skill, Sub-skill).
    #[arg(long, default_value = "Skills.csv", env = "PDF2CURRICULUM_TAXONOMY")]
    taxonomy: PathBuf,

    /// LLM model identifier (e.g. "gpt-4.1").
    #[arg(long, env = "PDF2CURRICULUM_MODEL")]
    model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic"); auto-detected when
    /// omitted.
    #[arg(long, env = "PDF2CURRICULUM_LLM_PROVIDER")]
    provider: Option<String>,

    /// External PDF rasterizer command.
    #[arg(long, default_value = "pdftocairo")]
    rasterizer: String,

    /// Bounded fan-out for cleanup and matching calls.
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut builder = ServiceConfig::builder()
        .taxonomy_path(&args.taxonomy)
        .rasterizer(&args.rasterizer)
        .concurrency(args.concurrency);
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    let config = builder.build().context("invalid configuration")?;

    let taxonomy = Taxonomy::load(&config.taxonomy_path)
        .with_context(|| format!("loading taxonomy from {}", args.taxonomy.display()))?;
    info!("loaded {} taxonomy records", taxonomy.len());

    let oracle = resolve_oracle(&config).context("resolving LLM provider")?;

    let state = Arc::new(AppState {
        oracle,
        taxonomy: Arc::new(taxonomy),
        config: Arc::new(config),
    });

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .await
        .context("server error")?;

    Ok(())
}
