use anyhow::Result;
use axum::Router;
use clap::Parser;
use prf_core::config::{DOCS_FOR_EXPANSION, EXPANSION_TOKENS, TOP_TERMS_PER_DOC};
use prf_core::FeedbackConfig;
use server::{build_app, ServeConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Weight of expansion terms relative to query terms
    #[arg(long)]
    damping: Option<f32>,
    /// Multiplier applied to importance scores when blending
    #[arg(long)]
    importance_multiplier: Option<f32>,
    /// Top-ranked documents used for pseudo-relevance feedback
    #[arg(long, default_value_t = DOCS_FOR_EXPANSION)]
    feedback_docs: usize,
    #[arg(long, default_value_t = TOP_TERMS_PER_DOC)]
    feedback_terms_per_doc: usize,
    #[arg(long, default_value_t = EXPANSION_TOKENS)]
    expansion_terms: usize,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServeConfig {
        damping: args.damping,
        importance_multiplier: args.importance_multiplier,
        feedback: FeedbackConfig {
            docs_for_expansion: args.feedback_docs,
            top_terms_per_doc: args.feedback_terms_per_doc,
            expansion_tokens: args.expansion_terms,
        },
        request_timeout: Duration::from_secs(args.timeout_secs),
        ..ServeConfig::new(args.index.clone())
    };
    let app: Router = build_app(&config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
