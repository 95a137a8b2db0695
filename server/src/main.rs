use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use quarry_core::vector::DEFAULT_TOP_K;
use quarry_core::RankingConfig;
use server::repl::{run_boolean, run_ranked, Shutdown};
use server::{build_app, load_boolean_engine, load_vector_engine};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Boolean and ranked search over a built index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive boolean search (`!`, `&`, `|`), one query per line
    Boolean {
        /// Path to inverted_index.json
        #[arg(long, default_value = "./output/inverted_index.json")]
        index: PathBuf,
    },
    /// Interactive ranked search by cosine similarity, one query per line
    Ranked {
        /// Path to idf.csv
        #[arg(long, default_value = "./output/idf.csv")]
        idf: PathBuf,
        /// Path to tf-idf.csv
        #[arg(long, default_value = "./output/tf-idf.csv")]
        tfidf: PathBuf,
        /// Corpus metadata file (index.json) mapping ids to urls
        #[arg(long)]
        metadata: PathBuf,
        /// Take the vocabulary from this inverted_index.json instead of idf.csv
        #[arg(long)]
        index: Option<PathBuf>,
        /// Results per query
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// HTTP JSON API over both engines
    Serve {
        /// Directory with inverted_index.json, idf.csv and tf-idf.csv
        #[arg(long, default_value = "./output")]
        index_dir: String,
        /// Corpus metadata file (index.json)
        #[arg(long)]
        metadata: PathBuf,
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

const DEFAULT_LOG_FILTER: &str = "info";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the query loops
    fmt().with_env_filter(log_filter()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Boolean { index } => {
            let engine = load_boolean_engine(&index)?;
            interactive(move |shutdown| run_boolean(&engine, std::io::stdin().lock(), std::io::stdout().lock(), &shutdown)).await
        }
        Commands::Ranked { idf, tfidf, metadata, index, top_k } => {
            let engine = load_vector_engine(&idf, &tfidf, &metadata, index.as_deref(), RankingConfig { top_k })?;
            interactive(move |shutdown| run_ranked(&engine, std::io::stdin().lock(), std::io::stdout().lock(), &shutdown)).await
        }
        Commands::Serve { index_dir, metadata, host, port } => serve(&index_dir, metadata, &host, port).await,
    }
}

/// Runs a query loop on its own thread until it ends or Ctrl-C arrives.
async fn interactive<F>(repl: F) -> Result<()>
where
    F: FnOnce(Shutdown) -> Result<()> + Send + 'static,
{
    let shutdown = Shutdown::new();
    let worker = shutdown.clone();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        let _ = done_tx.send(repl(worker));
    });

    tokio::select! {
        done = done_rx => done.context("query loop stopped unexpectedly")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, finishing current query");
            tokio::task::spawn_blocking(move || shutdown.request()).await?;
            Ok(())
        }
    }
}

async fn serve(index_dir: &str, metadata: PathBuf, host: &str, port: u16) -> Result<()> {
    let app: Router = build_app(index_dir, metadata)?;
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
