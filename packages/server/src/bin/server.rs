use anyhow::{bail, Context};
use pagegrid_common::PageSnapshot;
use pagegrid_server::{router, MemoryPageStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let mut port: u16 = 3030;
    let mut seed: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--port requires a value");
                };
                port = value.parse().context("Invalid port number")?;
                i += 2;
            }
            "--seed" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--seed requires a value");
                };
                seed = Some(PathBuf::from(value));
                i += 2;
            }
            "--help" | "-h" => {
                println!("Usage: pagegrid-server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>    HTTP port to listen on (default: 3030)");
                println!("  --seed <FILE>        JSON array of pages to preload");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => bail!("Unknown argument: {}", other),
        }
    }

    let store = Arc::new(MemoryPageStore::new());
    if let Some(path) = seed {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let pages: Vec<PageSnapshot> =
            serde_json::from_str(&contents).context("Invalid seed file")?;
        for page in pages {
            store.seed(page)?;
        }
        info!(pages = ?store.page_ids()?, "Seeded page store");
    }

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Page store listening");

    axum::serve(listener, router(store)).await?;
    Ok(())
}
