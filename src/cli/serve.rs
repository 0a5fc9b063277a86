//! Serve command implementation

use anyhow::{Context, Result};
use clap::Args;

use mathdrill::http_server::HttpServer;
use mathdrill::stats::ProgressStore;

use super::AppContext;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port (overrides [server] port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides [server] bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Use a throwaway in-memory store instead of the progress database
    #[arg(long)]
    pub memory: bool,
}

/// Run the REST API until the process is stopped
pub async fn serve_command(ctx: &AppContext, args: ServeArgs) -> Result<()> {
    let store = if args.memory {
        ProgressStore::in_memory()?
    } else {
        ctx.open_store()?
    };

    let addr = format!(
        "{}:{}",
        args.bind.as_deref().unwrap_or(&ctx.config.server.bind),
        args.port.unwrap_or(ctx.config.server.port)
    );
    let server = HttpServer::bind(&addr, store)?;
    println!("Serving progress API on http://{}", addr);

    // tiny_http blocks; keep it off the async workers
    tokio::task::spawn_blocking(move || server.run())
        .await
        .context("HTTP server thread panicked")?;
    Ok(())
}
