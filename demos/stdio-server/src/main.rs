//! # Stdio JSON-RPC Server
//!
//! Serves the dispatcher over standard input/output: one payload per line in,
//! one response per line out. Notifications (and batches made only of
//! notifications) produce no output line at all.
//!
//! Registered methods:
//! - `echo`: returns its params unchanged
//! - `add`: sums a `[a, b]` pair of numbers
//!
//! ```text
//! $ echo '{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}' | stdio-server
//! {"id":1,"jsonrpc":"2.0","result":3.0}
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use json_rpc_dispatch::prelude::*;

#[derive(Parser)]
#[command(name = "stdio-server", about = "JSON-RPC 2.0 over stdin/stdout")]
struct Args {
    /// Deadline for every call in milliseconds (0 disables it)
    #[arg(long, env = "JSONRPC_TIMEOUT_MS", default_value_t = 0)]
    timeout_ms: u64,

    /// Skip the sample requests served at start-up
    #[arg(long)]
    no_warmup: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

async fn add(_ctx: CallContext, params: Value) -> JsonRpcResult<Value> {
    let [a, b]: [f64; 2] = decode_params(params)?;
    Ok(json!(a + b))
}

fn build_server(timeout: Duration) -> JsonRpcServer {
    JsonRpcServer::builder()
        .config(ServerConfig {
            default_timeout: timeout,
        })
        .method("echo", |_ctx, params| async move { Ok(params) })
        .method("add", add)
        .build()
}

/// Serve a few canned payloads and log what comes back
async fn warmup(server: &JsonRpcServer) {
    let samples = [
        r#"{ "jsonrpc": "2.0", "method": "echo", "params": "hi", "id": 1 }"#,
        r#"[{ "jsonrpc": "2.0", "method": "add", "params": [1,2], "id": 1 }]"#,
        r#"[{ "jsonrpc": "2.0", "method": "add", "params": [1,2] }]"#,
    ];
    for sample in samples {
        match server.serve_str(sample).await {
            Some(rsp) => info!("response = {}", rsp),
            None => info!("response = <none>"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .init();

    let server = build_server(Duration::from_millis(args.timeout_ms));
    info!(
        "JSON-RPC stdio server ready (timeout: {})",
        if args.timeout_ms == 0 {
            "none".to_string()
        } else {
            format!("{}ms", args.timeout_ms)
        }
    );

    if !args.no_warmup {
        warmup(&server).await;
    }

    let mut reader = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    let mut line = Vec::new();

    // raw bytes so invalid UTF-8 reaches the server as a parse error
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .context("failed to read stdin")?;
        if read == 0 {
            break;
        }
        let payload = line.trim_ascii();
        if payload.is_empty() {
            continue;
        }

        match server.serve(payload).await {
            Some(rsp) => {
                stdout.write_all(&rsp).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            None => debug!("No response for payload"),
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}
