// CLI driver: reads a JSON optimization request from stdin, runs the
// pipeline, and writes the JSON response to stdout. Logging goes to
// stderr so it never interleaves with the response on stdout.

use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use bdnrp_optimizer::config;
use bdnrp_optimizer::error::OptimizerError;
use bdnrp_optimizer::request::{self, OptimizationRequest};
use rayon::ThreadPoolBuilder;

#[derive(Serialize)]
struct ErrorEnvelope {
    kind: String,
    code: u16,
    message: String,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = config::load_config(Path::new("optimizer.toml"))
        .context("failed to load configuration")?;

    if let Some(n) = config.worker_threads {
        ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("failed to configure the worker thread pool")?;
    }

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read request from stdin")?;

    let request: OptimizationRequest = match serde_json::from_str(&input) {
        Ok(r) => r,
        Err(e) => {
            return emit_error_and_exit(&OptimizerError::MalformedRequest(format!(
                "invalid JSON: {e}"
            )))
        }
    };

    info!("optimization request received");

    match request::optimize_with_config(request, &config) {
        Ok(response) => {
            let body = serde_json::to_string(&response).context("failed to serialize response")?;
            println!("{body}");
            Ok(())
        }
        Err(err) => emit_error_and_exit(&err),
    }
}

fn emit_error_and_exit(err: &OptimizerError) -> anyhow::Result<()> {
    let envelope = ErrorEnvelope {
        kind: err.kind().to_string(),
        code: err.wire_code(),
        message: err.to_string(),
    };
    let body = serde_json::to_string(&envelope).context("failed to serialize error envelope")?;
    writeln!(io::stdout(), "{body}").context("failed to write error envelope")?;
    std::process::exit(exit_code_for(err.wire_code()));
}

/// Maps a wire-style HTTP status to the CLI's process exit code: 1 for
/// 4xx-equivalent input errors, 2 for 422 feasibility errors, 3 for 499
/// cancellation, 4 for 500 (should not normally escape).
fn exit_code_for(wire_code: u16) -> i32 {
    match wire_code {
        400 => 1,
        422 => 2,
        499 => 3,
        500 => 4,
        _ => 1,
    }
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bdnrp_optimizer=info,warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(true)
        .init();

    Ok(())
}
