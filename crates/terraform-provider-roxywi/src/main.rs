mod data_sources;
mod error;
mod provider;
mod resource;
mod resources;
mod schema;
mod validate;
mod value;

use anyhow::Result;
use tf_provider::serve;
use tracing_subscriber::EnvFilter;

use crate::provider::RoxyProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    serve("roxywi", RoxyProvider::default()).await
}

/// Terraform reads plugin logs from stderr. `RUST_LOG` wins over `TF_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(std::env::var("TF_LOG").ok().as_deref())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn level_for(tf_log: Option<&str>) -> &'static str {
    match tf_log.map(str::to_ascii_uppercase).as_deref() {
        Some("TRACE" | "JSON") => "trace",
        Some("DEBUG") => "debug",
        Some("INFO") => "info",
        Some("ERROR") => "error",
        _ => "warn",
    }
}
