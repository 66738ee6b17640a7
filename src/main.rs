//! mpypack - packs the CircuitPython library bundle into mpylib containers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mpypack::extract;
use mpypack::index::{self, DependencyIndex};
use mpypack::release;

/// Release channels to pack, one destination directory each.
const CHANNELS: &[&str] = &["7.x-mpy", "8.x-mpy"];

/// Root directory receiving the per-channel output.
const TARGET_DIR: &str = "packages";

#[derive(Parser)]
#[command(name = "mpypack")]
#[command(version, about = "Packs the CircuitPython library bundle into mpylib containers")]
struct Cli {}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Cli {} = Cli::parse();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let client = reqwest::Client::new();

    let rel = release::fetch_latest_release(&client)
        .await
        .context("Failed to fetch latest bundle release")?;
    info!(tag = %rel.tag_name, "resolved latest release");

    let index_asset = rel.index_asset()?;
    info!(asset = %index_asset.name, "downloading dependency index");
    let index_bytes = release::fetch_asset_bytes(&client, index_asset).await?;
    let dep_index: DependencyIndex = serde_json::from_slice(&index_bytes)
        .context("Failed to parse dependency index document")?;

    for channel in CHANNELS {
        let zip_asset = rel.bundle_asset(channel)?;
        info!(channel, asset = %zip_asset.name, "downloading bundle");
        let zip_data = release::fetch_asset_bytes(&client, zip_asset).await?;

        // Removed recursively on every exit path, including errors.
        let temp_dir = tempfile::Builder::new()
            .prefix("mpypack-")
            .tempdir()
            .context("Failed to create temporary extraction directory")?;

        info!(channel, "extracting bundle");
        extract::extract_zip(&zip_data, temp_dir.path())
            .with_context(|| format!("Failed to extract bundle for {channel}"))?;

        let dest = Path::new(TARGET_DIR).join(channel);
        if dest.exists() {
            fs::remove_dir_all(&dest)
                .with_context(|| format!("Failed to clear {}", dest.display()))?;
        }
        fs::create_dir_all(&dest)?;

        info!(channel, "packing libraries");
        let manifest = index::pack_libraries(temp_dir.path(), &dest, &dep_index)
            .with_context(|| format!("Failed to pack libraries for {channel}"))?;
        info!(channel, count = manifest.libs.len(), "packed libraries");
    }

    Ok(())
}
