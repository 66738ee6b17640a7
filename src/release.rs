//! Release metadata and asset download for the upstream bundle.
//!
//! The bundle is distributed as GitHub release assets: one JSON dependency
//! index plus one zip per release channel. This module resolves assets by
//! name pattern and fetches raw bytes; it knows nothing about the container
//! format.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// GitHub repository publishing the bundle releases.
pub const BUNDLE_REPO: &str = "adafruit/Adafruit_CircuitPython_Bundle";

/// User-Agent for GitHub API requests (anonymous requests are rejected).
pub const USER_AGENT: &str = concat!("mpypack/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {status} for {url}")]
    Api {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("No release asset matches: {0}")]
    MissingAsset(String),
}

/// The subset of GitHub release metadata this tool reads.
#[derive(Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub assets: Vec<Asset>,
}

/// A single downloadable asset attached to a release.
#[derive(Debug, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    /// The dependency-index document: the first asset named `*.json`.
    pub fn index_asset(&self) -> Result<&Asset, FetchError> {
        self.assets
            .iter()
            .find(|a| a.name.ends_with(".json"))
            .ok_or_else(|| FetchError::MissingAsset("*.json".to_string()))
    }

    /// The bundle zip for a release channel: `*-{channel}-*.zip`.
    pub fn bundle_asset(&self, channel: &str) -> Result<&Asset, FetchError> {
        let infix = format!("-{channel}-");
        self.assets
            .iter()
            .find(|a| a.name.contains(&infix) && a.name.ends_with(".zip"))
            .ok_or_else(|| FetchError::MissingAsset(format!("*{infix}*.zip")))
    }
}

/// Fetch the latest release metadata for the bundle repository.
pub async fn fetch_latest_release(client: &Client) -> Result<Release, FetchError> {
    let url = format!("https://api.github.com/repos/{BUNDLE_REPO}/releases/latest");
    let resp = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(FetchError::Api {
            status: resp.status(),
            url,
        });
    }

    Ok(resp.json().await?)
}

/// Download an asset's raw bytes.
pub async fn fetch_asset_bytes(client: &Client, asset: &Asset) -> Result<Vec<u8>, FetchError> {
    let resp = client
        .get(&asset.browser_download_url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(FetchError::Api {
            status: resp.status(),
            url: asset.browser_download_url.clone(),
        });
    }

    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release() -> Release {
        let assets = [
            "adafruit-circuitpython-bundle-7.x-mpy-20240625.zip",
            "adafruit-circuitpython-bundle-8.x-mpy-20240625.zip",
            "adafruit-circuitpython-bundle-py-20240625.zip",
            "adafruit-circuitpython-bundle-20240625.json",
        ];
        Release {
            tag_name: "20240625".to_string(),
            assets: assets
                .iter()
                .map(|name| Asset {
                    name: name.to_string(),
                    browser_download_url: format!("https://example.invalid/{name}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_index_asset() {
        let rel = release();
        assert!(rel.index_asset().unwrap().name.ends_with(".json"));
    }

    #[test]
    fn test_bundle_asset_per_channel() {
        let rel = release();
        assert_eq!(
            rel.bundle_asset("8.x-mpy").unwrap().name,
            "adafruit-circuitpython-bundle-8.x-mpy-20240625.zip"
        );
        assert_eq!(
            rel.bundle_asset("7.x-mpy").unwrap().name,
            "adafruit-circuitpython-bundle-7.x-mpy-20240625.zip"
        );
    }

    #[test]
    fn test_missing_channel() {
        let rel = release();
        assert!(matches!(
            rel.bundle_asset("9.x-mpy"),
            Err(FetchError::MissingAsset(_))
        ));
    }
}
