//! Default byte fetcher

use crate::source::AssetSource;
use base64::Engine;
use rive_player_core::{ByteFetcher, FetchError, FetchFuture};
use std::path::{Path, PathBuf};

/// Fetches source bytes from files, app package assets, data URIs and HTTP
///
/// `ms-appx:///` paths resolve against the asset root, which defaults to
/// the current directory.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    asset_root: PathBuf,
    #[cfg(feature = "network")]
    client: reqwest::Client,
}

impl AssetFetcher {
    pub fn new() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            #[cfg(feature = "network")]
            client: reqwest::Client::new(),
        }
    }

    /// Resolve `ms-appx:///` paths against `root`
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Filesystem path an app package asset resolves to
    pub fn resolve_asset(&self, relative: &str) -> PathBuf {
        self.asset_root.join(relative)
    }
}

impl Default for AssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteFetcher for AssetFetcher {
    fn fetch(&self, uri: &str) -> FetchFuture {
        let source = AssetSource::parse(uri);
        let fetcher = self.clone();

        Box::pin(async move {
            match source? {
                AssetSource::File(path) => read_file(&path).await,
                AssetSource::AppPackage(relative) => {
                    read_file(&fetcher.resolve_asset(&relative)).await
                }
                AssetSource::Base64(data) => decode_base64(&data),
                AssetSource::Url(url) => fetcher.fetch_url(&url).await,
            }
        })
    }
}

impl AssetFetcher {
    #[cfg(feature = "network")]
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Network(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "network"))]
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Network(format!(
            "{}: URL loading requires the 'network' feature",
            url
        )))
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| FetchError::Io(format!("{}: {}", path.display(), e)))
}

fn decode_base64(data: &str) -> Result<Vec<u8>, FetchError> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| FetchError::Decode(e.to_string()))
}
