//! Network-first fetch proxy with durable cache fallback.
//!
//! Policy, in order, for every request:
//! 1. Always try the network first.
//! 2. A 200, same-origin response is duplicated into the store and returned
//!    unmodified. Anything else (non-200, cross-origin) passes through
//!    uncached. Store write failures are non-fatal.
//! 3. If the network itself fails, the store is consulted; a hit is returned
//!    as captured, a miss propagates the network error. No synthetic
//!    fallback content.
use reqwest::{Client, Method, Url};

use crate::cache::store::{CacheStore, CachedResponse};
use crate::error::{AppError, AppResult};

/// Core application assets pre-populated at install time, resolved against
/// the app origin.
pub const DEFAULT_ASSETS: &[&str] = &["/", "/index.html", "/manifest.json"];

pub struct FetchProxy {
    client: Client,
    store: CacheStore,
    app_origin: String,
}

impl FetchProxy {
    pub fn new(store: CacheStore, app_origin: String) -> Self {
        let origin = app_origin.trim_end_matches('/').to_string();
        FetchProxy {
            client: Client::new(),
            store,
            app_origin: origin,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Resolve a path like `/manifest.json` against the app origin. Absolute
    /// URLs pass through untouched.
    pub fn resolve(&self, asset: &str) -> String {
        if asset.starts_with("http://") || asset.starts_with("https://") {
            asset.to_string()
        } else if asset.starts_with('/') {
            format!("{}{}", self.app_origin, asset)
        } else {
            format!("{}/{}", self.app_origin, asset)
        }
    }

    /// Pre-populate the store with the given assets, all-or-nothing: every
    /// asset is fetched (and must answer 200) before anything is written, so
    /// a failed install leaves no partial generation behind.
    pub async fn install(&self, assets: &[&str]) -> AppResult<()> {
        let mut captured: Vec<(String, CachedResponse)> = Vec::with_capacity(assets.len());
        for asset in assets {
            let url = self.resolve(asset);
            tracing::info!("Installing asset: {}", url);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| AppError::Cache(format!("Install fetch failed for {}: {}", url, e)))?;
            let status = response.status().as_u16();
            if status != 200 {
                return Err(AppError::Cache(format!(
                    "Install fetch for {} returned status {}",
                    url, status
                )));
            }
            captured.push((url.clone(), capture_of(response).await?));
        }
        for (url, entry) in &captured {
            self.store.put("GET", url, entry).await?;
        }
        tracing::info!(
            "Cache generation '{}' installed ({} assets)",
            self.store.version(),
            captured.len()
        );
        Ok(())
    }

    /// Take over immediately: drop every cache generation other than the
    /// current one.
    pub async fn activate(&self) -> AppResult<()> {
        let removed = self.store.remove_stale_versions().await?;
        tracing::info!(
            "Cache generation '{}' active ({} stale generation(s) removed)",
            self.store.version(),
            removed
        );
        Ok(())
    }

    /// Handle one intercepted request: network first, cache fallback.
    pub async fn fetch(&self, method: &str, url: &str) -> AppResult<CachedResponse> {
        match self.fetch_network(method, url).await {
            Ok(response) => {
                if response.status == 200 && self.is_same_origin(url) {
                    // Duplicate into the store; the caller still gets the
                    // network response even if the write fails.
                    if let Err(e) = self.store.put(method, url, &response).await {
                        tracing::warn!("Cache write failed for {}: {}", url, e);
                    }
                }
                Ok(response)
            }
            Err(err) => match self.store.get(method, url).await {
                Some(hit) => {
                    tracing::info!("Network failed for {}, serving from cache", url);
                    Ok(hit)
                }
                None => {
                    tracing::debug!("Network failed for {} with no cache entry", url);
                    Err(err)
                }
            },
        }
    }

    async fn fetch_network(&self, method: &str, url: &str) -> AppResult<CachedResponse> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| AppError::Validation(format!("Invalid request method: {}", method)))?;
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(AppError::HttpClient)?;
        capture_of(response).await
    }

    /// Stand-in for the "basic response" check: only responses from the app
    /// origin itself are cacheable. Provider calls are cross-origin and thus
    /// never cached.
    fn is_same_origin(&self, url: &str) -> bool {
        let (Ok(origin), Ok(target)) = (Url::parse(&self.app_origin), Url::parse(url)) else {
            return false;
        };
        origin.scheme() == target.scheme()
            && origin.host_str() == target.host_str()
            && origin.port_or_known_default() == target.port_or_known_default()
    }
}

async fn capture_of(response: reqwest::Response) -> AppResult<CachedResponse> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            )
        })
        .collect();
    let body = response
        .bytes()
        .await
        .map_err(AppError::HttpClient)?
        .to_vec();
    Ok(CachedResponse {
        status,
        headers,
        body,
    })
}
