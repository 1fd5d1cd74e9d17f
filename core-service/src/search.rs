//! # Track Search
//!
//! [`TrackSearchClient`] is the seam to whatever catalogue the host searches.
//! [`parse_catalog_response`] turns the common catalogue payload
//!
//! ```json
//! { "data": [ { "id": 3135556, "title": "Harder, Better, Faster, Stronger",
//!               "artist": { "name": "Daft Punk" },
//!               "album": { "cover_medium": "https://..." },
//!               "preview": "https://.../preview.mp3", "duration": 224 } ] }
//! ```
//!
//! into [`Track`]s. Both free-text search and an artist's top tracks answer
//! with this shape. With the `catalog-search` feature, [`CatalogSearchClient`]
//! fetches it over HTTP.

use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use core_playback::Track;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait TrackSearchClient: Send + Sync {
    /// Tracks matching `query`, in catalogue order.
    async fn search(&self, query: &str) -> Result<Vec<Track>>;

    /// The catalogue's most popular tracks for `artist_id`.
    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>>;
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    data: Vec<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct CatalogArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CatalogAlbum {
    cover_medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogTrack {
    id: CatalogId,
    title: String,
    artist: CatalogArtist,
    album: Option<CatalogAlbum>,
    #[serde(default)]
    preview: String,
    #[serde(default)]
    duration: u64,
}

impl CatalogTrack {
    fn into_track(self) -> Track {
        let id = match self.id {
            CatalogId::Number(n) => n.to_string(),
            CatalogId::Text(s) => s,
        };
        let track = Track::new(id, self.title, self.artist.name, self.preview)
            .with_duration(Duration::from_secs(self.duration));
        match self.album.and_then(|album| album.cover_medium) {
            Some(cover) => track.with_artwork(cover),
            None => track,
        }
    }
}

/// Decode a catalogue search payload.
///
/// Entries without a playable preview are skipped.
pub fn parse_catalog_response(body: &[u8]) -> Result<Vec<Track>> {
    let response: CatalogResponse = serde_json::from_slice(body)?;
    let total = response.data.len();
    let tracks: Vec<Track> = response
        .data
        .into_iter()
        .filter(|entry| !entry.preview.is_empty())
        .map(CatalogTrack::into_track)
        .collect();

    if tracks.len() < total {
        debug!(
            skipped = total - tracks.len(),
            "Dropped catalogue entries without preview"
        );
    }
    Ok(tracks)
}

/// Reject blank queries before they reach a client.
pub(crate) fn normalize_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidQuery(query.to_string()));
    }
    Ok(trimmed)
}

#[cfg(feature = "catalog-search")]
pub use http::CatalogSearchClient;

#[cfg(feature = "catalog-search")]
mod http {
    use super::*;
    use reqwest::{Client, Url};
    use tracing::warn;

    const MAX_ATTEMPTS: u32 = 3;
    const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

    /// Catalogue client over HTTP:
    ///
    /// - search: `GET {base_url}/search?q={query}`
    /// - top tracks: `GET {base_url}/artist/{id}/top`
    ///
    /// 5xx and 429 responses are retried with exponential backoff.
    pub struct CatalogSearchClient {
        client: Client,
        base_url: String,
        headers: Vec<(String, String)>,
    }

    impl CatalogSearchClient {
        pub fn new(base_url: impl Into<String>) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(15))
                .connect_timeout(Duration::from_secs(5))
                .user_agent("playback-core/0.1.0")
                .build()
                .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;
            Ok(Self::with_client(client, base_url))
        }

        pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
            Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                headers: Vec::new(),
            }
        }

        /// Extra header sent with every request, e.g. an API key.
        pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
            self.headers.push((name.into(), value.into()));
            self
        }

        /// `base_url` extended by `segments`, each percent-encoded.
        pub(super) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
            let mut url = Url::parse(&self.base_url)
                .map_err(|e| ServiceError::Search(format!("invalid base url: {e}")))?;
            url.path_segments_mut()
                .map_err(|_| ServiceError::Search("base url cannot take a path".to_string()))?
                .pop_if_empty()
                .extend(segments);
            Ok(url)
        }

        async fn fetch(&self, url: Url, query: Option<&str>) -> Result<Vec<u8>> {
            let mut backoff = INITIAL_BACKOFF;
            let mut last_error = String::new();

            for attempt in 1..=MAX_ATTEMPTS {
                let mut request = self.client.get(url.clone());
                if let Some(query) = query {
                    request = request.query(&[("q", query)]);
                }
                for (name, value) in &self.headers {
                    request = request.header(name, value);
                }

                match request.send().await {
                    Ok(response) => {
                        let status = response.status();
                        if status.is_server_error() || status.as_u16() == 429 {
                            warn!(
                                status = status.as_u16(),
                                attempt,
                                path = url.path(),
                                "Catalogue request rejected"
                            );
                            last_error = format!("HTTP {status}");
                        } else if !status.is_success() {
                            return Err(ServiceError::Search(format!("HTTP {status}")));
                        } else {
                            let body = response
                                .bytes()
                                .await
                                .map_err(|e| ServiceError::Search(e.to_string()))?;
                            return Ok(body.to_vec());
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, attempt, path = url.path(), "Catalogue request failed");
                        last_error = e.to_string();
                    }
                }

                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }

            Err(ServiceError::Search(last_error))
        }
    }

    #[async_trait]
    impl TrackSearchClient for CatalogSearchClient {
        async fn search(&self, query: &str) -> Result<Vec<Track>> {
            let url = self.endpoint(&["search"])?;
            let body = self.fetch(url, Some(query)).await?;
            parse_catalog_response(&body)
        }

        async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>> {
            let url = self.endpoint(&["artist", artist_id, "top"])?;
            let body = self.fetch(url, None).await?;
            parse_catalog_response(&body)
        }
    }

    impl std::fmt::Debug for CatalogSearchClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("CatalogSearchClient")
                .field("base_url", &self.base_url)
                .field("headers", &self.headers.len())
                .finish()
        }
    }
}
