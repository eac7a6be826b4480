//! Image, stream and subtitle URLs derived from a session snapshot.
//!
//! These URLs are handed to players and image loaders that cannot set
//! headers, so the credential travels as the `api_key` query parameter.
//! Nothing in here performs I/O.

use crate::types::{BaseItem, ImageType, MediaStream, SubtitleTrack};
use url::form_urlencoded;

/// Snapshot of the endpoint and credential used to build resource URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUrls {
    endpoint: String,
    credential: Option<String>,
}

impl ResourceUrls {
    pub fn new(endpoint: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build(&self, path: &str, params: &[(&str, &str)], with_credential: bool) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            query.append_pair(key, value);
        }
        if with_credential {
            if let Some(credential) = &self.credential {
                query.append_pair("api_key", credential);
            }
        }
        let query = query.finish();

        if query.is_empty() {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}{}?{}", self.endpoint, path, query)
        }
    }

    /// `Items/{id}/Images/{type}`, optionally capped in width.
    pub fn image(&self, item_id: &str, image_type: ImageType, max_width: Option<u32>) -> String {
        let width = max_width.map(|w| w.to_string());
        let mut params = Vec::new();
        if let Some(width) = &width {
            params.push(("maxWidth", width.as_str()));
        }
        self.build(
            &format!("/Items/{}/Images/{}", item_id, image_type),
            &params,
            true,
        )
    }

    /// Static (direct) stream of the original file.
    pub fn direct_stream(&self, item_id: &str, media_source_id: Option<&str>) -> String {
        let mut params = vec![("Static", "true")];
        if let Some(source) = media_source_id {
            params.push(("MediaSourceId", source));
        }
        self.build(&format!("/Videos/{}/stream", item_id), &params, true)
    }

    /// Adaptive-bitrate HLS playlist.
    pub fn hls_stream(&self, item_id: &str, media_source_id: Option<&str>) -> String {
        let mut params = Vec::new();
        if let Some(source) = media_source_id {
            params.push(("MediaSourceId", source));
        }
        self.build(&format!("/Videos/{}/master.m3u8", item_id), &params, true)
    }

    /// One entry per subtitle stream of the item's first media source.
    pub fn subtitles(&self, item: &BaseItem) -> Vec<SubtitleTrack> {
        let Some(source) = item.media_sources.first() else {
            return Vec::new();
        };

        source
            .media_streams
            .iter()
            .filter(|stream| stream.is_subtitle())
            .map(|stream| SubtitleTrack {
                url: self.subtitle_url(&item.id, &source.id, stream),
                language: subtitle_language(stream),
                label: subtitle_label(stream),
            })
            .collect()
    }

    fn subtitle_url(&self, item_id: &str, media_source_id: &str, stream: &MediaStream) -> String {
        match stream.delivery_url.as_deref() {
            // Delivery URLs are pre-authorized by the server.
            Some(delivery) if stream.is_external => self.resolve(delivery),
            _ => self.build(
                &format!(
                    "/Videos/{}/{}/Subtitles/{}/Stream.vtt",
                    item_id, media_source_id, stream.index
                ),
                &[],
                true,
            ),
        }
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}/{}", self.endpoint, path)
        }
    }
}

fn subtitle_language(stream: &MediaStream) -> String {
    stream
        .language
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn subtitle_label(stream: &MediaStream) -> String {
    match &stream.display_title {
        Some(title) if !title.is_empty() => title.clone(),
        _ => format!(
            "{} ({})",
            subtitle_language(stream),
            stream.codec.as_deref().unwrap_or("unknown")
        ),
    }
}
