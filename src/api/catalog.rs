//! Catalog endpoints and the records they return.

use std::future::Future;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{ApiClient, ApiError};

/// A playable track. Unknown catalog fields are kept in `extra` so templates
/// can still reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Seconds.
    #[serde(default, deserialize_with = "seconds")]
    pub duration: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Track {
    pub fn new(id: &str, title: &str, artist_name: &str, duration: f64) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artist_name: artist_name.to_string(),
            image_url: None,
            audio_url: None,
            duration,
            extra: Map::new(),
        }
    }

    pub fn with_audio_url(mut self, url: &str) -> Self {
        self.audio_url = Some(url.to_string());
        self
    }

    /// What gets handed to the audio output: the audio URL, else the image URL
    /// (old catalog entries only had the latter).
    pub fn playable_url(&self) -> Option<&str> {
        self.audio_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or(self.image_url.as_deref().filter(|u| !u.is_empty()))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// `{ "albums": [...] }`, albums are kept as raw JSON for the templates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumList {
    #[serde(default)]
    pub albums: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistList {
    #[serde(default)]
    pub artists: Vec<Value>,
}

/// `GET albums/{id}/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumDetail {
    pub album: Value,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl AlbumDetail {
    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

/// Read side of the catalog; the browser is written against this so views can
/// be exercised without a network.
pub trait CatalogSource: Send + Sync {
    fn albums(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send;
    fn popular_albums(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send;
    fn new_releases(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send;
    fn album_detail(&self, id: &str) -> impl Future<Output = Result<AlbumDetail, ApiError>> + Send;
    fn artists(&self) -> impl Future<Output = Result<ArtistList, ApiError>> + Send;
}

#[derive(Debug, Clone)]
pub struct Catalog {
    api: ApiClient,
}

impl Catalog {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl CatalogSource for Catalog {
    fn albums(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send {
        self.api.get_as("albums")
    }

    fn popular_albums(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send {
        self.api.get_as("albums/popular")
    }

    fn new_releases(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send {
        self.api.get_as("albums/new-releases")
    }

    fn album_detail(&self, id: &str) -> impl Future<Output = Result<AlbumDetail, ApiError>> + Send {
        let path = format!("albums/{}/tracks", id);
        let api = self.api.clone();
        async move { api.get_as(&path).await }
    }

    fn artists(&self) -> impl Future<Output = Result<ArtistList, ApiError>> + Send {
        self.api.get_as("artists")
    }
}

/// Ids show up both as strings and as numbers depending on the endpoint.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Missing, `null` or unparsable durations count as unknown (`0`).
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(crate::template::helpers::as_number(&value).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_track_accepts_numeric_id_and_keeps_extra() {
        let track: Track = serde_json::from_value(json!({
            "id": 42,
            "title": "Anti-Hero",
            "artist_name": "Taylor Swift",
            "duration": 200,
            "track_number": 3
        }))
        .unwrap();
        assert_eq!(track.id, "42");
        assert_eq!(track.duration, 200.0);
        assert_eq!(track.extra["track_number"], 3);

        let value = track.to_value();
        assert_eq!(value["track_number"], 3);
        assert_eq!(value["title"], "Anti-Hero");
    }

    #[test]
    fn test_track_null_duration_is_zero() {
        let track: Track = serde_json::from_value(json!({ "id": "x", "duration": null })).unwrap();
        assert_eq!(track.duration, 0.0);
        let track: Track = serde_json::from_value(json!({ "id": "y", "duration": "95" })).unwrap();
        assert_eq!(track.duration, 95.0);
    }

    #[test]
    fn test_playable_url_falls_back_to_image() {
        let mut track = Track::new("1", "t", "a", 1.0);
        assert_eq!(track.playable_url(), None);
        track.image_url = Some("cover.jpg".into());
        assert_eq!(track.playable_url(), Some("cover.jpg"));
        let track = track.with_audio_url("song.mp3");
        assert_eq!(track.playable_url(), Some("song.mp3"));
    }

    #[test]
    fn test_album_detail_lookup() {
        let detail: AlbumDetail = serde_json::from_value(json!({
            "album": { "id": "a1", "title": "Album" },
            "tracks": [{ "id": "t1", "title": "One" }, { "id": "t2", "title": "Two" }],
            "total": 2
        }))
        .unwrap();
        assert_eq!(detail.track("t2").map(|t| t.title.as_str()), Some("Two"));
        assert!(detail.track("t3").is_none());
        assert_eq!(detail.total, Some(2));
    }
}
