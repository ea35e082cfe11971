use std::io::Read;
use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::dates::{self, EntryDate};

pub const APOD_FEED_URL: &str = "https://cdn.jsdelivr.net/gh/GCA-Classroom/apod/data.json";
const MAX_FEED_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub feed_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            feed_url: APOD_FEED_URL.to_string(),
            user_agent: format!("apod-tui/{}", crate::VERSION),
            timeout: Duration::from_secs(20),
            http_client: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("feed body could not be read: {0}")]
    Read(#[source] std::io::Error),
    #[error("feed returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("feed payload could not be decoded: {0}")]
    Decode(String),
    #[error("feed contained no entries")]
    Empty,
}

impl FeedError {
    pub fn is_empty(&self) -> bool {
        matches!(self, FeedError::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Other(String),
}

impl MediaType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "image" => MediaType::Image,
            "video" => MediaType::Video,
            other => MediaType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Other(raw) => raw,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MediaType::Image)
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MediaType::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MediaEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hdurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
}

impl MediaEntry {
    pub fn parsed_date(&self) -> EntryDate {
        dates::parse_date(&self.date)
    }

    pub fn display_date(&self) -> String {
        dates::format_display_date(&self.date)
    }

    pub fn hdurl(&self) -> Option<&str> {
        non_empty(self.hdurl.as_deref())
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        non_empty(self.thumbnail_url.as_deref())
    }

    pub fn copyright(&self) -> Option<&str> {
        non_empty(self.copyright.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    feed_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("apod client user agent required");
        }
        if config.feed_url.trim().is_empty() {
            bail!("apod client feed url required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder().timeout(config.timeout).build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            feed_url: config.feed_url,
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// One GET of the feed. No retries.
    pub fn fetch_entries(&self) -> Result<Vec<MediaEntry>, FeedError> {
        let response = self
            .http
            .get(&self.feed_url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(FeedError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let body = read_capped(response, MAX_FEED_BYTES)?;
        decode_entries(&body)
    }
}

/// Read at most `limit` bytes; a longer body is rejected rather than cut.
fn read_capped<R: Read>(reader: R, limit: u64) -> Result<Vec<u8>, FeedError> {
    let mut body = Vec::with_capacity(64 * 1024);
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(FeedError::Read)?;
    if body.len() as u64 > limit {
        return Err(FeedError::Decode(format!(
            "feed body exceeds {limit} bytes"
        )));
    }
    Ok(body)
}

/// Decode a feed body: a JSON array of entries. Falsy elements (`null`,
/// `false`, `0`, `""`) are dropped; elements that aren't entry objects are
/// skipped.
pub fn decode_entries(body: &[u8]) -> Result<Vec<MediaEntry>, FeedError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|err| FeedError::Decode(err.to_string()))?;
    let Value::Array(items) = payload else {
        return Err(FeedError::Decode(format!(
            "expected an array, got {}",
            value_kind(&payload)
        )));
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if is_falsy(&item) {
            continue;
        }
        match serde_json::from_value::<MediaEntry>(item) {
            Ok(entry) => entries.push(entry),
            Err(err) => tracing::warn!(index, error = %err, "skipping malformed feed entry"),
        }
    }

    if entries.is_empty() {
        return Err(FeedError::Empty);
    }
    Ok(entries)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn oversized_feed_body_is_rejected() {
        let body = read_capped(Cursor::new(b"[1,2,3]".to_vec()), 7).unwrap();
        assert_eq!(body, b"[1,2,3]");
        let err = read_capped(Cursor::new(b"[1,2,3,4]".to_vec()), 7).unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)));
        assert!(!err.is_empty());
    }

    #[test]
    fn decodes_feed_array() {
        let body = br#"[
            {"date":"2025-10-01","title":"A","explanation":"x","media_type":"image",
             "url":"https://apod.test/a.jpg","hdurl":"https://apod.test/a_hd.jpg",
             "service_version":"v1","copyright":"Someone"},
            {"date":"2025-10-02","title":"B","explanation":"y","media_type":"video",
             "url":"https://www.youtube.com/embed/abc123"}
        ]"#;
        let entries = decode_entries(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].hdurl(), Some("https://apod.test/a_hd.jpg"));
        assert_eq!(entries[0].copyright(), Some("Someone"));
        assert_eq!(entries[1].media_type, MediaType::Video);
        assert_eq!(entries[1].thumbnail_url(), None);
    }

    #[test]
    fn unknown_media_types_are_preserved() {
        let body = br#"[{"date":"2025-10-01","title":"A","media_type":"other","url":""}]"#;
        let entries = decode_entries(body).unwrap();
        assert_eq!(entries[0].media_type, MediaType::Other("other".into()));
        assert_eq!(entries[0].media_type.as_str(), "other");
    }

    #[test]
    fn empty_array_is_empty_error() {
        assert!(decode_entries(b"[]").unwrap_err().is_empty());
    }

    #[test]
    fn falsy_elements_are_discarded() {
        let body = br#"[null, false, 0, "", {"date":"2025-01-01","title":"Kept"}]"#;
        let entries = decode_entries(body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Kept");

        assert!(decode_entries(b"[null, 0]").unwrap_err().is_empty());
    }

    #[test]
    fn malformed_elements_are_skipped() {
        let body = br#"[{"date":"2025-01-01","title":42}, {"date":"2025-01-02","title":"ok"}]"#;
        let entries = decode_entries(body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "ok");
    }

    #[test]
    fn non_array_payload_is_decode_error() {
        let err = decode_entries(br#"{"entries":[]}"#).unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)));
        let err = decode_entries(b"<html>").unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)));
    }

    #[test]
    fn client_requires_user_agent() {
        let config = ClientConfig {
            user_agent: "  ".into(),
            ..ClientConfig::default()
        };
        assert!(Client::new(config).is_err());
    }
}
