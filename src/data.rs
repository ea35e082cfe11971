use std::sync::Arc;

use crate::apod::{self, FeedError, MediaEntry, MediaType};

pub trait FeedService: Send + Sync {
    fn load_entries(&self) -> Result<Vec<MediaEntry>, FeedError>;
}

pub struct ApodFeedService {
    client: Arc<apod::Client>,
}

impl ApodFeedService {
    pub fn new(client: Arc<apod::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for ApodFeedService {
    fn load_entries(&self) -> Result<Vec<MediaEntry>, FeedError> {
        tracing::debug!(url = self.client.feed_url(), "fetching feed");
        let result = self.client.fetch_entries();
        match &result {
            Ok(entries) => tracing::info!(count = entries.len(), "feed loaded"),
            Err(err) => tracing::warn!(error = %err, "feed load failed"),
        }
        result
    }
}

/// Offline feed used when the HTTP client can't be built, and in tests.
#[derive(Default)]
pub struct MockFeedService {
    pub entries: Vec<MediaEntry>,
}

impl MockFeedService {
    pub fn sample() -> Self {
        Self {
            entries: sample_entries(),
        }
    }
}

impl FeedService for MockFeedService {
    fn load_entries(&self) -> Result<Vec<MediaEntry>, FeedError> {
        if self.entries.is_empty() {
            return Err(FeedError::Empty);
        }
        Ok(self.entries.clone())
    }
}

pub fn sample_entries() -> Vec<MediaEntry> {
    vec![
        MediaEntry {
            date: "2025-10-01".into(),
            title: "Sample: The Pillars of Creation".into(),
            explanation: "Sample content provided for offline browsing.".into(),
            media_type: MediaType::Image,
            url: "https://apod.nasa.gov/apod/image/1501/pillars_hst_960.jpg".into(),
            hdurl: Some("https://apod.nasa.gov/apod/image/1501/pillars_hst_1600.jpg".into()),
            ..MediaEntry::default()
        },
        MediaEntry {
            date: "2025-09-30".into(),
            title: "Sample: A Solar Eclipse Timelapse".into(),
            explanation: "Hosted video sample.".into(),
            media_type: MediaType::Video,
            url: "https://www.youtube.com/embed/abc123?rel=0".into(),
            ..MediaEntry::default()
        },
    ]
}
