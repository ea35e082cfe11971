use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use textwrap::{wrap, Options as WrapOptions};
use url::Url;

use crate::apod::{MediaEntry, MediaType};
use crate::gallery;
use crate::text;
use crate::video;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRegion {
    Image {
        url: String,
    },
    EmbeddedPlayer {
        url: String,
    },
    ExternalVideo {
        thumbnail: Option<String>,
        url: String,
    },
    Unsupported {
        media_type: String,
    },
}

impl MediaRegion {
    pub fn for_entry(entry: &MediaEntry) -> Self {
        match &entry.media_type {
            MediaType::Image => MediaRegion::Image {
                url: entry.hdurl().unwrap_or(entry.url.as_str()).to_string(),
            },
            MediaType::Video if video::is_video_host_url(&entry.url) => {
                MediaRegion::EmbeddedPlayer {
                    url: entry.url.clone(),
                }
            }
            MediaType::Video => {
                let thumbnail = entry.thumbnail_url().map(str::to_string).or_else(|| {
                    let derived = video::extract_video_thumbnail(&entry.url);
                    (!derived.is_empty()).then_some(derived)
                });
                MediaRegion::ExternalVideo {
                    thumbnail,
                    url: entry.url.clone(),
                }
            }
            MediaType::Other(raw) => MediaRegion::Unsupported {
                media_type: text::sanitize_line(raw),
            },
        }
    }

    /// Image worth previewing inside the overlay, if any.
    pub fn preview_url(&self) -> Option<&str> {
        match self {
            MediaRegion::Image { url } => Some(url),
            MediaRegion::ExternalVideo { thumbnail, .. } => thumbnail.as_deref(),
            MediaRegion::EmbeddedPlayer { .. } | MediaRegion::Unsupported { .. } => None,
        }
    }

    /// Target for "open in browser".
    pub fn link_url(&self) -> Option<&str> {
        match self {
            MediaRegion::Image { url }
            | MediaRegion::EmbeddedPlayer { url }
            | MediaRegion::ExternalVideo { url, .. } => Some(url),
            MediaRegion::Unsupported { .. } => None,
        }
    }

    pub fn playable_url(&self) -> Option<String> {
        match self {
            MediaRegion::EmbeddedPlayer { url } => {
                Some(video::watch_url(url).unwrap_or_else(|| url.clone()))
            }
            _ => None,
        }
    }
}

/// Only http(s) links are handed to the browser.
pub fn checked_link(raw: &str) -> Option<Url> {
    let parsed = Url::parse(raw.trim()).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    CloseControl,
    Backdrop,
    CancelKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    entry: MediaEntry,
    region: MediaRegion,
    title: String,
    display_date: String,
    explanation: String,
    copyright: Option<String>,
    scroll: u16,
}

impl Overlay {
    pub fn new(entry: MediaEntry) -> Self {
        let region = MediaRegion::for_entry(&entry);
        Self {
            title: text::sanitize_line(&entry.title),
            display_date: text::sanitize_line(&entry.display_date()),
            explanation: text::sanitize(&entry.explanation).into_owned(),
            copyright: entry.copyright().map(text::sanitize_line),
            region,
            entry,
            scroll: 0,
        }
    }

    pub fn entry(&self) -> &MediaEntry {
        &self.entry
    }

    pub fn region(&self) -> &MediaRegion {
        &self.region
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn scroll_by(&mut self, delta: i32, max: u16) {
        let next = (self.scroll as i32 + delta).clamp(0, max as i32);
        self.scroll = next as u16;
    }

    /// Lines describing the media region, before the body text.
    pub fn media_lines(&self, player_name: &str) -> Vec<Line<'static>> {
        let accent = Style::default().add_modifier(Modifier::BOLD);
        match &self.region {
            MediaRegion::Image { url } => vec![
                Line::from(vec![
                    Span::styled("Image ", accent),
                    Span::raw(text::sanitize_line(url)),
                ]),
                Line::from(Span::raw("o: open full size in browser")),
            ],
            MediaRegion::EmbeddedPlayer { url } => vec![
                Line::from(vec![
                    Span::styled("▶ Video ", accent),
                    Span::raw(text::sanitize_line(url)),
                ]),
                Line::from(Span::raw(format!(
                    "p: play with {player_name} · o: open in browser"
                ))),
            ],
            MediaRegion::ExternalVideo { url, .. } => vec![
                Line::from(vec![
                    Span::styled("Video ", accent),
                    Span::raw(text::sanitize_line(url)),
                ]),
                Line::from(Span::raw("o: open video ↗")),
            ],
            MediaRegion::Unsupported { media_type } => {
                let label = if media_type.is_empty() {
                    "unknown"
                } else {
                    media_type.as_str()
                };
                vec![Line::from(Span::styled(
                    format!("Unsupported media type: {label}"),
                    Style::default().add_modifier(Modifier::ITALIC),
                ))]
            }
        }
    }

    /// Title, date, credit and the wrapped explanation.
    pub fn body_lines(&self, width: u16) -> Vec<Line<'static>> {
        let width = width.max(8) as usize;
        let mut lines = Vec::new();
        lines.push(Line::from(Span::styled(
            self.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        let mut meta = self.display_date.clone();
        if let Some(credit) = &self.copyright {
            meta.push_str(&format!(" · © {credit}"));
        }
        lines.push(Line::from(Span::styled(
            meta,
            Style::default().add_modifier(Modifier::DIM),
        )));
        lines.push(Line::default());
        for paragraph in self.explanation.split('\n') {
            if paragraph.trim().is_empty() {
                lines.push(Line::default());
                continue;
            }
            for row in wrap(paragraph.trim(), WrapOptions::new(width)) {
                lines.push(Line::from(row.into_owned()));
            }
        }
        lines
    }
}

/// Holds at most one overlay. Opening replaces; dismissing an empty slot
/// does nothing.
#[derive(Debug, Default)]
pub struct OverlaySlot {
    current: Option<Overlay>,
}

impl OverlaySlot {
    pub fn open(&mut self, entry: MediaEntry) -> &Overlay {
        if let Some(previous) = self.current.take() {
            tracing::debug!(title = previous.title(), "replacing open overlay");
        }
        self.current.insert(Overlay::new(entry))
    }

    pub fn open_card(&mut self, card: &gallery::Card) -> &Overlay {
        self.open(card.entry.clone())
    }

    pub fn dismiss(&mut self, reason: DismissReason) -> bool {
        match self.current.take() {
            Some(overlay) => {
                tracing::debug!(?reason, title = overlay.title(), "overlay dismissed");
                true
            }
            None => false,
        }
    }

    pub fn get(&self) -> Option<&Overlay> {
        self.current.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut Overlay> {
        self.current.as_mut()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }
}
