use crate::apod::MediaEntry;
use crate::text;
use crate::video;

pub const DEFAULT_GALLERY_SIZE: usize = 9;
pub const GRID_COLUMNS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub entry: MediaEntry,
    pub title: String,
    pub display_date: String,
    pub thumbnail: String,
    pub is_video: bool,
}

impl Card {
    fn new(entry: MediaEntry) -> Self {
        Self {
            title: text::sanitize_line(&entry.title),
            display_date: text::sanitize_line(&entry.display_date()),
            thumbnail: thumbnail_for(&entry),
            is_video: !entry.media_type.is_image(),
            entry,
        }
    }

    pub fn badge(&self) -> Option<&'static str> {
        self.is_video.then_some("Video")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    cards: Vec<Card>,
    selected: usize,
}

impl Gallery {
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Card> {
        self.cards.get(self.selected)
    }

    pub fn select(&mut self, index: usize) -> Option<&Card> {
        if index < self.cards.len() {
            self.selected = index;
        }
        self.cards.get(index)
    }

    /// Grid movement; stops at the edges.
    pub fn move_selection(&mut self, direction: Direction) -> bool {
        if self.cards.is_empty() {
            return false;
        }
        let current = self.selected;
        let column = current % GRID_COLUMNS;
        let next = match direction {
            Direction::Left if column > 0 => current - 1,
            Direction::Right if column + 1 < GRID_COLUMNS => current + 1,
            Direction::Up if current >= GRID_COLUMNS => current - GRID_COLUMNS,
            Direction::Down => current + GRID_COLUMNS,
            _ => current,
        };
        if next < self.cards.len() && next != current {
            self.selected = next;
            true
        } else {
            false
        }
    }

    pub fn rows(&self) -> usize {
        self.cards.len().div_ceil(GRID_COLUMNS)
    }
}

/// Newest `limit` entries as cards. Equal dates keep feed order; dates that
/// don't parse are treated as the oldest.
pub fn render(entries: &[MediaEntry], limit: usize) -> Gallery {
    let mut ordered: Vec<&MediaEntry> = entries.iter().collect();
    // sort_by_key is stable
    ordered.sort_by_key(|entry| std::cmp::Reverse(entry.parsed_date()));
    let cards = ordered
        .into_iter()
        .take(limit)
        .cloned()
        .map(Card::new)
        .collect();
    Gallery { cards, selected: 0 }
}

pub fn thumbnail_for(entry: &MediaEntry) -> String {
    if entry.media_type.is_image() {
        return entry.url.clone();
    }
    if let Some(thumb) = entry.thumbnail_url() {
        return thumb.to_string();
    }
    let derived = video::extract_video_thumbnail(&entry.url);
    if !derived.is_empty() {
        return derived;
    }
    entry.url.clone()
}
