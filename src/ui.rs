use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::apod::{FeedError, MediaEntry};
use crate::config;
use crate::data::FeedService;
use crate::facts;
use crate::fetch::{self, FetchState, Orchestrator};
use crate::gallery::{self, Card, GRID_COLUMNS};
use crate::overlay::{self, DismissReason, OverlaySlot};
use crate::thumbs::{self, Preview};
use crate::video;

/// Colors for every widget the UI draws, selected by `ui.theme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub backdrop: Color,
    pub panel_bg: Color,
    pub panel_focused_bg: Color,
    pub border_idle: Color,
    pub border_focused: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,
    pub badge: Color,
    pub error: Color,
}

impl Palette {
    pub const DARK: Palette = Palette {
        bg: Color::Rgb(30, 30, 46),
        backdrop: Color::Rgb(17, 17, 27),
        panel_bg: Color::Rgb(24, 24, 36),
        panel_focused_bg: Color::Rgb(49, 50, 68),
        border_idle: Color::Rgb(49, 50, 68),
        border_focused: Color::Rgb(137, 180, 250),
        text_primary: Color::Rgb(205, 214, 244),
        text_secondary: Color::Rgb(166, 173, 200),
        accent: Color::Rgb(137, 180, 250),
        badge: Color::Rgb(250, 179, 135),
        error: Color::Rgb(243, 139, 168),
    };

    pub const LIGHT: Palette = Palette {
        bg: Color::Rgb(239, 241, 245),
        backdrop: Color::Rgb(220, 224, 232),
        panel_bg: Color::Rgb(230, 233, 239),
        panel_focused_bg: Color::Rgb(204, 208, 218),
        border_idle: Color::Rgb(188, 192, 204),
        border_focused: Color::Rgb(30, 102, 245),
        text_primary: Color::Rgb(76, 79, 105),
        text_secondary: Color::Rgb(92, 95, 119),
        accent: Color::Rgb(30, 102, 245),
        badge: Color::Rgb(254, 100, 11),
        error: Color::Rgb(210, 15, 57),
    };

    /// `None` for names no palette answers to.
    pub fn from_theme(name: &str) -> Option<Palette> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "dark" => Some(Palette::DARK),
            "light" => Some(Palette::LIGHT),
            _ => None,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::DARK
    }
}

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FETCH_BUTTON_LABEL: &str = "[ Fetch ]";
const CLOSE_CONTROL_LABEL: &str = "[×]";
const OVERLAY_PREVIEW_PERCENT: u16 = 45;

#[derive(Clone)]
pub struct Options {
    pub status_message: String,
    pub feed_service: Option<Arc<dyn FeedService + Send + Sync>>,
    pub thumb_loader: Option<Arc<thumbs::Loader>>,
    pub gallery_size: usize,
    pub player: config::PlayerConfig,
    pub fetch_on_start: bool,
    pub palette: Palette,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PreviewKey {
    url: String,
    cols: u16,
    rows: u16,
}

enum PreviewState {
    Pending,
    Ready(Preview),
    Failed,
}

enum AsyncResponse {
    Feed {
        request_id: u64,
        result: Result<Vec<MediaEntry>, FeedError>,
    },
    Preview {
        key: PreviewKey,
        result: Result<Preview>,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

/// Screen regions recorded during the last draw, for mouse hit-testing.
#[derive(Default)]
struct HitAreas {
    fetch_button: Option<Rect>,
    cards: Vec<Rect>,
    overlay: Option<Rect>,
    overlay_close: Option<Rect>,
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn overlay_preview_rows(height: u16) -> u16 {
    (u32::from(height) * u32::from(OVERLAY_PREVIEW_PERCENT) / 100) as u16
}

fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn image_label(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .map(|host| format!("[image: {host}]"))
        .unwrap_or_else(|| "[no preview]".to_string())
}

pub struct Model {
    status_message: String,
    fact: &'static str,
    palette: Palette,
    orchestrator: Orchestrator,
    overlay: OverlaySlot,
    overlay_max_scroll: u16,
    overlay_preview: Option<PreviewKey>,
    feed_service: Option<Arc<dyn FeedService + Send + Sync>>,
    thumb_loader: Option<Arc<thumbs::Loader>>,
    previews: HashMap<PreviewKey, PreviewState>,
    wanted_previews: Vec<PreviewKey>,
    gallery_size: usize,
    player: config::PlayerConfig,
    hit_areas: HitAreas,
    needs_redraw: bool,
    spinner: Spinner,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let fact = facts::pick(&mut rand::thread_rng());
        let mut model = Self {
            status_message: options.status_message,
            fact,
            palette: options.palette,
            orchestrator: Orchestrator::new(),
            overlay: OverlaySlot::default(),
            overlay_max_scroll: 0,
            overlay_preview: None,
            feed_service: options.feed_service,
            thumb_loader: options.thumb_loader,
            previews: HashMap::new(),
            wanted_previews: Vec::new(),
            gallery_size: options.gallery_size.max(1),
            player: options.player,
            hit_areas: HitAreas::default(),
            needs_redraw: true,
            spinner: Spinner::new(),
            response_tx,
            response_rx,
        };
        if options.fetch_on_start {
            model.start_fetch();
        }
        model
    }

    pub fn fetch_state(&self) -> &FetchState {
        self.orchestrator.state()
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                self.render(terminal)?;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.status_message = format!("Error: {}", err);
                            self.mark_dirty();
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal.draw(|frame| self.draw(frame))?;
        self.needs_redraw = false;
        self.queue_previews();
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.orchestrator.is_loading()
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Feed { request_id, result } => {
                let size = self.gallery_size;
                let applied = self
                    .orchestrator
                    .finish(request_id, result, |entries| gallery::render(entries, size));
                if !applied {
                    return;
                }
                self.previews.clear();
                self.status_message = match self.orchestrator.state() {
                    FetchState::Ready(gallery) => format!(
                        "Showing the {} most recent photos. Enter opens details.",
                        gallery.len()
                    ),
                    FetchState::Failed(failure) => failure.message().to_string(),
                    FetchState::Idle | FetchState::Loading => self.status_message.clone(),
                };
                self.mark_dirty();
            }
            AsyncResponse::Preview { key, result } => {
                // Only keys still awaited are stored; a newer gallery clears them.
                if !matches!(self.previews.get(&key), Some(PreviewState::Pending)) {
                    return;
                }
                let state = match result {
                    Ok(preview) => PreviewState::Ready(preview),
                    Err(err) => {
                        tracing::debug!(url = %key.url, error = %err, "preview failed");
                        PreviewState::Failed
                    }
                };
                self.previews.insert(key, state);
                self.mark_dirty();
            }
        }
    }

    fn start_fetch(&mut self) {
        let Some(service) = self.feed_service.clone() else {
            self.status_message = "Feed unavailable: the HTTP client failed to start.".to_string();
            *self.orchestrator.state_mut() =
                FetchState::Failed(fetch::FetchFailure::CouldNotLoad);
            self.mark_dirty();
            return;
        };

        let ticket = self.orchestrator.begin();
        self.status_message = fetch::LOADING_MESSAGE.to_string();
        self.spinner.reset();
        self.hit_areas.cards.clear();
        tracing::info!(request_id = ticket.request_id(), "fetch started");

        let tx = self.response_tx.clone();
        thread::spawn(move || {
            if ticket.is_cancelled() {
                return;
            }
            let result = service.load_entries();
            if ticket.is_cancelled() {
                return;
            }
            let _ = tx.send(AsyncResponse::Feed {
                request_id: ticket.request_id(),
                result,
            });
        });
        self.mark_dirty();
    }

    fn queue_previews(&mut self) {
        let wanted = std::mem::take(&mut self.wanted_previews);
        let Some(loader) = self.thumb_loader.clone() else {
            return;
        };
        for key in wanted {
            if self.previews.contains_key(&key) {
                continue;
            }
            self.previews.insert(key.clone(), PreviewState::Pending);
            let tx = self.response_tx.clone();
            let loader = loader.clone();
            thread::spawn(move || {
                let result = loader.load(&key.url, key.cols, key.rows);
                let _ = tx.send(AsyncResponse::Preview { key, result });
            });
        }
    }

    fn open_overlay(&mut self, index: usize) {
        let Some(gallery) = self.orchestrator.gallery_mut() else {
            return;
        };
        let Some(card) = gallery.select(index).cloned() else {
            return;
        };
        self.reset_overlay_state();
        let overlay = self.overlay.open_card(&card);
        self.status_message = format!(
            "{} · Esc closes, o opens link{}",
            overlay.title(),
            if overlay.region().playable_url().is_some() {
                ", p plays"
            } else {
                ""
            }
        );
        self.mark_dirty();
    }

    fn dismiss_overlay(&mut self, reason: DismissReason) -> bool {
        let removed = self.overlay.dismiss(reason);
        self.reset_overlay_state();
        if removed {
            self.status_message = "Overlay closed.".to_string();
            self.mark_dirty();
        }
        removed
    }

    fn reset_overlay_state(&mut self) {
        if let Some(key) = self.overlay_preview.take() {
            self.previews.remove(&key);
            self.wanted_previews.retain(|wanted| wanted != &key);
        }
        self.overlay_max_scroll = 0;
        self.hit_areas.overlay = None;
        self.hit_areas.overlay_close = None;
    }

    fn open_overlay_link(&mut self) {
        let Some(overlay) = self.overlay.get() else {
            return;
        };
        let Some(raw) = overlay.region().link_url() else {
            self.status_message = "This entry has no link to open.".to_string();
            self.mark_dirty();
            return;
        };
        let Some(url) = overlay::checked_link(raw) else {
            self.status_message = "Refusing to open a non-web link.".to_string();
            self.mark_dirty();
            return;
        };
        match webbrowser::open(url.as_str()) {
            Ok(_) => {
                self.status_message = format!("Opened {} in your browser.", url.as_str());
            }
            Err(err) => {
                self.status_message = format!("Failed to open link: {err} (URL: {url})");
            }
        }
        self.mark_dirty();
    }

    fn play_overlay_video(&mut self) {
        let Some(url) = self
            .overlay
            .get()
            .and_then(|overlay| overlay.region().playable_url())
        else {
            self.status_message = "Nothing to play for this entry.".to_string();
            self.mark_dirty();
            return;
        };
        let opts = video::ExternalLaunchOptions {
            command: &self.player.video_command,
            url: &url,
            detach: self.player.video_detach,
        };
        self.status_message = match video::spawn_external_player(opts) {
            Ok(()) => format!("Launched {} for the video.", self.player_name()),
            Err(err) => format!("Failed to launch player: {err}"),
        };
        self.mark_dirty();
    }

    fn player_name(&self) -> String {
        self.player
            .video_command
            .first()
            .cloned()
            .unwrap_or_else(|| "player".to_string())
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.overlay.is_open() {
            return self.handle_overlay_key(code);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('f') | KeyCode::Char('F') | KeyCode::Char('r') | KeyCode::Char('R') => {
                self.start_fetch();
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(gallery::Direction::Left),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(gallery::Direction::Right),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(gallery::Direction::Up),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(gallery::Direction::Down),
            KeyCode::Enter => {
                if let Some(index) = self.orchestrator.gallery().map(|g| g.selected_index()) {
                    self.open_overlay(index);
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_overlay_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.dismiss_overlay(DismissReason::CancelKey);
            }
            KeyCode::Char('x') | KeyCode::Char('X') => {
                self.dismiss_overlay(DismissReason::CloseControl);
            }
            KeyCode::Char('o') | KeyCode::Char('O') => self.open_overlay_link(),
            KeyCode::Char('p') | KeyCode::Char('P') => self.play_overlay_video(),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_overlay(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_overlay(-1),
            KeyCode::PageDown => self.scroll_overlay(10),
            KeyCode::PageUp => self.scroll_overlay(-10),
            _ => {}
        }
        Ok(false)
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        let (column, row) = (event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.overlay.is_open() {
                    let on_close = self
                        .hit_areas
                        .overlay_close
                        .is_some_and(|area| rect_contains(area, column, row));
                    let inside = self
                        .hit_areas
                        .overlay
                        .is_some_and(|area| rect_contains(area, column, row));
                    if on_close {
                        self.dismiss_overlay(DismissReason::CloseControl);
                    } else if !inside {
                        self.dismiss_overlay(DismissReason::Backdrop);
                    }
                    return Ok(());
                }

                if self
                    .hit_areas
                    .fetch_button
                    .is_some_and(|area| rect_contains(area, column, row))
                {
                    self.start_fetch();
                    return Ok(());
                }

                let clicked = self
                    .hit_areas
                    .cards
                    .iter()
                    .position(|area| rect_contains(*area, column, row));
                if let Some(index) = clicked {
                    self.open_overlay(index);
                }
            }
            MouseEventKind::ScrollDown if self.overlay.is_open() => self.scroll_overlay(3),
            MouseEventKind::ScrollUp if self.overlay.is_open() => self.scroll_overlay(-3),
            _ => {}
        }
        Ok(())
    }

    fn move_selection(&mut self, direction: gallery::Direction) {
        if let Some(gallery) = self.orchestrator.gallery_mut() {
            if gallery.move_selection(direction) {
                self.mark_dirty();
            }
        }
    }

    fn scroll_overlay(&mut self, delta: i32) {
        let max = self.overlay_max_scroll;
        if let Some(overlay) = self.overlay.get_mut() {
            let before = overlay.scroll();
            overlay.scroll_by(delta, max);
            if overlay.scroll() != before {
                self.mark_dirty();
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(self.palette.bg)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
                .trim()
                .to_string()
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(self.palette.text_primary)
                .bg(self.palette.panel_focused_bg)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_header(frame, layout[1]);
        self.draw_fact_banner(frame, layout[2]);
        self.draw_gallery(frame, layout[3]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(self.palette.text_secondary)
                    .bg(self.palette.panel_bg)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[4]);

        if self.overlay.is_open() {
            self.draw_overlay(frame, full);
        }
    }

    fn draw_header(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let button_width = FETCH_BUTTON_LABEL.width() as u16;
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(button_width + 1)])
            .split(area);
        let title = Paragraph::new(Line::from(vec![Span::styled(
            " Astronomy Picture of the Day",
            Style::default()
                .fg(self.palette.accent)
                .add_modifier(Modifier::BOLD),
        )]))
        .style(Style::default().bg(self.palette.panel_bg));
        frame.render_widget(title, chunks[0]);

        let button_style = if self.is_loading() {
            Style::default().fg(self.palette.text_secondary).bg(self.palette.panel_bg)
        } else {
            Style::default()
                .fg(self.palette.accent)
                .bg(self.palette.panel_bg)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        };
        let button = Paragraph::new(FETCH_BUTTON_LABEL).style(button_style);
        let button_area = Rect {
            width: button_width.min(chunks[1].width),
            ..chunks[1]
        };
        frame.render_widget(button, button_area);
        self.hit_areas.fetch_button = Some(button_area);
    }

    fn draw_fact_banner(&self, frame: &mut Frame<'_>, area: Rect) {
        let banner = Paragraph::new(Line::from(vec![
            Span::styled(
                " Did you know? ",
                Style::default()
                    .fg(self.palette.badge)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.fact, Style::default().fg(self.palette.text_primary)),
        ]))
        .style(Style::default().bg(self.palette.panel_bg));
        frame.render_widget(banner, area);
    }

    fn draw_gallery(&mut self, frame: &mut Frame<'_>, area: Rect) {
        self.hit_areas.cards.clear();
        let block = Block::default()
            .title(Span::styled(
                "Gallery",
                Style::default()
                    .fg(self.palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.palette.border_idle))
            .style(Style::default().bg(self.palette.panel_bg));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (icon, message, color) = match self.orchestrator.state() {
            FetchState::Ready(gallery) if !gallery.is_empty() => {
                let cards = gallery.cards().to_vec();
                let selected = gallery.selected_index();
                let rows = gallery.rows().max(1);
                self.draw_cards(frame, inner, &cards, selected, rows);
                return;
            }
            FetchState::Idle | FetchState::Ready(_) => (
                "🔭",
                "Press f (or click Fetch) to load space photos.".to_string(),
                self.palette.text_secondary,
            ),
            FetchState::Loading => (
                "🔄",
                fetch::LOADING_MESSAGE.to_string(),
                self.palette.text_secondary,
            ),
            FetchState::Failed(failure) => (
                "⚠️",
                failure.message().to_string(),
                self.palette.error,
            ),
        };

        let top = inner.height.saturating_sub(3) / 2;
        let mut lines = vec![Line::default(); top as usize];
        lines.push(Line::from(Span::raw(icon)));
        lines.push(Line::from(Span::styled(message, Style::default().fg(color))));
        let placeholder = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(placeholder, inner);
    }

    fn draw_cards(
        &mut self,
        frame: &mut Frame<'_>,
        area: Rect,
        cards: &[Card],
        selected: usize,
        rows: usize,
    ) {
        let row_constraints = vec![Constraint::Ratio(1, rows as u32); rows];
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(row_constraints)
            .split(area);
        let column_constraints = vec![Constraint::Ratio(1, GRID_COLUMNS as u32); GRID_COLUMNS];

        for (row_index, row_area) in row_areas.iter().enumerate() {
            let column_areas = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(column_constraints.clone())
                .split(*row_area);
            for (column_index, card_area) in column_areas.iter().enumerate() {
                let index = row_index * GRID_COLUMNS + column_index;
                let Some(card) = cards.get(index) else {
                    break;
                };
                self.draw_card(frame, *card_area, card, index == selected);
                self.hit_areas.cards.push(*card_area);
            }
        }
    }

    fn draw_card(&mut self, frame: &mut Frame<'_>, area: Rect, card: &Card, selected: bool) {
        let border_color = if selected {
            self.palette.border_focused
        } else {
            self.palette.border_idle
        };
        let title_width = area.width.saturating_sub(4) as usize;
        let block = Block::default()
            .title(Span::styled(
                truncate_to_width(&card.title, title_width),
                Style::default()
                    .fg(self.palette.text_primary)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(if selected {
                self.palette.panel_focused_bg
            } else {
                self.palette.panel_bg
            }));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        self.draw_preview(frame, chunks[0], &card.thumbnail);

        let mut meta = vec![Span::styled(
            card.display_date.clone(),
            Style::default().fg(self.palette.text_secondary),
        )];
        if let Some(badge) = card.badge() {
            meta.push(Span::raw(" "));
            meta.push(Span::styled(
                format!(" {badge} "),
                Style::default()
                    .fg(self.palette.panel_bg)
                    .bg(self.palette.badge)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(meta)), chunks[1]);
    }

    /// Half-block preview when one is loaded, a text placeholder otherwise.
    fn draw_preview(&mut self, frame: &mut Frame<'_>, area: Rect, url: &str) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let key = PreviewKey {
            url: url.to_string(),
            cols: area.width,
            rows: area.height,
        };
        let placeholder = match self.previews.get(&key) {
            Some(PreviewState::Ready(preview)) => {
                let (cols, rows) = preview.cells();
                let target = Rect {
                    x: area.x + area.width.saturating_sub(cols) / 2,
                    y: area.y + area.height.saturating_sub(rows) / 2,
                    width: cols.min(area.width),
                    height: rows.min(area.height),
                };
                frame.render_widget(Paragraph::new(Text::from(preview.lines())), target);
                return;
            }
            Some(PreviewState::Pending) => "loading preview…".to_string(),
            Some(PreviewState::Failed) => image_label(url),
            None => {
                if self.thumb_loader.is_some() && !url.trim().is_empty() {
                    self.wanted_previews.push(key);
                }
                image_label(url)
            }
        };
        let top = area.height.saturating_sub(1) / 2;
        let mut lines = vec![Line::default(); top as usize];
        lines.push(Line::from(Span::styled(
            placeholder,
            Style::default()
                .fg(self.palette.text_secondary)
                .add_modifier(Modifier::ITALIC),
        )));
        frame.render_widget(
            Paragraph::new(Text::from(lines)).alignment(Alignment::Center),
            area,
        );
    }

    fn draw_overlay(&mut self, frame: &mut Frame<'_>, area: Rect) {
        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::default().style(Style::default().bg(self.palette.backdrop)),
            area,
        );

        let popup_area = centered_rect(80, 85, area);
        frame.render_widget(Clear, popup_area);
        self.hit_areas.overlay = Some(popup_area);

        let Some(overlay) = self.overlay.get().cloned() else {
            return;
        };

        let block = Block::default()
            .title(Span::styled(
                "Details",
                Style::default()
                    .fg(self.palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.palette.accent))
            .style(Style::default().bg(self.palette.panel_bg));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let close_width = CLOSE_CONTROL_LABEL.width() as u16;
        let close_area = Rect {
            x: popup_area.x + popup_area.width.saturating_sub(close_width + 2),
            y: popup_area.y,
            width: close_width.min(popup_area.width),
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(CLOSE_CONTROL_LABEL).style(
                Style::default()
                    .fg(self.palette.error)
                    .bg(self.palette.panel_bg)
                    .add_modifier(Modifier::BOLD),
            ),
            close_area,
        );
        self.hit_areas.overlay_close = Some(close_area);

        let media_lines = overlay.media_lines(&self.player_name());
        let show_preview = self.thumb_loader.is_some() && overlay.region().preview_url().is_some();
        let preview_height = if show_preview {
            overlay_preview_rows(inner.height)
        } else {
            0
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(preview_height),
                Constraint::Length(media_lines.len() as u16),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        if let Some(url) = overlay.region().preview_url().filter(|_| show_preview) {
            self.overlay_preview = Some(PreviewKey {
                url: url.to_string(),
                cols: chunks[0].width,
                rows: chunks[0].height,
            });
            self.draw_preview(frame, chunks[0], url);
        }
        frame.render_widget(
            Paragraph::new(Text::from(media_lines)).style(Style::default().fg(self.palette.accent)),
            chunks[1],
        );

        let body_area = chunks[3];
        let body = overlay.body_lines(body_area.width);
        self.overlay_max_scroll = (body.len() as u16).saturating_sub(body_area.height);
        let scroll = overlay.scroll().min(self.overlay_max_scroll);
        frame.render_widget(
            Paragraph::new(Text::from(body))
                .style(Style::default().fg(self.palette.text_primary))
                .scroll((scroll, 0)),
            body_area,
        );
    }

    fn footer_text(&self) -> String {
        if self.overlay.is_open() {
            return "Esc/x close · click outside to close · j/k scroll · o open link · p play video"
                .to_string();
        }
        match self.orchestrator.state() {
            FetchState::Ready(_) => {
                "f fetch · arrows/hjkl move · Enter or click opens details · q quit".to_string()
            }
            _ => "f fetch space photos · q quit".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apod::MediaType;
    use crate::data::MockFeedService;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn entry(day: u32, media_type: MediaType) -> MediaEntry {
        MediaEntry {
            date: format!("2025-10-{day:02}"),
            title: format!("Entry {day}"),
            explanation: format!("Explanation for entry {day}."),
            media_type,
            url: format!("https://apod.test/{day}.jpg"),
            ..MediaEntry::default()
        }
    }

    fn model_with(entries: Vec<MediaEntry>) -> Model {
        Model::new(Options {
            status_message: "ready".into(),
            feed_service: Some(Arc::new(MockFeedService { entries })),
            thumb_loader: None,
            gallery_size: gallery::DEFAULT_GALLERY_SIZE,
            player: config::PlayerConfig::default(),
            fetch_on_start: false,
            palette: Palette::DARK,
        })
    }

    fn wait_for_feed(model: &mut Model) {
        let message = model
            .response_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("feed response");
        model.handle_async_response(message);
    }

    fn screen(model: &mut Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        model.render(&mut terminal).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn fact_banner_is_shown_once() {
        let mut model = model_with(Vec::new());
        let fact = model.fact;
        assert!(facts::FACTS.contains(&fact));
        let text = screen(&mut model);
        assert!(text.contains("Did you know?"));
        assert_eq!(model.fact, fact);
    }

    #[test]
    fn fetch_key_loads_newest_nine() {
        let entries: Vec<MediaEntry> = (1..=12).map(|d| entry(d, MediaType::Image)).collect();
        let mut model = model_with(entries);
        model.handle_key(KeyCode::Char('f')).unwrap();
        assert!(model.is_loading());
        wait_for_feed(&mut model);
        let gallery = model.orchestrator.gallery().expect("gallery");
        assert_eq!(gallery.len(), 9);
        assert_eq!(gallery.cards()[0].title, "Entry 12");
        assert_eq!(gallery.cards()[8].title, "Entry 4");
    }

    #[test]
    fn empty_feed_shows_no_entries_message() {
        let mut model = model_with(Vec::new());
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);
        assert!(screen(&mut model).contains(fetch::NO_ENTRIES_MESSAGE));
    }

    #[test]
    fn missing_service_is_could_not_load() {
        let mut model = model_with(Vec::new());
        model.feed_service = None;
        model.handle_key(KeyCode::Char('f')).unwrap();
        assert!(screen(&mut model).contains(fetch::COULD_NOT_LOAD_MESSAGE));
    }

    #[test]
    fn stale_feed_response_is_ignored() {
        let mut model = model_with(vec![entry(1, MediaType::Image)]);
        model.handle_async_response(AsyncResponse::Feed {
            request_id: 41,
            result: Err(FeedError::Empty),
        });
        assert_eq!(model.orchestrator.state(), &FetchState::Idle);
    }

    #[test]
    fn video_cards_show_badge() {
        let mut video = entry(2, MediaType::Video);
        video.url = "https://www.youtube.com/embed/abc123".into();
        let mut model = model_with(vec![entry(1, MediaType::Image), video]);
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);
        let text = screen(&mut model);
        assert!(text.contains(" Video "));
        assert!(text.contains("Oct 02, 2025"));
    }

    #[test]
    fn enter_opens_and_escape_closes_overlay() {
        let mut model = model_with(vec![entry(1, MediaType::Image), entry(2, MediaType::Image)]);
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);

        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.overlay.get().map(|o| o.title()), Some("Entry 2"));
        let text = screen(&mut model);
        assert!(text.contains("Explanation for entry 2."));
        assert!(text.contains(CLOSE_CONTROL_LABEL));

        // Escape closes the overlay rather than quitting.
        assert!(!model.handle_key(KeyCode::Esc).unwrap());
        assert!(!model.overlay.is_open());
        assert!(model.hit_areas.overlay.is_none());
        assert!(!screen(&mut model).contains("Explanation for entry 2."));
    }

    #[test]
    fn opening_another_card_replaces_overlay() {
        let mut model = model_with(vec![entry(1, MediaType::Image), entry(2, MediaType::Image)]);
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);
        model.open_overlay(0);
        model.open_overlay(1);
        assert_eq!(model.overlay.get().map(|o| o.title()), Some("Entry 1"));
        let text = screen(&mut model);
        assert_eq!(text.matches(CLOSE_CONTROL_LABEL).count(), 1);
        assert!(!text.contains("Explanation for entry 2."));
    }

    #[test]
    fn mouse_opens_card_and_backdrop_closes() {
        let mut model = model_with(vec![entry(1, MediaType::Image)]);
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);
        screen(&mut model);

        let card = model.hit_areas.cards[0];
        model
            .handle_mouse(click(card.x + card.width / 2, card.y + card.height / 2))
            .unwrap();
        assert!(model.overlay.is_open());

        screen(&mut model);
        let popup = model.hit_areas.overlay.expect("overlay area");
        model
            .handle_mouse(click(popup.x + 2, popup.y + 2))
            .unwrap();
        assert!(model.overlay.is_open());

        model.handle_mouse(click(0, 0)).unwrap();
        assert!(!model.overlay.is_open());
        // A second dismissal finds nothing to remove.
        assert!(!model.dismiss_overlay(DismissReason::Backdrop));
    }

    #[test]
    fn close_control_click_closes() {
        let mut model = model_with(vec![entry(1, MediaType::Image)]);
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);
        model.open_overlay(0);
        screen(&mut model);
        let close = model.hit_areas.overlay_close.expect("close control");
        model.handle_mouse(click(close.x + 1, close.y)).unwrap();
        assert!(!model.overlay.is_open());
        assert!(model.hit_areas.overlay_close.is_none());
    }

    #[test]
    fn unsupported_media_notice() {
        let mut model = model_with(vec![entry(1, MediaType::Other("interactive".into()))]);
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);
        model.open_overlay(0);
        assert!(screen(&mut model).contains("Unsupported media type: interactive"));
    }

    #[test]
    fn light_theme_repaints_background() {
        let mut model = model_with(Vec::new());
        model.palette = Palette::from_theme("Light").unwrap();
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        model.render(&mut terminal).unwrap();
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer.get(0, 0).bg, Palette::LIGHT.panel_focused_bg);
        assert_eq!(buffer.get(0, 10).bg, Palette::LIGHT.panel_bg);
        assert_eq!(Palette::from_theme("default"), Some(Palette::DARK));
        assert_eq!(Palette::from_theme("solarized"), None);
    }

    #[test]
    fn overlay_preview_is_dropped_on_dismiss() {
        let mut model = model_with(vec![entry(1, MediaType::Image)]);
        model.thumb_loader = Some(Arc::new(
            thumbs::Loader::new(Duration::from_millis(50), "apod-tui-test").unwrap(),
        ));
        model.handle_key(KeyCode::Char('f')).unwrap();
        wait_for_feed(&mut model);
        model.open_overlay(0);
        screen(&mut model);

        let key = model.overlay_preview.clone().expect("overlay preview key");
        assert!(model.previews.contains_key(&key));

        model.handle_key(KeyCode::Esc).unwrap();
        assert!(model.overlay_preview.is_none());
        assert!(!model.previews.contains_key(&key));
        assert!(!model.wanted_previews.contains(&key));
    }

    #[test]
    fn overlay_preview_rows_do_not_overflow() {
        assert_eq!(overlay_preview_rows(40), 18);
        assert_eq!(overlay_preview_rows(u16::MAX), 29490);
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate_to_width("Andromeda", 20), "Andromeda");
        assert_eq!(truncate_to_width("Andromeda", 5), "Andr…");
        assert_eq!(truncate_to_width("Andromeda", 0), "");
    }

    #[test]
    fn rect_hit_testing() {
        let rect = Rect::new(2, 3, 4, 2);
        assert!(rect_contains(rect, 2, 3));
        assert!(rect_contains(rect, 5, 4));
        assert!(!rect_contains(rect, 6, 4));
        assert!(!rect_contains(rect, 2, 5));
    }
}
