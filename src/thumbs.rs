use std::io::Read;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use reqwest::blocking::Client;

const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;
const UPPER_HALF_BLOCK: &str = "▀";

/// A picture rendered as terminal cells: each cell shows two vertically
/// stacked pixels, the top one as foreground and the bottom as background.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl Preview {
    pub fn from_image(image: &RgbImage) -> Self {
        let pixels = image.pixels().map(|p| p.0).collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    /// Size in terminal cells.
    pub fn cells(&self) -> (u16, u16) {
        (self.width as u16, self.height.div_ceil(2) as u16)
    }

    fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let (_, rows) = self.cells();
        (0..rows as u32)
            .map(|row| {
                let spans: Vec<Span<'static>> = (0..self.width)
                    .map(|x| {
                        let top = self.pixel(x, row * 2).map(rgb);
                        let bottom = self.pixel(x, row * 2 + 1).map(rgb);
                        let mut style = Style::default();
                        if let Some(top) = top {
                            style = style.fg(top);
                        }
                        if let Some(bottom) = bottom {
                            style = style.bg(bottom);
                        }
                        Span::styled(UPPER_HALF_BLOCK, style)
                    })
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(r, g, b)
}

/// Decode `bytes` and scale to fit inside `cols` x `rows` cells, keeping the
/// aspect ratio.
pub fn render_preview(bytes: &[u8], cols: u16, rows: u16) -> Result<Preview> {
    if bytes.is_empty() {
        bail!("preview image had no bytes");
    }
    if cols == 0 || rows == 0 {
        bail!("preview area is empty");
    }
    let image = image::load_from_memory(bytes).context("decode preview image")?;
    let scaled = image.resize(cols as u32, rows as u32 * 2, FilterType::Triangle);
    Ok(Preview::from_image(&scaled.to_rgb8()))
}

pub struct Loader {
    client: Client,
}

impl Loader {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("thumbs: build http client")?;
        Ok(Self { client })
    }

    pub fn load(&self, url: &str, cols: u16, rows: u16) -> Result<Preview> {
        let bytes = self.fetch_image_bytes(url)?;
        render_preview(&bytes, cols, rows).with_context(|| format!("render preview {url}"))
    }

    fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if url.trim().is_empty() {
            bail!("thumbs: url required");
        }
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request preview {url}"))?;
        if !response.status().is_success() {
            bail!("preview request returned status {}", response.status());
        }
        let mut bytes = Vec::with_capacity(128 * 1024);
        response
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .with_context(|| format!("read preview body {url}"))?;
        Ok(bytes)
    }
}
