use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::apod;
use crate::config;
use crate::data::{self, FeedService};
use crate::fetch;
use crate::gallery;
use crate::logging;
use crate::thumbs;
use crate::ui;

/// Command-line overrides layered over the loaded config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub feed_url: Option<String>,
    pub offline: bool,
    pub config_file: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    run_with(RunOptions::default())
}

pub fn run_with(options: RunOptions) -> Result<()> {
    let cfg = load_config(&options)?;
    init_logging(&cfg);

    let ui_options = ui_options(&cfg, &options);
    tracing::info!(version = crate::VERSION, "starting");
    let mut model = ui::Model::new(ui_options);
    model.run()?;
    tracing::info!("exiting");
    Ok(())
}

/// The gallery stays empty until the user asks for a fetch.
fn ui_options(cfg: &config::Config, options: &RunOptions) -> ui::Options {
    let (feed_service, status) = match build_feed_service(cfg, options.offline) {
        Ok(service) => {
            let status = if options.offline {
                "Offline mode: press f to load the built-in sample feed."
            } else {
                "Press f to fetch the latest space photos, q to quit."
            };
            (Some(service), status.to_string())
        }
        Err(err) => {
            tracing::error!(error = %err, "feed client unavailable");
            (None, format!("Failed to initialize the APOD client: {err}"))
        }
    };

    let thumb_loader = if cfg.ui.thumbnails && !options.offline {
        match thumbs::Loader::new(cfg.feed.timeout, &cfg.feed.user_agent) {
            Ok(loader) => Some(Arc::new(loader)),
            Err(err) => {
                tracing::warn!(error = %err, "thumbnail previews disabled");
                None
            }
        }
    } else {
        None
    };

    let palette = ui::Palette::from_theme(&cfg.ui.theme).unwrap_or_else(|| {
        tracing::warn!(theme = %cfg.ui.theme, "unknown theme, using default");
        ui::Palette::default()
    });

    ui::Options {
        status_message: format!(
            "{status} (config: {})",
            friendly_path(options.config_file.as_ref().or(config::default_path().as_ref()))
        ),
        feed_service,
        thumb_loader,
        gallery_size: cfg.gallery.size,
        player: cfg.player.clone(),
        fetch_on_start: false,
        palette,
    }
}

/// Fetch once and print the gallery as plain text. Fails when nothing could
/// be shown.
pub fn dump<W: Write>(options: RunOptions, out: &mut W) -> Result<()> {
    let cfg = load_config(&options)?;
    let service = build_feed_service(&cfg, options.offline)?;

    let mut orchestrator = fetch::Orchestrator::new();
    let ticket = orchestrator.begin();
    let result = service.load_entries();
    let size = cfg.gallery.size;
    orchestrator.finish(ticket.request_id(), result, |entries| {
        gallery::render(entries, size)
    });

    match orchestrator.state() {
        fetch::FetchState::Ready(gallery) => {
            for card in gallery.cards() {
                let badge = card
                    .badge()
                    .map(|badge| format!(" [{badge}]"))
                    .unwrap_or_default();
                writeln!(out, "{}  {}{}", card.display_date, card.title, badge)?;
                if !card.thumbnail.is_empty() {
                    writeln!(out, "    {}", card.thumbnail)?;
                }
            }
            Ok(())
        }
        fetch::FetchState::Failed(failure) => bail!("{}", failure.message()),
        fetch::FetchState::Idle | fetch::FetchState::Loading => {
            bail!("{}", fetch::COULD_NOT_LOAD_MESSAGE)
        }
    }
}

fn load_config(options: &RunOptions) -> Result<config::Config> {
    let mut cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if let Some(url) = options.feed_url.as_ref() {
        cfg.feed.url = url.clone();
    }
    Ok(cfg)
}

fn init_logging(cfg: &config::Config) {
    // Logging is best effort: a broken log path must not keep the UI from starting.
    if let Err(err) = logging::init(&cfg.logging.level, cfg.logging.file.as_deref()) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn build_feed_service(
    cfg: &config::Config,
    offline: bool,
) -> Result<Arc<dyn FeedService + Send + Sync>> {
    if offline {
        return Ok(Arc::new(data::MockFeedService::sample()));
    }
    let client = apod::Client::new(apod::ClientConfig {
        feed_url: cfg.feed.url.clone(),
        user_agent: cfg.feed.user_agent.clone(),
        timeout: cfg.feed.timeout,
        http_client: None,
    })
    .context("build APOD client")?;
    Ok(Arc::new(data::ApodFeedService::new(Arc::new(client))))
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/apod-tui/config.yaml".to_string()
    }
}
