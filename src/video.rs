use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

const THUMBNAIL_HOST: &str = "https://img.youtube.com/vi";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const URL_PLACEHOLDER: &str = "%URL%";

static VIDEO_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com|youtube-nocookie\.com|youtu\.be").expect("host regex"));

// Tried in order: embedded player, query parameter, short link.
static VIDEO_ID_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"embed/([A-Za-z0-9_-]+)").expect("embed regex"),
        Regex::new(r"[?&]v=([A-Za-z0-9_-]+)").expect("query regex"),
        Regex::new(r"youtu\.be/([A-Za-z0-9_-]+)").expect("short link regex"),
    ]
});

pub fn is_video_host_url(url: &str) -> bool {
    VIDEO_HOST.is_match(url)
}

pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Predictable thumbnail for a hosted video, or an empty string when no id
/// can be pulled out of the URL.
pub fn extract_video_thumbnail(url: &str) -> String {
    match extract_video_id(url) {
        Some(id) => format!("{THUMBNAIL_HOST}/{id}/hqdefault.jpg"),
        None => String::new(),
    }
}

/// Embedded-player URLs don't play in desktop players; hand them the watch
/// page instead.
pub fn watch_url(url: &str) -> Option<String> {
    if !is_video_host_url(url) {
        return None;
    }
    extract_video_id(url).map(|id| format!("{WATCH_URL}{id}"))
}

pub struct ExternalLaunchOptions<'a> {
    pub command: &'a [String],
    pub url: &'a str,
    pub detach: bool,
}

pub fn player_args(command: &[String], url: &str) -> Result<(String, Vec<String>)> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| anyhow!("video player command is empty"))?;
    let mut saw_placeholder = false;
    let mut args: Vec<String> = rest
        .iter()
        .map(|arg| {
            if arg.contains(URL_PLACEHOLDER) {
                saw_placeholder = true;
                arg.replace(URL_PLACEHOLDER, url)
            } else {
                arg.clone()
            }
        })
        .collect();
    if !saw_placeholder {
        args.push(url.to_string());
    }
    Ok((program.clone(), args))
}

pub fn spawn_external_player(opts: ExternalLaunchOptions<'_>) -> Result<()> {
    if opts.url.trim().is_empty() {
        return Err(anyhow!("video url missing"));
    }
    let (program, args) = player_args(opts.command, opts.url)?;

    tracing::info!(%program, url = opts.url, "launching video player");

    let mut command = Command::new(&program);
    command.args(&args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());
    let mut child = command
        .spawn()
        .with_context(|| format!("launch {program} for {}", opts.url))?;
    if !opts.detach {
        child
            .wait()
            .with_context(|| format!("wait for {program}"))?;
    }
    Ok(())
}
