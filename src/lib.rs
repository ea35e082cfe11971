#![allow(clippy::uninlined_format_args)]

pub mod apod;
pub mod app;
pub mod config;
pub mod data;
pub mod dates;
pub mod facts;
pub mod fetch;
pub mod gallery;
pub mod logging;
pub mod overlay;
pub mod text;
pub mod thumbs;
pub mod ui;
pub mod video;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
