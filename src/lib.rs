#![allow(clippy::uninlined_format_args)]

pub mod actions;
pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod modal;
pub mod model;
pub mod router;
pub mod selectors;
pub mod store;
pub mod sync;
pub mod ui;
pub mod views;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
