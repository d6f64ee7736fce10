use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api;
use crate::config::{self, Config};
use crate::data::{MemoryBoard, Services};
use crate::logging;
use crate::router::Route;
use crate::store::{State, Store};
use crate::sync::Synchronizer;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub offline: bool,
    pub path: Option<String>,
    pub config_file: Option<PathBuf>,
}

pub fn run(options: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    let log_file = logging::init(&cfg.logging).context("init logging")?;
    let config_path = options.config_file.clone().or_else(config::default_path);
    tracing::info!(
        offline = options.offline,
        config = %friendly_path(config_path.as_ref()),
        log = ?log_file,
        "starting"
    );

    let services = build_services(&cfg, options.offline)?;
    let status = if options.offline {
        "Offline board with sample data. Changes are kept until you quit.".to_string()
    } else {
        format!(
            "Board at {} · config {}",
            cfg.api.base_url,
            friendly_path(config_path.as_ref())
        )
    };

    let route = options
        .path
        .as_deref()
        .map(Route::parse)
        .unwrap_or_default();

    let mut model = ui::Model::new(ui::Options {
        store: Store::new(State::with_sort_order(cfg.ui.sort_order)),
        sync: Synchronizer::new(services),
        route,
        author: cfg.ui.author.clone(),
        notice_ttl: cfg.ui.notice_ttl,
        tick_rate: cfg.ui.tick_rate,
        status_message: status,
    });
    model.run()?;

    tracing::info!("shutting down");
    Ok(())
}

pub fn build_services(cfg: &Config, offline: bool) -> Result<Services> {
    if offline {
        return Ok(Services::memory(Arc::new(MemoryBoard::sample())));
    }
    let client = api::Client::new(api::ClientConfig {
        base_url: cfg.api.base_url.clone(),
        user_agent: cfg.api.user_agent.clone(),
        timeout: cfg.api.timeout,
        headers: cfg.api.headers.clone(),
        http_client: None,
    })
    .context("create board client")?;
    Ok(Services::http(Arc::new(client)))
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
        "~/.config/readable-tui/config.yaml".to_string()
    }
}
