// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer. Owns the data directory and the persisted scanning
// configuration, and writes finished pages out.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use scanflow_core::error::Result;
use scanflow_core::{PageImage, ScanConfig};
use scanflow_document::ImageProcessor;
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// Shared application services.
///
/// Cheaply cloneable so it can be moved into spawned tasks.
#[derive(Clone)]
pub struct AppServices {
    data_dir: PathBuf,
    config: Arc<Mutex<ScanConfig>>,
}

impl AppServices {
    /// Initialise services in the default data directory.
    pub fn init() -> Self {
        Self::with_data_dir(data_dir::data_dir())
    }

    /// Initialise services rooted at `dir`. A missing or unreadable config
    /// falls back to defaults.
    pub fn with_data_dir(dir: PathBuf) -> Self {
        info!(path = %dir.display(), "initialising app services");
        let config = load_config(&dir).unwrap_or_else(|| {
            info!("no saved configuration, using defaults");
            ScanConfig::default()
        });
        Self {
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub fn config(&self) -> ScanConfig {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the configuration and persist it.
    pub fn save_config(&self, config: &ScanConfig) -> Result<()> {
        *self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = config.clone();
        persist_config(&self.data_dir, config)
    }

    /// Default export location inside the data directory.
    pub fn exports_dir(&self) -> PathBuf {
        data_dir::subdir(&self.data_dir, "exports")
    }

    /// Write pages as `page-001.png`, `page-002.png`, ... into `out_dir`.
    pub fn export_pages(&self, pages: &[PageImage], out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let mut written = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            let path = out_dir.join(format!("page-{:03}.png", i + 1));
            ImageProcessor::from_page(page).save(&path)?;
            written.push(path);
        }
        info!(pages = written.len(), dir = %out_dir.display(), "Pages exported");
        Ok(written)
    }
}

fn load_config(data_dir: &Path) -> Option<ScanConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable configuration");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &ScanConfig) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
