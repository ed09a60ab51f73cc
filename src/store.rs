//! Persistence for the notification settings.

use crate::config::NotificationsConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Loads and saves `NotificationsConfig`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns the stored settings, or `None` if nothing has been stored yet.
    async fn load(&self) -> Result<Option<NotificationsConfig>>;

    /// Replaces the stored settings.
    async fn save(&self, config: &NotificationsConfig) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }
}

/// Stores the settings in a YAML file, or JSON when the path ends in `.json`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    format: FileFormat,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FileFormat::for_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, text: &str) -> Result<NotificationsConfig> {
        let config = match self.format {
            FileFormat::Yaml => serde_yml::from_str(text)?,
            FileFormat::Json => serde_json::from_str(text)?,
        };
        Ok(config)
    }

    fn render(&self, config: &NotificationsConfig) -> Result<String> {
        let text = match self.format {
            FileFormat::Yaml => serde_yml::to_string(config)?,
            FileFormat::Json => serde_json::to_string_pretty(config)?,
        };
        Ok(text)
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<Option<NotificationsConfig>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No notification settings file");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };

        let config = self
            .parse(&text)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        info!(path = %self.path.display(), "Loaded notification settings");
        Ok(Some(config))
    }

    async fn save(&self, config: &NotificationsConfig) -> Result<()> {
        let text = self.render(config)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        // Write next to the target and rename so readers never see a partial file.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, text)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Saved notification settings");
        Ok(())
    }
}

/// Keeps the settings in memory. Can be told to fail saves.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: Mutex<Option<NotificationsConfig>>,
    fail_saves: AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<NotificationsConfig> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Option<NotificationsConfig>> {
        Ok(self.stored())
    }

    async fn save(&self, config: &NotificationsConfig) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("settings store is read-only");
        }
        *self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(config.clone());
        Ok(())
    }
}
