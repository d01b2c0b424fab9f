use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::preview::geometry::CardMetrics;

pub mod placement;

pub use placement::PlacementTable;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "SocialCore";
const APP_NAME: &str = "socialcore";

pub const CONFIG_ENV: &str = "SOCIALCORE_CONFIG";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load();
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        Ok(Self {
            config_dir,
            config_file,
        })
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let config_dir = dir.into();
        let config_file = config_dir.join("config.toml");
        Self {
            config_dir,
            config_file,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "creating configuration directory {}",
                self.config_dir.display()
            )
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub hover: HoverConfig,
    pub notifications: NotificationConfig,
}

impl AppConfig {
    fn post_load(&mut self) {
        self.hover.sanitize();
        self.notifications.sanitize();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    pub show_delay_ms: u64,
    pub hide_delay_ms: u64,
    pub card_width: f64,
    pub viewport_margin: f64,
    pub placements: PlacementTable,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            show_delay_ms: 400,
            hide_delay_ms: 300,
            card_width: 300.0,
            viewport_margin: 8.0,
            placements: PlacementTable::default(),
        }
    }
}

impl HoverConfig {
    pub fn show_delay(&self) -> Duration {
        Duration::from_millis(self.show_delay_ms)
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_delay_ms)
    }

    pub fn metrics(&self) -> CardMetrics {
        CardMetrics {
            card_width: self.card_width,
            margin: self.viewport_margin,
        }
    }

    fn sanitize(&mut self) {
        let defaults = HoverConfig::default();
        if !(self.card_width.is_finite() && self.card_width > 0.0) {
            tracing::warn!(card_width = self.card_width, "invalid card width, using default");
            self.card_width = defaults.card_width;
        }
        if !(self.viewport_margin.is_finite() && self.viewport_margin >= 0.0) {
            tracing::warn!(
                margin = self.viewport_margin,
                "invalid viewport margin, using default"
            );
            self.viewport_margin = defaults.viewport_margin;
        }
        self.placements.sanitize();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notices disappear after this long (0 = keep until replaced)
    pub dismiss_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { dismiss_ms: 3000 }
    }
}

impl NotificationConfig {
    pub fn dismiss_after(&self) -> Option<Duration> {
        if self.dismiss_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.dismiss_ms))
        }
    }

    fn sanitize(&mut self) {
        const MAX_DISMISS_MS: u64 = 60_000;
        if self.dismiss_ms > MAX_DISMISS_MS {
            tracing::warn!(
                dismiss_ms = self.dismiss_ms,
                "notification dismiss interval too long, capping"
            );
            self.dismiss_ms = MAX_DISMISS_MS;
        }
    }
}
