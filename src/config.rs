//! Layered settings: built-in defaults overlaid by `config.toml` in the
//! platform config directory.

use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::export::LineEnding;
use crate::sort::SortDirection;
use crate::{CompressionFormat, ExportFormat};

const CONFIG_FILE: &str = "config.toml";

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

/// Locates and writes the config file for one application.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    dir: PathBuf,
}

impl ConfigManager {
    /// Use `dir` as the config directory. Tests point this at a temp dir.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `<platform config dir>/<app_name>`, e.g. `~/.config/jsonquery`.
    pub fn new(app_name: &str) -> Result<Self> {
        dirs::config_dir()
            .map(|base| Self::with_dir(base.join(app_name)))
            .ok_or_else(|| eyre!("No config directory available on this platform"))
    }

    pub fn config_dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| eyre!("Failed to create {}: {}", self.dir.display(), e))
    }

    /// The commented template written by `--generate-config`.
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the template to `config.toml`. An existing file is only
    /// replaced when `force` is set.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let path = self.config_path(CONFIG_FILE);
        if path.exists() && !force {
            bail!(
                "Config file already exists at {}. Use --force to overwrite.",
                path.display()
            );
        }
        self.ensure_config_dir()?;
        fs::write(&path, self.generate_default_config())
            .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
        Ok(path)
    }

    /// Parse `config.toml` as written by the user; absent keys take their
    /// defaults. No file at all is the same as an empty one.
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config_path(CONFIG_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AppConfig::default()),
            Err(e) => bail!("Failed to read config file {}: {}", path.display(), e),
        };
        toml::from_str(&text)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
    }
}

/// Replace `slot` when `value` differs from the section default.
fn overlay<T: PartialEq>(slot: &mut T, value: T, default: T) {
    if value != default {
        *slot = value;
    }
}

/// Settings from `config.toml`. Every section and key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: String,
    pub loading: LoadingConfig,
    pub export: ExportConfig,
    pub query: QueryConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Force a decompression format instead of detecting it from the extension
    pub compression: Option<String>,
    /// Infer a schema from the data when no schema file is given
    pub infer_schema: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: String,
    pub csv_line_ending: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub group_sort: String,
    pub limit: Option<usize>,
    pub group_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            loading: LoadingConfig::default(),
            export: ExportConfig::default(),
            query: QueryConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            compression: None,
            infer_schema: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            csv_line_ending: "crlf".to_string(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            group_sort: "desc".to_string(),
            limit: None,
            group_limit: None,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with the user's file for `app_name`, validated.
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_from(&ConfigManager::new(app_name)?)
    }

    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(manager.load_config()?);
        config.validate().map(|()| config)
    }

    /// Overlay `other` onto `self`; values in `other` that differ from the
    /// defaults win.
    pub fn merge(&mut self, other: AppConfig) {
        let defaults = AppConfig::default();
        overlay(&mut self.version, other.version, defaults.version);
        self.loading.merge(other.loading);
        self.export.merge(other.export);
        self.query.merge(other.query);
        self.debug.merge(other.debug);
    }

    /// Reject values the rest of the program cannot interpret.
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            bail!("Unsupported config version: {}. Expected 0.1.x", self.version);
        }
        if let Some(name) = self.loading.compression.as_deref() {
            if CompressionFormat::from_name(name).is_none() {
                bail!("loading.compression: unknown format '{}' (gzip, zstd, bzip2, xz)", name);
            }
        }
        if ExportFormat::from_extension(&self.export.format).is_none() {
            bail!("export.format: expected json or csv, got '{}'", self.export.format);
        }
        if LineEnding::parse(&self.export.csv_line_ending).is_none() {
            bail!(
                "export.csv_line_ending: expected crlf or lf, got '{}'",
                self.export.csv_line_ending
            );
        }
        if SortDirection::parse(&self.query.group_sort).is_none() {
            bail!(
                "query.group_sort: expected asc or desc, got '{}'",
                self.query.group_sort
            );
        }
        if self.query.group_limit == Some(0) {
            bail!("query.group_limit must be at least 1");
        }
        Ok(())
    }

    pub fn compression(&self) -> Option<CompressionFormat> {
        self.loading
            .compression
            .as_deref()
            .and_then(CompressionFormat::from_name)
    }

    pub fn export_format(&self) -> ExportFormat {
        ExportFormat::from_extension(&self.export.format).unwrap_or_default()
    }

    pub fn line_ending(&self) -> LineEnding {
        LineEnding::parse(&self.export.csv_line_ending).unwrap_or_default()
    }

    pub fn group_sort(&self) -> SortDirection {
        SortDirection::parse(&self.query.group_sort).unwrap_or(SortDirection::Desc)
    }
}

impl LoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.compression.is_some() {
            self.compression = other.compression;
        }
        overlay(&mut self.infer_schema, other.infer_schema, true);
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        let defaults = ExportConfig::default();
        overlay(&mut self.format, other.format, defaults.format);
        overlay(
            &mut self.csv_line_ending,
            other.csv_line_ending,
            defaults.csv_line_ending,
        );
    }
}

impl QueryConfig {
    pub fn merge(&mut self, other: Self) {
        overlay(&mut self.group_sort, other.group_sort, QueryConfig::default().group_sort);
        self.limit = other.limit.or(self.limit);
        self.group_limit = other.group_limit.or(self.group_limit);
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        self.enabled |= other.enabled;
    }
}
