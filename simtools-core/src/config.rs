use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{Result, ToolsError};

/// Default number of characters after a guarded declaration header within
/// which call matches are ignored.
pub const DEFAULT_LOOKBACK: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Game script, relative to the project root.
    pub script: String,
    pub assets_dir: String,
    pub mapping_output: String,
    /// File stems that keep their public name when obfuscating.
    pub keep_names: Vec<String>,
    pub lookback: usize,
    /// pngquant `--quality` range, `MIN-MAX`.
    pub png_quality: String,
    pub pngquant_speed: u8,
    pub webp_quality: u8,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            script: "game.js".to_string(),
            assets_dir: "assets".to_string(),
            mapping_output: "tools/asset_mapping.js".to_string(),
            keep_names: vec!["texture".to_string()],
            lookback: DEFAULT_LOOKBACK,
            png_quality: "75-90".to_string(),
            pngquant_speed: 1,
            webp_quality: 80,
        }
    }
}

impl ToolsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.webp_quality > 100 {
            return Err(ToolsError::Config(format!(
                "webp_quality must be 0-100, got {}",
                self.webp_quality
            )));
        }
        parse_quality_range(&self.png_quality)?;
        if !(1..=11).contains(&self.pngquant_speed) {
            return Err(ToolsError::Config(format!(
                "pngquant_speed must be 1-11, got {}",
                self.pngquant_speed
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse a pngquant quality range such as `75-90`.
pub fn parse_quality_range(range: &str) -> Result<(u8, u8)> {
    let bad = || ToolsError::Config(format!("invalid PNG quality range '{range}', expected MIN-MAX"));

    let (min, max) = range.trim().split_once('-').ok_or_else(bad)?;
    let min: u8 = min.trim().parse().map_err(|_| bad())?;
    let max: u8 = max.trim().parse().map_err(|_| bad())?;
    if min > max || max > 100 {
        return Err(bad());
    }
    Ok((min, max))
}

/// Location of the per-user config file, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("simtools");
    base.push("config.json");
    Some(base)
}

/// Load configuration.
///
/// An explicit path must exist and parse. Without one, the per-user file is
/// used when it is present and valid; anything else falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ToolsConfig> {
    if let Some(path) = explicit {
        let data = fs::read_to_string(path).map_err(|e| {
            ToolsError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let cfg: ToolsConfig = serde_json::from_str(&data)?;
        cfg.validate()?;
        debug!(path = %path.display(), "loaded config");
        return Ok(cfg);
    }

    if let Some(path) = default_config_path() {
        if let Ok(data) = fs::read_to_string(&path) {
            match serde_json::from_str::<ToolsConfig>(&data) {
                Ok(cfg) if cfg.validate().is_ok() => {
                    debug!(path = %path.display(), "loaded user config");
                    return Ok(cfg);
                }
                _ => warn!(path = %path.display(), "ignoring unreadable user config"),
            }
        }
    }
    Ok(ToolsConfig::default())
}

pub fn save_config(cfg: &ToolsConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, cfg.to_json()?)?;
    Ok(())
}
