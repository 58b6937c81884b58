use md5::{Digest, Md5};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{Result, ToolsError};

/// Extensions picked up for obfuscation, in listing order.
const IMAGE_EXTENSIONS: [&str; 2] = ["png", "webp"];

/// First 8 hex chars of the MD5 of a file stem.
pub fn hashed_stem(stem: &str) -> String {
    let digest = format!("{:x}", Md5::digest(stem.as_bytes()));
    digest[..8].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MappedAsset {
    original: String,
    obfuscated: String,
    source: PathBuf,
    target: PathBuf,
}

/// Public asset path to obfuscated path, in discovery order (all PNGs, then
/// all WebPs, each sorted by name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMapping {
    entries: Vec<MappedAsset>,
}

impl AssetMapping {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.original.as_str(), e.obfuscated.as_str()))
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.original == original)
            .map(|e| e.obfuscated.as_str())
    }

    /// Render the lookup table as a JavaScript snippet for the game script.
    pub fn render_js(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(format!(
            "/* ---------- Asset mapping (obfuscated filenames) ---------- */\n\
             const __assetMap = {json};\n\
             \n\
             function getAssetPath(originalPath) {{\n  \
             return __assetMap[originalPath] || originalPath;\n\
             }}\n"
        ))
    }

    pub fn write_js(&self, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, self.render_js()?)?;
        info!(path = %output.display(), entries = self.len(), "asset mapping written");
        Ok(())
    }

    /// Move every mapped file to its hashed name. Files that were already
    /// renamed by an earlier run are skipped. Returns how many were moved.
    pub fn apply_renames(&self) -> Result<usize> {
        let mut renamed = 0;
        for entry in &self.entries {
            if !entry.source.exists() {
                if entry.target.exists() {
                    debug!(file = %entry.target.display(), "already renamed");
                    continue;
                }
                return Err(ToolsError::Config(format!(
                    "asset vanished before rename: {}",
                    entry.source.display()
                )));
            }
            if entry.target.exists() {
                return Err(ToolsError::Config(format!(
                    "refusing to overwrite {} with {}",
                    entry.target.display(),
                    entry.source.display()
                )));
            }
            fs::rename(&entry.source, &entry.target)?;
            debug!(from = %entry.source.display(), to = %entry.target.display(), "renamed");
            renamed += 1;
        }
        Ok(renamed)
    }
}

impl Serialize for AssetMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.original, &entry.obfuscated)?;
        }
        map.end()
    }
}

/// Scan `assets_dir` (top level only) and map each image to its hashed name.
/// Files whose stem is in `keep` are left out.
pub fn build_mapping(assets_dir: &Path, keep: &[String]) -> Result<AssetMapping> {
    if !assets_dir.is_dir() {
        return Err(ToolsError::Config(format!(
            "assets directory not found: {}",
            assets_dir.display()
        )));
    }

    let prefix = assets_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("assets")
        .to_string();

    let mut files = Vec::new();
    for entry in WalkDir::new(assets_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    let mut entries = Vec::new();
    for ext in IMAGE_EXTENSIONS {
        for path in &files {
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            let (Some(stem), Some(name)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.file_name().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            if keep.iter().any(|k| k == stem) {
                debug!(file = name, "kept original name");
                continue;
            }

            let hashed = format!("{}.{ext}", hashed_stem(stem));
            entries.push(MappedAsset {
                original: format!("{prefix}/{name}"),
                obfuscated: format!("{prefix}/{hashed}"),
                source: path.clone(),
                target: path.with_file_name(&hashed),
            });
        }
    }

    Ok(AssetMapping { entries })
}
