use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod config;
mod escape;
pub mod obfuscate;
pub mod optimize;
pub mod stats;

pub use config::{load_config, ToolsConfig, DEFAULT_LOOKBACK};
pub use escape::decode_literal;
pub use obfuscate::{build_mapping, AssetMapping};
pub use optimize::{optimize_assets, Backend, OptimizeSettings, OptimizeSummary};
pub use stats::{Category, Extractor, NarrativeUnit, Report};

#[derive(Debug, Error)]
pub enum ToolsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{tool} failed on {}: {message}", .path.display())]
    Tool {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ToolsError>;

/// Resolve a configured path against the project root. Separators may be
/// either `/` or `\`; absolute paths are returned unchanged.
pub fn join_candidate(base: &Path, candidate: &str) -> PathBuf {
    if Path::new(candidate).is_absolute() {
        return PathBuf::from(candidate);
    }
    let mut path = base.to_path_buf();
    for part in candidate.split(['/', '\\']) {
        if !part.is_empty() {
            path.push(part);
        }
    }
    path
}

/// First candidate that resolves to a regular file.
pub fn find_first_file(base: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|candidate| join_candidate(base, candidate))
        .find(|path| path.is_file())
}

/// Find the game script: the configured location first, then `game.js` in
/// the root or one level up (the layout when run from `tools/`).
pub fn locate_script(root: &Path, configured: &str) -> Result<PathBuf> {
    find_first_file(root, &[configured, "game.js", "../game.js"]).ok_or_else(|| {
        ToolsError::Config(format!(
            "script not found: {}",
            join_candidate(root, configured).display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn join_candidate_accepts_both_separators() {
        let base = Path::new("project");
        assert_eq!(
            join_candidate(base, "tools\\asset_mapping.js"),
            Path::new("project").join("tools").join("asset_mapping.js")
        );
        assert_eq!(
            join_candidate(base, "public//img/"),
            Path::new("project").join("public").join("img")
        );
    }

    #[test]
    fn join_candidate_keeps_absolute_paths() {
        let abs = std::env::temp_dir().join("game.js");
        let s = abs.to_str().unwrap();
        assert_eq!(join_candidate(Path::new("project"), s), abs);
    }

    #[test]
    fn locate_script_prefers_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("main.js"), "").unwrap();
        fs::write(dir.path().join("game.js"), "").unwrap();

        assert_eq!(
            locate_script(dir.path(), "src/main.js").unwrap(),
            dir.path().join("src").join("main.js")
        );
        assert_eq!(
            locate_script(dir.path(), "missing.js").unwrap(),
            dir.path().join("game.js")
        );
    }

    #[test]
    fn locate_script_checks_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tools = dir.path().join("tools");
        fs::create_dir(&tools).unwrap();
        fs::write(dir.path().join("game.js"), "").unwrap();

        let found = locate_script(&tools, "missing.js").unwrap();
        assert_eq!(
            fs::canonicalize(found).unwrap(),
            fs::canonicalize(dir.path().join("game.js")).unwrap()
        );
    }

    #[test]
    fn locate_script_skips_directory_named_like_script() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("game.js"), "").unwrap();

        assert_eq!(
            locate_script(dir.path(), "scripts").unwrap(),
            dir.path().join("game.js")
        );
    }

    #[test]
    fn locate_script_reports_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir(&root).unwrap();
        let err = locate_script(&root, "game.js").unwrap_err();
        assert!(err.to_string().contains("script not found"));
        assert!(err.to_string().contains("game.js"));
    }
}
