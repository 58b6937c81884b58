use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::{WebPEncoder, WebPQuality};
use image::{ColorType, GenericImageView, ImageEncoder};
use std::fmt;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{parse_quality_range, ToolsConfig};
use crate::{Result, ToolsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// pngquant when it is installed, builtin otherwise.
    Auto,
    Pngquant,
    Builtin,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Auto => "auto",
            Backend::Pngquant => "pngquant",
            Backend::Builtin => "builtin",
        })
    }
}

#[derive(Debug, Clone)]
pub struct OptimizeSettings {
    pub backend: Backend,
    pub pngquant_program: String,
    pub png_quality: String,
    pub pngquant_speed: u8,
    pub webp: bool,
    pub webp_quality: u8,
}

impl OptimizeSettings {
    pub fn from_config(cfg: &ToolsConfig) -> Self {
        Self {
            backend: Backend::Auto,
            pngquant_program: "pngquant".to_string(),
            png_quality: cfg.png_quality.clone(),
            pngquant_speed: cfg.pngquant_speed,
            webp: true,
            webp_quality: cfg.webp_quality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeSummary {
    /// The backend that actually ran (never `Auto`).
    pub backend: Backend,
    pub found: usize,
    pub optimized: usize,
    pub webp_written: usize,
    pub failures: Vec<FileFailure>,
}

/// Top-level `*.png` files of `dir`, sorted by name.
pub fn list_pngs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ToolsError::Config(format!(
            "assets directory not found: {}",
            dir.display()
        )));
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().and_then(|e| e.to_str()) == Some("png") {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// Whether `program --version` runs successfully.
pub fn pngquant_available(program: &str) -> bool {
    match Command::new(program).arg("--version").output() {
        Ok(output) => output.status.success(),
        Err(e) => {
            debug!(program, error = %e, "pngquant probe failed");
            false
        }
    }
}

fn pngquant_file(path: &Path, settings: &OptimizeSettings) -> Result<()> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let optimized = path.with_file_name(format!("{stem}-optimized.png"));

    let output = Command::new(&settings.pngquant_program)
        .arg(format!("--quality={}", settings.png_quality))
        .arg(format!("--speed={}", settings.pngquant_speed))
        .arg("--force")
        .arg("--output")
        .arg(&optimized)
        .arg(path)
        .output()?;

    if !output.status.success() {
        let _ = fs::remove_file(&optimized);
        return Err(ToolsError::Tool {
            tool: "pngquant",
            path: path.to_path_buf(),
            message: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    fs::rename(&optimized, path)?;
    Ok(())
}

/// Re-encode a PNG with maximum compression, overwriting it.
pub fn recompress_png(path: &Path) -> Result<()> {
    let img = image::open(path)?;
    let (width, height) = img.dimensions();

    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), width, height, img.color())?;

    let before = fs::metadata(path)?.len();
    if (buf.len() as u64) < before {
        fs::write(path, &buf)?;
    } else {
        debug!(file = %path.display(), "re-encoded PNG not smaller, kept original");
    }
    Ok(())
}

/// Write a lossy `.webp` next to `path`. Returns the new file's path.
pub fn write_webp(path: &Path, quality: u8) -> Result<PathBuf> {
    let img = image::open(path)?;
    let rgba = img.to_rgba8();
    let target = path.with_extension("webp");

    let file = fs::File::create(&target)?;
    WebPEncoder::new_with_quality(BufWriter::new(file), WebPQuality::lossy(quality)).encode(
        rgba.as_raw(),
        rgba.width(),
        rgba.height(),
        ColorType::Rgba8,
    )?;
    Ok(target)
}

fn resolve_backend(settings: &OptimizeSettings) -> Result<Backend> {
    match settings.backend {
        Backend::Builtin => Ok(Backend::Builtin),
        Backend::Pngquant => {
            if pngquant_available(&settings.pngquant_program) {
                Ok(Backend::Pngquant)
            } else {
                Err(ToolsError::Config(format!(
                    "{} is not installed (try `brew install pngquant`)",
                    settings.pngquant_program
                )))
            }
        }
        Backend::Auto => {
            if pngquant_available(&settings.pngquant_program) {
                Ok(Backend::Pngquant)
            } else {
                warn!("pngquant not found, falling back to builtin PNG encoder");
                Ok(Backend::Builtin)
            }
        }
    }
}

/// Optimise every PNG in `dir`, then optionally emit WebP versions.
///
/// Per-file problems land in [`OptimizeSummary::failures`]; only a missing
/// directory, bad settings or an unavailable explicit backend abort the run.
pub fn optimize_assets(dir: &Path, settings: &OptimizeSettings) -> Result<OptimizeSummary> {
    parse_quality_range(&settings.png_quality)?;
    if settings.webp_quality > 100 {
        return Err(ToolsError::Config(format!(
            "webp_quality must be 0-100, got {}",
            settings.webp_quality
        )));
    }

    let pngs = list_pngs(dir)?;
    let backend = resolve_backend(settings)?;
    info!(count = pngs.len(), %backend, "optimising PNG files");

    let mut summary = OptimizeSummary {
        backend,
        found: pngs.len(),
        optimized: 0,
        webp_written: 0,
        failures: Vec::new(),
    };

    for png in &pngs {
        let res = match backend {
            Backend::Pngquant => pngquant_file(png, settings),
            _ => recompress_png(png),
        };
        match res {
            Ok(()) => {
                debug!(file = %png.display(), "optimised");
                summary.optimized += 1;
            }
            Err(e) => {
                warn!(file = %png.display(), error = %e, "optimisation failed");
                summary.failures.push(FileFailure {
                    path: png.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    if settings.webp {
        for png in &pngs {
            match write_webp(png, settings.webp_quality) {
                Ok(target) => {
                    debug!(file = %target.display(), "webp written");
                    summary.webp_written += 1;
                }
                Err(e) => {
                    warn!(file = %png.display(), error = %e, "webp conversion failed");
                    summary.failures.push(FileFailure {
                        path: png.with_extension("webp"),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    info!(
        optimized = summary.optimized,
        webp = summary.webp_written,
        failed = summary.failures.len(),
        "optimisation finished"
    );
    Ok(summary)
}
