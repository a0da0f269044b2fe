//! Screenshot comparison against stored baselines: byte-hash fast path,
//! pixel diff with a channel tolerance, and a red-painted diff artifact on
//! mismatch.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "snapshot '{name}' dimensions changed: baseline {baseline_width}x{baseline_height}, \
         actual {actual_width}x{actual_height}"
    )]
    DimensionMismatch {
        name: String,
        baseline_width: u32,
        baseline_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("snapshot '{name}' differs by {diff_percent:.3}% (diff written to {})", diff_path.display())]
    Mismatch {
        name: String,
        diff_percent: f64,
        diff_path: PathBuf,
    },
}

/// Where snapshots live and how strictly they are compared.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub baseline_dir: PathBuf,
    pub actual_dir: PathBuf,
    pub diff_dir: PathBuf,
    /// Share of differing pixels (in percent) a comparison may carry and
    /// still pass.
    pub failure_threshold_percent: f64,
    /// Per-channel difference a pixel may carry before it counts as
    /// changed. Absorbs antialiasing jitter.
    pub pixel_tolerance: u8,
    /// Rewrite the baseline on mismatch instead of failing.
    pub auto_update: bool,
}

impl SnapshotConfig {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            baseline_dir: root.join("baseline"),
            actual_dir: root.join("actual"),
            diff_dir: root.join("diff"),
            failure_threshold_percent: 0.0,
            pixel_tolerance: 0,
            auto_update: false,
        }
    }

    pub fn with_failure_threshold_percent(mut self, percent: f64) -> Self {
        self.failure_threshold_percent = percent;
        self
    }

    pub fn with_pixel_tolerance(mut self, tolerance: u8) -> Self {
        self.pixel_tolerance = tolerance;
        self
    }

    pub fn with_auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }
}

/// How one comparison ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// No baseline existed; the capture became one.
    NewBaseline,
    /// Identical bytes or within tolerance.
    Matched,
    /// Beyond tolerance; a diff artifact was written.
    Mismatched,
    /// Beyond tolerance, but the baseline was rewritten instead.
    Updated,
}

/// The result of comparing one capture against its baseline.
#[derive(Debug, Clone)]
pub struct SnapshotDiff {
    pub name: String,
    pub outcome: SnapshotOutcome,
    pub diff_percent: f64,
    pub differing_pixels: u64,
    pub total_pixels: u64,
    pub diff_path: Option<PathBuf>,
}

impl SnapshotDiff {
    pub fn passed(&self) -> bool {
        !matches!(self.outcome, SnapshotOutcome::Mismatched)
    }
}

pub struct SnapshotComparator {
    config: SnapshotConfig,
}

impl SnapshotComparator {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.config.baseline_dir.join(file_name(name))
    }

    pub fn actual_path(&self, name: &str) -> PathBuf {
        self.config.actual_dir.join(file_name(name))
    }

    pub fn diff_path(&self, name: &str) -> PathBuf {
        self.config.diff_dir.join(file_name(name))
    }

    /// Compare a PNG capture against the stored baseline and report the
    /// outcome. A missing baseline is seeded from the capture. Byte-identical
    /// captures short-circuit on their hash; otherwise pixels are compared
    /// with the configured tolerance and a red-painted diff artifact is
    /// written when the comparison fails.
    pub fn compare(&self, name: &str, actual_png: &[u8]) -> Result<SnapshotDiff, SnapshotError> {
        write_bytes(&self.actual_path(name), actual_png)?;

        let baseline_path = self.baseline_path(name);
        let baseline_bytes = match std::fs::read(&baseline_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                write_bytes(&baseline_path, actual_png)?;
                info!(name, path = %baseline_path.display(), "baseline written");
                return Ok(SnapshotDiff {
                    name: name.to_string(),
                    outcome: SnapshotOutcome::NewBaseline,
                    diff_percent: 0.0,
                    differing_pixels: 0,
                    total_pixels: 0,
                    diff_path: None,
                });
            }
            Err(e) => {
                return Err(SnapshotError::Io {
                    path: baseline_path,
                    source: e,
                });
            }
        };

        let actual_hash = Sha256::digest(actual_png);
        if actual_hash == Sha256::digest(&baseline_bytes) {
            debug!(name, hash = %hex::encode(&actual_hash[..8]), "snapshot identical");
            return Ok(SnapshotDiff {
                name: name.to_string(),
                outcome: SnapshotOutcome::Matched,
                diff_percent: 0.0,
                differing_pixels: 0,
                total_pixels: 0,
                diff_path: None,
            });
        }

        let baseline = decode(&baseline_bytes, &baseline_path)?;
        let actual = decode(actual_png, &self.actual_path(name))?;

        if baseline.dimensions() != actual.dimensions() {
            let (bw, bh) = baseline.dimensions();
            let (aw, ah) = actual.dimensions();
            return Err(SnapshotError::DimensionMismatch {
                name: name.to_string(),
                baseline_width: bw,
                baseline_height: bh,
                actual_width: aw,
                actual_height: ah,
            });
        }

        let (differing, diff_img) = diff_pixels(&baseline, &actual, self.config.pixel_tolerance);
        let total = u64::from(baseline.width()) * u64::from(baseline.height());
        let diff_percent = if total == 0 {
            0.0
        } else {
            differing as f64 * 100.0 / total as f64
        };

        if diff_percent <= self.config.failure_threshold_percent {
            debug!(name, diff_percent, differing, "snapshot within tolerance");
            return Ok(SnapshotDiff {
                name: name.to_string(),
                outcome: SnapshotOutcome::Matched,
                diff_percent,
                differing_pixels: differing,
                total_pixels: total,
                diff_path: None,
            });
        }

        if self.config.auto_update {
            write_bytes(&self.baseline_path(name), actual_png)?;
            info!(name, diff_percent, "baseline updated");
            return Ok(SnapshotDiff {
                name: name.to_string(),
                outcome: SnapshotOutcome::Updated,
                diff_percent,
                differing_pixels: differing,
                total_pixels: total,
                diff_path: None,
            });
        }

        let diff_path = self.diff_path(name);
        ensure_parent(&diff_path)?;
        save_image(&diff_img, &diff_path)?;
        warn!(name, diff_percent, differing, path = %diff_path.display(), "snapshot mismatch");

        Ok(SnapshotDiff {
            name: name.to_string(),
            outcome: SnapshotOutcome::Mismatched,
            diff_percent,
            differing_pixels: differing,
            total_pixels: total,
            diff_path: Some(diff_path),
        })
    }

    /// Like [`SnapshotComparator::compare`], but a failed comparison becomes
    /// an error.
    pub fn check(&self, name: &str, actual_png: &[u8]) -> Result<SnapshotDiff, SnapshotError> {
        let diff = self.compare(name, actual_png)?;
        match (&diff.outcome, &diff.diff_path) {
            (SnapshotOutcome::Mismatched, Some(diff_path)) => Err(SnapshotError::Mismatch {
                name: diff.name.clone(),
                diff_percent: diff.diff_percent,
                diff_path: diff_path.clone(),
            }),
            _ => Ok(diff),
        }
    }

    /// Promote the last written capture for `name` to the baseline.
    pub fn update_baseline(&self, name: &str) -> Result<(), SnapshotError> {
        let actual_path = self.actual_path(name);
        let bytes = std::fs::read(&actual_path).map_err(|e| SnapshotError::Io {
            path: actual_path,
            source: e,
        })?;
        write_bytes(&self.baseline_path(name), &bytes)?;
        info!(name, "baseline promoted from last capture");
        Ok(())
    }

    /// Names of every stored baseline, sorted.
    pub fn list_baselines(&self) -> Result<Vec<String>, SnapshotError> {
        let dir = &self.config.baseline_dir;
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SnapshotError::Io {
                    path: dir.clone(),
                    source: e,
                });
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SnapshotError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == ' ' { '-' } else { c })
        .collect();
    format!("{safe}.png")
}

fn ensure_parent(path: &Path) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SnapshotError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    ensure_parent(path)?;
    std::fs::write(path, bytes).map_err(|e| SnapshotError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn decode(bytes: &[u8], path: &Path) -> Result<RgbaImage, SnapshotError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| SnapshotError::Decode {
            path: path.to_path_buf(),
            source: e,
        })
}

fn save_image(img: &RgbaImage, path: &Path) -> Result<(), SnapshotError> {
    img.save(path).map_err(|e| SnapshotError::Decode {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Count pixels whose channel difference exceeds `tolerance` and paint them
/// red on a copy of the actual capture.
fn diff_pixels(baseline: &RgbaImage, actual: &RgbaImage, tolerance: u8) -> (u64, RgbaImage) {
    let mut diff_img = actual.clone();
    let mut differing: u64 = 0;
    for (x, y, baseline_px) in baseline.enumerate_pixels() {
        let actual_px = actual.get_pixel(x, y);
        let max_delta = baseline_px
            .0
            .iter()
            .zip(actual_px.0.iter())
            .map(|(a, b)| a.abs_diff(*b))
            .max()
            .unwrap_or(0);
        if max_delta > tolerance {
            differing += 1;
            diff_img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    (differing, diff_img)
}
