//! Chunked array store for divergence grids.
//!
//! Each artifact is a directory:
//!
//! ```text
//! {root}/divergence/{YYYYMMDDHH}/{variable}/fhr{NNN}/
//!     meta.json      name, shape, chunk shape, dtype, codec, lat/lon axes
//!     c/{r}.{c}      zstd-compressed little-endian f64, row-major
//! ```
//!
//! Edge chunks hold only the cells inside the array; they are not padded.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spread_core::constants::{SNAPSHOT_CHUNK_SIZE, SNAPSHOT_META_FILE};
use spread_core::errors::SnapshotError;
use spread_core::types::{GridField, Variable};

const FORMAT_VERSION: u32 = 1;
const DTYPE: &str = "<f8";
const CODEC: &str = "zstd";
const ZSTD_LEVEL: i32 = 3;
const DIVERGENCE_DIR: &str = "divergence";
const CHUNK_DIR: &str = "c";

/// `YYYYMMDDHH` key used in artifact paths.
pub fn init_time_key(init_time: DateTime<Utc>) -> String {
    init_time.format("%Y%m%d%H").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ArtifactMeta {
    format_version: u32,
    name: String,
    shape: [usize; 2],
    chunks: [usize; 2],
    dtype: String,
    codec: String,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic artifact location for one cycle, variable and lead hour.
    pub fn artifact_path(&self, init_time_key: &str, variable: Variable, lead_hour: u32) -> PathBuf {
        self.root
            .join(DIVERGENCE_DIR)
            .join(init_time_key)
            .join(variable.as_str())
            .join(format!("fhr{lead_hour:03}"))
    }

    /// Write `field`, replacing any artifact already at the same location.
    pub fn save(
        &self,
        field: &GridField,
        init_time_key: &str,
        variable: Variable,
        lead_hour: u32,
    ) -> Result<PathBuf, SnapshotError> {
        let target = self.artifact_path(init_time_key, variable, lead_hour);
        let parent = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;

        let staging = parent.join(format!(".fhr{lead_hour:03}.tmp"));
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;
        }
        write_artifact(&staging, field)?;

        if target.exists() {
            fs::remove_dir_all(&target).map_err(|e| io_err(&target, e))?;
        }
        fs::rename(&staging, &target).map_err(|e| io_err(&target, e))?;

        tracing::debug!(
            path = %target.display(),
            name = %field.name,
            cells = field.values.len(),
            "snapshot saved"
        );
        Ok(target)
    }

    /// Read an artifact back into a `GridField`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<GridField, SnapshotError> {
        let path = path.as_ref();
        let meta_path = path.join(SNAPSHOT_META_FILE);
        let raw = fs::read(&meta_path).map_err(|e| io_err(&meta_path, e))?;
        let meta: ArtifactMeta = serde_json::from_slice(&raw).map_err(|e| {
            SnapshotError::InvalidMetadata {
                path: meta_path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        validate_meta(&meta, &meta_path)?;

        let [ny, nx] = meta.shape;
        let [cy, cx] = meta.chunks;
        let mut values = vec![f64::NAN; ny * nx];
        for (ci, row0) in (0..ny).step_by(cy).enumerate() {
            for (cj, col0) in (0..nx).step_by(cx).enumerate() {
                let rows = cy.min(ny - row0);
                let cols = cx.min(nx - col0);
                let chunk_path = path.join(CHUNK_DIR).join(format!("{ci}.{cj}"));
                let chunk = read_chunk(&chunk_path, rows * cols)?;
                for r in 0..rows {
                    let dst = (row0 + r) * nx + col0;
                    values[dst..dst + cols].copy_from_slice(&chunk[r * cols..(r + 1) * cols]);
                }
            }
        }

        Ok(GridField {
            name: meta.name,
            latitude: meta.latitude,
            longitude: meta.longitude,
            values,
        })
    }

    /// Delete an artifact. Returns `false` if nothing was there.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<bool, SnapshotError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(path).map_err(|e| io_err(path, e))?;
        Ok(true)
    }

    /// Number of complete artifacts under the store root.
    pub fn count_artifacts(&self) -> Result<usize, SnapshotError> {
        let base = self.root.join(DIVERGENCE_DIR);
        if !base.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for cycle in subdirs(&base)? {
            for variable in subdirs(&cycle)? {
                count += subdirs(&variable)?
                    .iter()
                    .filter(|dir| dir.join(SNAPSHOT_META_FILE).is_file())
                    .count();
            }
        }
        Ok(count)
    }

    /// Remove every artifact. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, SnapshotError> {
        let removed = self.count_artifacts()?;
        let base = self.root.join(DIVERGENCE_DIR);
        if base.exists() {
            fs::remove_dir_all(&base).map_err(|e| io_err(&base, e))?;
        }
        Ok(removed)
    }
}

fn write_artifact(dir: &Path, field: &GridField) -> Result<(), SnapshotError> {
    let (ny, nx) = field.shape();
    if field.values.len() != ny * nx {
        return Err(SnapshotError::InvalidMetadata {
            path: dir.display().to_string(),
            message: format!("{} values for shape {ny}x{nx}", field.values.len()),
        });
    }
    let chunk_dir = dir.join(CHUNK_DIR);
    fs::create_dir_all(&chunk_dir).map_err(|e| io_err(&chunk_dir, e))?;

    let chunk = SNAPSHOT_CHUNK_SIZE;
    for (ci, row0) in (0..ny).step_by(chunk).enumerate() {
        for (cj, col0) in (0..nx).step_by(chunk).enumerate() {
            let rows = chunk.min(ny - row0);
            let cols = chunk.min(nx - col0);
            let mut bytes = Vec::with_capacity(rows * cols * 8);
            for r in 0..rows {
                let start = (row0 + r) * nx + col0;
                for v in &field.values[start..start + cols] {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
            }
            let path = chunk_dir.join(format!("{ci}.{cj}"));
            let compressed =
                zstd::encode_all(bytes.as_slice(), ZSTD_LEVEL).map_err(|e| io_err(&path, e))?;
            fs::write(&path, compressed).map_err(|e| io_err(&path, e))?;
        }
    }

    let meta = ArtifactMeta {
        format_version: FORMAT_VERSION,
        name: field.name.clone(),
        shape: [ny, nx],
        chunks: [chunk, chunk],
        dtype: DTYPE.to_string(),
        codec: CODEC.to_string(),
        latitude: field.latitude.clone(),
        longitude: field.longitude.clone(),
    };
    let meta_path = dir.join(SNAPSHOT_META_FILE);
    let json = serde_json::to_vec_pretty(&meta).map_err(|e| SnapshotError::InvalidMetadata {
        path: meta_path.display().to_string(),
        message: e.to_string(),
    })?;
    fs::write(&meta_path, json).map_err(|e| io_err(&meta_path, e))
}

fn validate_meta(meta: &ArtifactMeta, path: &Path) -> Result<(), SnapshotError> {
    let invalid = |message: String| SnapshotError::InvalidMetadata {
        path: path.display().to_string(),
        message,
    };
    if meta.format_version != FORMAT_VERSION {
        return Err(invalid(format!("unsupported format version {}", meta.format_version)));
    }
    if meta.dtype != DTYPE || meta.codec != CODEC {
        return Err(invalid(format!("unsupported encoding {}/{}", meta.dtype, meta.codec)));
    }
    if meta.shape != [meta.latitude.len(), meta.longitude.len()] {
        return Err(invalid(format!(
            "shape {:?} does not match axes {}x{}",
            meta.shape,
            meta.latitude.len(),
            meta.longitude.len()
        )));
    }
    if meta.chunks.contains(&0) {
        return Err(invalid("zero chunk dimension".to_string()));
    }
    Ok(())
}

fn read_chunk(path: &Path, expected: usize) -> Result<Vec<f64>, SnapshotError> {
    let compressed = fs::read(path).map_err(|e| io_err(path, e))?;
    let bytes = zstd::decode_all(compressed.as_slice()).map_err(|e| SnapshotError::CorruptChunk {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    if bytes.len() != expected * 8 {
        return Err(SnapshotError::CorruptChunk {
            path: path.display().to_string(),
            message: format!("expected {} bytes, got {}", expected * 8, bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|b| {
            let mut le = [0u8; 8];
            le.copy_from_slice(b);
            f64::from_le_bytes(le)
        })
        .collect())
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
    let entries = fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if path.is_dir() && !hidden {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

fn io_err(path: &Path, e: std::io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
