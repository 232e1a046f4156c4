//! Snapshot store round-trips and housekeeping.

use std::fs;

use spread_analysis::SnapshotStore;
use spread_core::errors::SnapshotError;
use spread_core::types::{GridField, Variable};
use tempfile::TempDir;

fn grid(ny: usize, nx: usize) -> GridField {
    let latitude: Vec<f64> = (0..ny).map(|i| 20.0 + i as f64 * 0.25).collect();
    let longitude: Vec<f64> = (0..nx).map(|j| -120.0 + j as f64 * 0.25).collect();
    let mut values: Vec<f64> = (0..ny * nx).map(|k| k as f64 * 0.5).collect();
    values[1] = f64::NAN;
    GridField::new("precip_divergence", latitude, longitude, values).unwrap()
}

fn same_values(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

#[test]
fn round_trip_preserves_values_and_axes() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    // Spans two chunk rows.
    let field = grid(300, 7);

    let path = store.save(&field, "2025011512", Variable::Precip, 6).unwrap();
    assert!(path.ends_with("divergence/2025011512/precip/fhr006"));

    let loaded = store.load(&path).unwrap();
    assert_eq!(loaded.name, field.name);
    assert_eq!(loaded.latitude, field.latitude);
    assert_eq!(loaded.longitude, field.longitude);
    assert!(same_values(&loaded.values, &field.values));
}

#[test]
fn save_replaces_existing_artifact() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let first = grid(4, 4);
    let mut second = grid(3, 5);
    second.name = "replacement".to_string();

    let p1 = store.save(&first, "2025011500", Variable::Mslp, 0).unwrap();
    let p2 = store.save(&second, "2025011500", Variable::Mslp, 0).unwrap();
    assert_eq!(p1, p2);

    let loaded = store.load(&p2).unwrap();
    assert_eq!(loaded.name, "replacement");
    assert_eq!(loaded.shape(), (3, 5));
    assert_eq!(store.count_artifacts().unwrap(), 1);
}

#[test]
fn count_remove_and_clear() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    assert_eq!(store.count_artifacts().unwrap(), 0);

    let a = store.save(&grid(2, 2), "2025011500", Variable::Precip, 0).unwrap();
    store.save(&grid(2, 2), "2025011500", Variable::Precip, 6).unwrap();
    store.save(&grid(2, 2), "2025011506", Variable::WindSpeed, 0).unwrap();
    assert_eq!(store.count_artifacts().unwrap(), 3);

    assert!(store.remove(&a).unwrap());
    assert!(!store.remove(&a).unwrap());
    assert_eq!(store.count_artifacts().unwrap(), 2);

    assert_eq!(store.clear().unwrap(), 2);
    assert_eq!(store.count_artifacts().unwrap(), 0);
}

#[test]
fn load_missing_artifact_is_io_error() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let err = store.load(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, SnapshotError::Io { .. }));
}

#[test]
fn corrupt_chunk_is_detected() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let path = store.save(&grid(2, 2), "2025011500", Variable::Hgt500, 12).unwrap();
    fs::write(path.join("c").join("0.0"), b"not zstd").unwrap();
    let err = store.load(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::CorruptChunk { .. }));
}
