//! JSON array exports of the checkpoint database
//!
//! Files are written to a temporary sibling first and renamed into place, so
//! a reader never sees a half-written array.

use crate::config::OutputConfig;
use crate::storage::CheckpointStore;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Number of records written by [`export_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportCounts {
    pub dataset: usize,
    pub failures: usize,
}

/// Writes `items` as a pretty-printed JSON array, replacing `path` atomically
pub fn write_json_array<T: Serialize>(path: &Path, items: &[T]) -> crate::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, items)?;
        writer.write_all(b"\n")?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    tracing::debug!("Wrote {} records to {}", items.len(), path.display());
    Ok(())
}

/// Exports the dataset and the failure ledger to their configured paths
pub fn export_all(
    store: &dyn CheckpointStore,
    output: &OutputConfig,
) -> crate::Result<ExportCounts> {
    let dataset = store.dataset()?;
    write_json_array(Path::new(&output.dataset_json), &dataset)?;

    let failures = store.failures()?;
    write_json_array(Path::new(&output.failures_json), &failures)?;

    tracing::info!(
        "Exported {} results to {} and {} failures to {}",
        dataset.len(),
        output.dataset_json,
        failures.len(),
        output.failures_json
    );

    Ok(ExportCounts {
        dataset: dataset.len(),
        failures: failures.len(),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
