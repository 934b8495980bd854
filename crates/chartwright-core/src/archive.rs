//! Chart archive creation and reading
//!
//! Charts are laid out on disk the way Helm expects (`<name>/Chart.yaml`,
//! `<name>/values.yaml`, `<name>/templates/*`, `<name>/charts/<sub>/...`) and
//! streamed into a `.tgz`. Headers are normalized so identical input always
//! produces identical bytes.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::package::{ChartArchive, ChartBase, ParentPackage, ServicePackage};

/// Archive contents keyed by path
pub type ArchiveEntries = BTreeMap<String, Vec<u8>>;

/// Archive a synced parent chart
///
/// `resolved` holds the archives of the external dependencies; they are
/// unpacked into `charts/` next to the embedded services.
pub fn archive(parent: &ParentPackage, resolved: &[ChartArchive]) -> Result<ChartArchive> {
    let scratch = tempfile::tempdir().map_err(|e| CoreError::archive_io(std::env::temp_dir(), e))?;

    let chart_dir = save_dir(parent.base(), parent.services(), scratch.path())?;

    let charts_dir = chart_dir.join("charts");
    if charts_dir.is_dir() {
        unpack_packed_charts(&charts_dir)?;
    }

    for dep in resolved {
        tracing::debug!(dependency = %dep.name, "unpacking external dependency");
        unpack(&dep.data, &charts_dir)?;
    }

    let data = pack_dir(scratch.path(), &chart_dir)?;
    let name = parent.base().archive_name();

    tracing::debug!(archive = %name, bytes = data.len(), "archived chart");

    Ok(ChartArchive { name, data })
}

/// Write a chart and its services below `dir`, returning the chart directory
pub fn save_dir(base: &ChartBase, services: &[ServicePackage], dir: &Path) -> Result<PathBuf> {
    let chart_dir = dir.join(base.name());

    write_file(
        &chart_dir.join("Chart.yaml"),
        serde_yaml::to_string(base.metadata())?.as_bytes(),
    )?;
    write_file(&chart_dir.join("values.yaml"), base.values().to_yaml()?.as_bytes())?;

    for file in base.files() {
        write_file(&chart_dir.join(&file.path), &file.data)?;
    }

    if !services.is_empty() {
        let charts_dir = chart_dir.join("charts");
        for service in services {
            save_dir(service.base(), &[], &charts_dir)?;
        }
    }

    Ok(chart_dir)
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::archive_io(parent, e))?;
    }
    fs::write(path, data).map_err(|e| CoreError::archive_io(path, e))
}

/// Replace every `charts/*.tgz` with its unpacked directory
fn unpack_packed_charts(charts_dir: &Path) -> Result<()> {
    let entries = fs::read_dir(charts_dir).map_err(|e| CoreError::archive_io(charts_dir, e))?;

    let mut packed = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CoreError::archive_io(charts_dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "tgz") {
            packed.push(path);
        }
    }
    packed.sort();

    for path in packed {
        let data = fs::read(&path).map_err(|e| CoreError::archive_io(&path, e))?;
        unpack(&data, charts_dir)?;
        fs::remove_file(&path).map_err(|e| CoreError::archive_io(&path, e))?;
    }

    Ok(())
}

/// Extract `.tgz` bytes into `dest`
pub fn unpack(data: &[u8], dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| CoreError::archive_io(dest, e))?;

    let mut archive = Archive::new(GzDecoder::new(data));
    archive
        .unpack(dest)
        .map_err(|e| CoreError::archive_io(dest, e))
}

/// Stream every file below `chart_dir` into a `.tgz`, paths relative to `root`
fn pack_dir(root: &Path, chart_dir: &Path) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in WalkDir::new(chart_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::archive_io(chart_dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| CoreError::InvalidArchive {
                message: format!("{} escapes {}: {}", entry.path().display(), root.display(), e),
            })?;
        let archive_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let content = fs::read(entry.path()).map_err(|e| CoreError::archive_io(entry.path(), e))?;
        add_bytes_to_archive(&mut builder, &archive_path, &content)?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| CoreError::archive_io(chart_dir, e))?;
    encoder.finish().map_err(|e| CoreError::archive_io(chart_dir, e))
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    builder
        .append_data(&mut header, archive_path, content)
        .map_err(|e| CoreError::archive_io(archive_path, e))
}

/// Read every file of a `.tgz` in a single pass
pub fn read_entries(data: &[u8]) -> Result<ArchiveEntries> {
    let mut archive = Archive::new(GzDecoder::new(data));
    let mut contents = BTreeMap::new();

    let entries = archive.entries().map_err(invalid_archive)?;
    for entry in entries {
        let mut entry = entry.map_err(invalid_archive)?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let path = entry.path().map_err(invalid_archive)?.to_string_lossy().to_string();
        let path = path.trim_start_matches("./").to_string();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(invalid_archive)?;
        contents.insert(path, content);
    }

    Ok(contents)
}

/// Read a specific file from a `.tgz`
pub fn read_file(data: &[u8], file_path: &str) -> Result<Vec<u8>> {
    read_entries(data)?
        .remove(file_path)
        .ok_or_else(|| CoreError::InvalidArchive {
            message: format!("File not found in archive: {}", file_path),
        })
}

fn invalid_archive(e: std::io::Error) -> CoreError {
    CoreError::InvalidArchive {
        message: e.to_string(),
    }
}
