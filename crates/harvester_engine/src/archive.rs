use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub archive_path: PathBuf,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("source is not a readable directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot create archive {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Every regular file under `source_dir` with its `/`-separated relative
/// name, sorted by name (byte order, case-sensitive).
pub fn list_archive_entries(source_dir: &Path) -> Result<Vec<(String, PathBuf)>, ArchiveError> {
    if !fs::metadata(source_dir)?.is_dir() {
        return Err(ArchiveError::NotADirectory(source_dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(source_dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((name, entry.into_path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Zips every regular file under `source_dir` into `archive_path`.
///
/// Entries carry a fixed timestamp and mode so identical inputs produce
/// byte-identical archives. A failed run may leave a partial file behind.
pub fn create_archive(source_dir: &Path, archive_path: &Path) -> Result<ArchiveSummary, ArchiveError> {
    let mut entries = list_archive_entries(source_dir)?;
    if let Ok(target) = archive_path.canonicalize() {
        entries.retain(|(_, path)| path.canonicalize().map_or(true, |p| p != target));
    }

    let file = File::create(archive_path).map_err(|source| ArchiveError::Create {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut names = Vec::with_capacity(entries.len());
    for (name, path) in entries {
        writer.start_file(name.as_str(), options)?;
        let mut source = File::open(&path)?;
        io::copy(&mut source, &mut writer)?;
        names.push(name);
    }
    let mut inner = writer.finish()?;
    inner.flush()?;

    engine_info!(
        "archived {} files from {:?} into {:?}",
        names.len(),
        source_dir,
        archive_path
    );
    Ok(ArchiveSummary {
        archive_path: archive_path.to_path_buf(),
        entries: names,
    })
}
