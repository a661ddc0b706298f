use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::download_filename;
use crate::types::Download;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot use download directory {path}: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("saving {name} failed: {source}")]
    Save {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Creates `dir` (and parents) unless it already is a directory.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let fail = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(fail("not a directory".into())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))
        }
        Err(err) => Err(fail(err.to_string())),
    }
}

/// Saves retrieved documents into one job's download directory.
///
/// Each file is written to a temp file in the same directory and renamed
/// into place, so a reader never sees a half-written certificate. Two
/// identifiers mapping to the same name overwrite each other.
pub struct DownloadStore {
    dir: PathBuf,
}

impl DownloadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores `download` as `<slug>__<name>` and returns the final path.
    pub fn save(&self, identifier: &str, download: &Download) -> Result<PathBuf, PersistError> {
        let name = download_filename(identifier, download.suggested_name.as_deref());
        self.write_file(&name, &download.bytes)
    }

    /// Atomically replaces `{dir}/{name}` with `bytes`.
    pub fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;
        let save_err = |source: io::Error| PersistError::Save {
            name: name.to_string(),
            source,
        };

        let target = self.dir.join(name);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(save_err)?;
        tmp.write_all(bytes).map_err(save_err)?;
        tmp.as_file_mut().sync_all().map_err(save_err)?;
        tmp.persist(&target).map_err(|e| save_err(e.error))?;
        Ok(target)
    }
}
