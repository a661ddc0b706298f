use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use harvester_core::{parse_identifiers, Identifier};
use thiserror::Error;

use crate::decode::{decode_input, DecodeError};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Suppliers file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Reads and decodes an identifier list from disk.
///
/// An input that decodes but holds no identifiers yields an empty list.
pub fn read_identifiers(path: &Path) -> Result<Vec<Identifier>, InputError> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            InputError::NotFound(path.to_path_buf())
        } else {
            InputError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse_identifier_bytes(&bytes).map_err(InputError::from)
}

/// Decodes raw bytes and parses them into identifiers.
pub fn parse_identifier_bytes(bytes: &[u8]) -> Result<Vec<Identifier>, DecodeError> {
    let decoded = decode_input(bytes)?;
    let identifiers = parse_identifiers(&decoded.text);
    engine_debug!(
        "parsed {} identifiers from {} bytes ({})",
        identifiers.len(),
        bytes.len(),
        decoded.encoding_label
    );
    Ok(identifiers)
}
