use std::io;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::input::InputError;
use crate::registry::RegistryError;

/// Job-fatal and service-level failures. The display text ends up verbatim in
/// a failed job's error field.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("could not open retrieval session: {0}")]
    Session(String),
}
