//! Harvester engine: job registry, worker loop, page retrieval and archiving.
mod archive;
mod config;
mod decode;
mod driver;
mod engine;
mod error;
mod filename;
mod http_page;
mod input;
mod matcher;
mod observer;
mod page;
mod persist;
mod reaper;
mod registry;
mod retriever;
mod types;
mod worker;

pub use archive::{create_archive, list_archive_entries, ArchiveError, ArchiveSummary};
pub use config::{
    EngineConfig, DEFAULT_REAP_INTERVAL_SECS, DEFAULT_RETENTION_SECS, DEFAULT_RUNS_DIR,
};
pub use decode::{decode_input, DecodeError, DecodedText, INPUT_ENCODINGS};
pub use driver::{HttpDriver, RetrievalDriver, RetrievalSession};
pub use engine::{HarvestService, ResultReply};
pub use error::EngineError;
pub use filename::{download_filename, DEFAULT_DOCUMENT_NAME};
pub use http_page::{HttpElement, HttpPage, HttpSettings};
pub use input::{parse_identifier_bytes, read_identifiers, InputError};
pub use matcher::{Matcher, TargetProfile, DEFAULT_SEARCH_URL};
pub use observer::{JobObserver, RegistryObserver};
pub use page::{Page, PageElement};
pub use persist::{ensure_output_dir, DownloadStore, PersistError};
pub use reaper::{reap_once, ReapReport, Reaper, ReaperHandle, ReaperSettings, RUN_DIR_PREFIX};
pub use registry::{CancelReply, EvictedJob, JobRegistry, RegistryError};
pub use retriever::CertificateRetriever;
pub use types::{Download, PageError, RetrievalOutcome};
pub use worker::{
    run_harvest, run_job, HarvestSummary, JobPaths, ARCHIVE_FILE_NAME, CANCELLED_LINE,
    DOWNLOADS_DIR_NAME, INPUT_FILE_NAME, NO_DOWNLOADS_MESSAGE, NO_IDENTIFIERS_MESSAGE,
};
