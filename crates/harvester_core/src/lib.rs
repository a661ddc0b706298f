//! Harvester core: pure job state machine, input parsing and naming helpers.
mod identifier;
mod msg;
mod normalize;
mod run_config;
mod state;
mod update;
mod view_model;

pub use identifier::{parse_identifiers, Identifier, HEADER_TOKENS};
pub use msg::JobMsg;
pub use normalize::{normalize_for_match, slugify, text_matches, EMPTY_SLUG};
pub use run_config::{RunConfiguration, DEFAULT_DELAY_SECS, DEFAULT_TIMEOUT_MS};
pub use state::{Job, JobId, JobStatus};
pub use update::{update, TransitionError};
pub use view_model::JobSnapshot;
