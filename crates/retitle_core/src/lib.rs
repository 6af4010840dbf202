//! Retitle core: identifiers, the job store, and display policy. No IO.
mod effect;
mod identifier;
mod job;
mod store;

pub use effect::Effect;
pub use identifier::{derive_identifier, derive_identifier_from, watch_url, VideoId};
pub use job::{Job, JobStatus, Role, RoleSlots, FAILED_TITLE, PLACEHOLDER};
pub use store::{Completion, JobStore, Resolution};
