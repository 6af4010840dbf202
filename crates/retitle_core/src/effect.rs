use crate::VideoId;

/// Side effects requested by the job store, executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the one lookup for a freshly created job.
    ResolveTitle { identifier: VideoId, watch_url: String },
}
