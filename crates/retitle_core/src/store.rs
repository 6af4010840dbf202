use std::collections::HashMap;

use crate::{watch_url, Effect, Job, JobStatus, Role, VideoId};

/// Outcome of the single lookup performed for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Failed,
}

/// Result of a terminal transition: the text to show and where to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<H> {
    pub identifier: VideoId,
    pub status: JobStatus,
    pub text: String,
    pub targets: Vec<(Role, H)>,
}

/// All jobs of one page session, keyed by video id.
///
/// Jobs are never removed; dropping the store is the session teardown.
#[derive(Debug, Clone)]
pub struct JobStore<H> {
    jobs: HashMap<VideoId, Job<H>>,
}

impl<H: Copy + Eq> JobStore<H> {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    pub fn get(&self, identifier: &VideoId) -> Option<&Job<H>> {
        self.jobs.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|job| job.status() == JobStatus::Pending)
            .count()
    }

    /// Returns the job for `identifier`, creating it in `Pending` when unseen.
    ///
    /// `observed_text` is only recorded on creation. The resolve effect is
    /// returned once per identifier, on the call that created the job.
    pub fn get_or_create(
        &mut self,
        identifier: &VideoId,
        observed_text: &str,
    ) -> (&mut Job<H>, Option<Effect>) {
        let mut effect = None;
        let job = self.jobs.entry(identifier.clone()).or_insert_with(|| {
            effect = Some(Effect::ResolveTitle {
                identifier: identifier.clone(),
                watch_url: watch_url(identifier),
            });
            Job::new(identifier.clone(), observed_text)
        });
        (job, effect)
    }

    /// Applies the lookup outcome. Unknown or already finished jobs are left alone.
    pub fn complete(
        &mut self,
        identifier: &VideoId,
        resolution: Resolution,
    ) -> Option<Completion<H>> {
        let job = self.jobs.get_mut(identifier)?;
        if job.status().is_terminal() {
            return None;
        }
        job.finish(match resolution {
            Resolution::Resolved(title) => Some(title),
            Resolution::Failed => None,
        });
        Some(Completion {
            identifier: identifier.clone(),
            status: job.status(),
            text: job.display_text().to_string(),
            targets: job.slots().bound().collect(),
        })
    }
}

impl<H: Copy + Eq> Default for JobStore<H> {
    fn default() -> Self {
        Self::new()
    }
}
