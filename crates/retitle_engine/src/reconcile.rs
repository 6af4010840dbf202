use ego_tree::NodeId;
use retitle_core::{derive_identifier_from, Completion, Effect, JobStore, Role, VideoId};
use retitle_logging::{retitle_debug, retitle_trace, retitle_warn};

use crate::{Document, RoleClassifier};

/// Matches title elements to their jobs and writes the job's text into them.
#[derive(Debug, Clone, Default)]
pub struct Reconciler<C> {
    classifier: C,
}

impl<C: RoleClassifier> Reconciler<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Video shown by `node` in `role`: the nearest link's target for list
    /// titles, the page address otherwise.
    pub fn governing_identifier(
        &self,
        document: &Document,
        node: NodeId,
        role: Role,
    ) -> Option<VideoId> {
        match role {
            Role::ListTitle => {
                let anchor =
                    document.closest(node, |el| el.tag() == "a" && el.attr("href").is_some())?;
                derive_identifier_from(&document.link_url(anchor)?)
            }
            Role::WatchHeading | Role::PageTitle => derive_identifier_from(document.location()),
        }
    }

    /// Classifies `node`, binds it to its job, and brings its text in line.
    ///
    /// Returns the resolve effect when this call created the job. Calling it
    /// again on an element that already shows the job's text writes nothing.
    pub fn reconcile(
        &self,
        document: &mut Document,
        store: &mut JobStore<NodeId>,
        node: NodeId,
    ) -> Option<Effect> {
        let role = self.classifier.classify(document, node)?;
        let identifier = self.governing_identifier(document, node, role)?;
        let current = document.text_content(node);

        let (job, effect) = store.get_or_create(&identifier, &current);
        if effect.is_some() {
            retitle_debug!(
                "New job id={} role={:?} fallback={:?}",
                identifier,
                role,
                job.fallback_text()
            );
        }
        if job.bind(role, node) != Some(node) {
            retitle_trace!("Bound {:?} of id={} to {:?}", role, identifier, node);
        }

        let target = job.display_text();
        if current != target {
            write_text(document, node, target);
        }
        effect
    }

    /// Writes a finished job's text into its bound elements.
    ///
    /// Elements that were removed from the page, or that now display a
    /// different video, are skipped. Returns the number of writes.
    pub fn push(&self, document: &mut Document, completion: &Completion<NodeId>) -> usize {
        let mut written = 0;
        for &(role, node) in &completion.targets {
            if !document.is_attached(node) {
                retitle_trace!("Skip detached {:?} of id={}", role, completion.identifier);
                continue;
            }
            let still_governed = self.classifier.classify(document, node) == Some(role)
                && self.governing_identifier(document, node, role).as_ref()
                    == Some(&completion.identifier);
            if !still_governed {
                retitle_trace!("Skip rebound {:?} of id={}", role, completion.identifier);
                continue;
            }
            if document.text_content(node) != completion.text
                && write_text(document, node, &completion.text)
            {
                written += 1;
            }
        }
        written
    }
}

fn write_text(document: &mut Document, node: NodeId, text: &str) -> bool {
    match document.set_text(node, text) {
        Ok(()) => true,
        Err(err) => {
            retitle_warn!("Could not write title into {:?}: {}", node, err);
            false
        }
    }
}
