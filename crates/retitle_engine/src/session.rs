use std::sync::Arc;
use std::time::{Duration, Instant};

use ego_tree::NodeId;
use retitle_core::{Effect, JobStore, Resolution};
use retitle_logging::{retitle_debug, retitle_info, retitle_warn};

use crate::{
    Document, LookupSettings, MutationWatcher, OembedLookup, Reconciler, ResolutionEvent,
    ResolverHandle, ResolverSettings, RoleClassifier, SessionError, TitleLookup, WatchSettings,
    YoutubeClassifier,
};

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub lookup: LookupSettings,
    pub resolver: ResolverSettings,
    pub watch: WatchSettings,
}

/// One page session: the document, its jobs, and the machinery between them.
///
/// All document and job store access happens on the thread that owns the
/// session. Lookups run elsewhere and are applied by
/// [`Session::poll_resolutions`], [`Session::wait_for_resolution`] or
/// [`Session::settle`]. Dropping the session is the page teardown.
pub struct Session<C = YoutubeClassifier> {
    document: Document,
    store: JobStore<NodeId>,
    reconciler: Reconciler<C>,
    watcher: MutationWatcher,
    resolver: ResolverHandle,
}

impl Session<YoutubeClassifier> {
    /// Starts a session that resolves titles through the oEmbed endpoint.
    pub fn start(document: Document, settings: SessionSettings) -> Result<Self, SessionError> {
        let lookup = OembedLookup::new(settings.lookup.clone())?;
        Self::with_parts(document, YoutubeClassifier, Arc::new(lookup), settings)
    }
}

impl<C: RoleClassifier> Session<C> {
    /// Starts a session and reconciles every element already in the document.
    pub fn with_parts(
        document: Document,
        classifier: C,
        lookup: Arc<dyn TitleLookup>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let resolver = ResolverHandle::new(lookup, settings.resolver)?;
        let mut session = Self {
            document,
            store: JobStore::new(),
            reconciler: Reconciler::new(classifier),
            watcher: MutationWatcher::new(settings.watch),
            resolver,
        };

        let root = session.document.root();
        let nodes = session.document.descendants(root);
        session.reconcile_nodes(nodes);
        retitle_info!(
            "Session started at {} with {} jobs",
            session.document.location(),
            session.store.len()
        );
        Ok(session)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Host-side access for mutating the page. Changes are picked up by the
    /// next [`Session::pump`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn store(&self) -> &JobStore<NodeId> {
        &self.store
    }

    /// Processes one batch of mutation records. Returns the batch size.
    pub fn pump(&mut self) -> usize {
        let records = self.document.take_records();
        if records.is_empty() {
            return 0;
        }
        let nodes = self.watcher.expand(&self.document, &records);
        self.reconcile_nodes(nodes);
        records.len()
    }

    /// Applies every lookup that has finished so far.
    pub fn poll_resolutions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.resolver.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Blocks up to `timeout` for one lookup to finish and applies it.
    pub fn wait_for_resolution(&mut self, timeout: Duration) -> bool {
        match self.resolver.recv_timeout(timeout) {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Alternates mutation batches and lookup results until no job is
    /// pending and the document is quiet.
    pub fn settle(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll_resolutions();
            let mut rounds = 0;
            while self.document.has_records() && rounds < self.watcher.settings().max_settle_rounds
            {
                self.pump();
                rounds += 1;
            }

            let pending = self.store.pending_count();
            if pending == 0 && !self.document.has_records() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::Timeout { pending });
            }
            if pending > 0 {
                self.wait_for_resolution(deadline - now);
            }
        }
    }

    fn reconcile_nodes(&mut self, nodes: Vec<NodeId>) {
        for node in nodes {
            let effect = self
                .reconciler
                .reconcile(&mut self.document, &mut self.store, node);
            if let Some(Effect::ResolveTitle {
                identifier,
                watch_url,
            }) = effect
            {
                self.resolver.submit(identifier, watch_url);
            }
        }
    }

    fn apply(&mut self, event: ResolutionEvent) {
        let resolution = match event.result {
            Ok(title) => {
                retitle_debug!("Resolved id={} title={:?}", event.identifier, title);
                Resolution::Resolved(title)
            }
            Err(err) => {
                retitle_warn!(
                    "Failed fetching oEmbed title, reverting to observed text id={} url={} err={}",
                    event.identifier,
                    event.watch_url,
                    err
                );
                Resolution::Failed
            }
        };
        if let Some(completion) = self.store.complete(&event.identifier, resolution) {
            let written = self.reconciler.push(&mut self.document, &completion);
            retitle_debug!(
                "Pushed {:?} title for id={} into {} elements",
                completion.status,
                completion.identifier,
                written
            );
        }
    }
}
