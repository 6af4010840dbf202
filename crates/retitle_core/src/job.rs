use crate::VideoId;

/// Text shown in a title element while its lookup is outstanding.
pub const PLACEHOLDER: &str = "...";

/// Text shown when the lookup failed and nothing was observed to fall back on.
pub const FAILED_TITLE: &str = "<failed to fetch title>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// Display context a title element occupies on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Thumbnail title inside a list of videos.
    ListTitle,
    /// Heading above the video on a watch page.
    WatchHeading,
    /// The document `<title>`, shown in the browser tab.
    PageTitle,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::ListTitle, Role::WatchHeading, Role::PageTitle];

    fn slot(self) -> usize {
        match self {
            Role::ListTitle => 0,
            Role::WatchHeading => 1,
            Role::PageTitle => 2,
        }
    }
}

/// One element handle per role. Binding a role overwrites the previous handle.
///
/// Handles are non-owning: the host decides whether a handle still points at
/// a live element before writing through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSlots<H> {
    slots: [Option<H>; 3],
}

impl<H: Copy + Eq> RoleSlots<H> {
    pub fn new() -> Self {
        Self { slots: [None; 3] }
    }

    /// Binds `handle` to `role`, returning the handle it displaced.
    pub fn bind(&mut self, role: Role, handle: H) -> Option<H> {
        self.slots[role.slot()].replace(handle)
    }

    pub fn get(&self, role: Role) -> Option<H> {
        self.slots[role.slot()]
    }

    /// Bound handles in role order.
    pub fn bound(&self) -> impl Iterator<Item = (Role, H)> + '_ {
        Role::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|handle| (role, handle)))
    }
}

impl<H: Copy + Eq> Default for RoleSlots<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lookup and display state for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job<H> {
    identifier: VideoId,
    status: JobStatus,
    resolved_text: Option<String>,
    fallback_text: String,
    slots: RoleSlots<H>,
}

impl<H: Copy + Eq> Job<H> {
    pub(crate) fn new(identifier: VideoId, observed_text: &str) -> Self {
        // An element still showing a placeholder tells us nothing about its title.
        let fallback_text = if observed_text == PLACEHOLDER {
            String::new()
        } else {
            observed_text.to_string()
        };
        Self {
            identifier,
            status: JobStatus::Pending,
            resolved_text: None,
            fallback_text,
            slots: RoleSlots::new(),
        }
    }

    pub fn identifier(&self) -> &VideoId {
        &self.identifier
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Set exactly when the status is `Done`.
    pub fn resolved_text(&self) -> Option<&str> {
        self.resolved_text.as_deref()
    }

    pub fn fallback_text(&self) -> &str {
        &self.fallback_text
    }

    pub fn slots(&self) -> &RoleSlots<H> {
        &self.slots
    }

    pub fn bind(&mut self, role: Role, handle: H) -> Option<H> {
        self.slots.bind(role, handle)
    }

    /// Text every element bound to this job should currently show.
    pub fn display_text(&self) -> &str {
        match (self.status, self.resolved_text.as_deref()) {
            (JobStatus::Done, Some(title)) => title,
            (JobStatus::Pending, _) | (JobStatus::Done, None) => PLACEHOLDER,
            (JobStatus::Failed, _) => {
                if self.fallback_text.is_empty() {
                    FAILED_TITLE
                } else {
                    &self.fallback_text
                }
            }
        }
    }

    pub(crate) fn finish(&mut self, resolved: Option<String>) {
        match resolved {
            Some(title) => {
                self.status = JobStatus::Done;
                self.resolved_text = Some(title);
            }
            None => self.status = JobStatus::Failed,
        }
    }
}
