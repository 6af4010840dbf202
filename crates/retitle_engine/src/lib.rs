//! Retitle engine: live document, reconciliation, and title lookups.
mod classify;
mod document;
mod lookup;
mod reconcile;
mod resolver;
mod session;
mod types;
mod watch;

pub use classify::{RoleClassifier, YoutubeClassifier};
pub use document::{Document, DomNode, ElementData, Namespace};
pub use ego_tree::NodeId;
pub use lookup::{oembed_url, LookupSettings, OembedLookup, TitleLookup};
pub use reconcile::Reconciler;
pub use resolver::{ResolutionEvent, ResolverHandle, ResolverSettings};
pub use session::{Session, SessionSettings};
pub use types::{
    DocumentError, FailureKind, LookupError, MutationKind, MutationRecord, SessionError,
};
pub use watch::{MutationWatcher, WatchSettings};
