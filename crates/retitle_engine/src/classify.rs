use ego_tree::NodeId;
use retitle_core::Role;

use crate::Document;

/// Decides which title role, if any, an element plays on the host page.
///
/// The host's markup changes independently of the reconciliation logic, so
/// the matching rules live behind this trait.
pub trait RoleClassifier {
    fn classify(&self, document: &Document, node: NodeId) -> Option<Role>;
}

/// Markup rules of the YouTube desktop site. Only HTML elements qualify, so
/// SVG icon `<title>` tooltips are never taken for the tab title.
#[derive(Debug, Default, Clone, Copy)]
pub struct YoutubeClassifier;

const LIST_TITLE_ID: &str = "video-title";
const HEADING_CLASS: &str = "ytd-watch-metadata";

impl RoleClassifier for YoutubeClassifier {
    fn classify(&self, document: &Document, node: NodeId) -> Option<Role> {
        let element = document.element(node).filter(|el| el.is_html())?;
        if element.id() == Some(LIST_TITLE_ID) {
            Some(Role::ListTitle)
        } else if element.tag() == "h1"
            && element.has_class(HEADING_CLASS)
            && inside_primary_title(document, node)
        {
            Some(Role::WatchHeading)
        } else if element.tag() == "title" {
            Some(Role::PageTitle)
        } else {
            None
        }
    }
}

// `#primary #title`: an element with id "title", at or above the node, that
// itself sits below an element with id "primary".
fn inside_primary_title(document: &Document, node: NodeId) -> bool {
    let mut cursor = Some(node);
    while let Some(title) = cursor.and_then(|n| document.closest(n, |el| el.id() == Some("title")))
    {
        let above = document.parent(title);
        if above
            .and_then(|p| document.closest(p, |el| el.id() == Some("primary")))
            .is_some()
        {
            return true;
        }
        cursor = above;
    }
    false
}
