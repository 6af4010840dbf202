use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node};
use url::Url;

use crate::{DocumentError, MutationKind, MutationRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Document,
    Element(ElementData),
    Text(String),
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    tag: String,
    namespace: Namespace,
    attrs: Vec<(String, String)>,
}

/// Namespace an element was parsed into. `<title>` under `<svg>` is not the
/// document title even though the tag name matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
    Other,
}

impl Namespace {
    fn from_uri(uri: &str) -> Self {
        match uri {
            "http://www.w3.org/1999/xhtml" => Namespace::Html,
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Other,
        }
    }
}

impl ElementData {
    /// Lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn is_html(&self) -> bool {
        self.namespace == Namespace::Html
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }
}

/// Live document tree of the host page.
///
/// Nodes live in an arena: removing a node detaches it but its [`NodeId`]
/// stays valid, so holders of an id can ask [`Document::is_attached`] before
/// writing through it. Every mutation queues a [`MutationRecord`].
#[derive(Debug)]
pub struct Document {
    tree: Tree<DomNode>,
    location: Url,
    records: Vec<MutationRecord>,
}

impl Document {
    /// Parses a full HTML document served from `location`.
    pub fn parse(html: &str, location: &str) -> Result<Self, DocumentError> {
        let location =
            Url::parse(location).map_err(|_| DocumentError::InvalidLocation(location.into()))?;
        let source = Html::parse_document(html);
        let mut tree = Tree::new(DomNode::Document);
        let root = tree.root().id();
        for child in source.tree.root().children() {
            import(&mut tree, root, child);
        }
        Ok(Self {
            tree,
            location,
            records: Vec::new(),
        })
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    /// Current page address.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// In-page navigation; `url` may be relative to the current address.
    pub fn navigate(&mut self, url: &str) -> Result<(), DocumentError> {
        self.location = self
            .location
            .join(url)
            .map_err(|_| DocumentError::InvalidLocation(url.into()))?;
        Ok(())
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.tree.get(node)?.value() {
            DomNode::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        self.tree
            .get(node)
            .is_some_and(|n| matches!(n.value(), DomNode::Text(_)))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.get(node)?.parent().map(|p| p.id())
    }

    /// Concatenated text of `node` and everything below it.
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(node) = self.tree.get(node) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| match n.value() {
                DomNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether `node` is still reachable from the document root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let root = self.root();
        self.tree
            .get(node)
            .is_some_and(|n| n.id() == root || n.ancestors().any(|a| a.id() == root))
    }

    /// Nearest element, starting at `node` itself, that satisfies `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        let node = self.tree.get(node)?;
        std::iter::once(node)
            .chain(node.ancestors())
            .find(|n| matches!(n.value(), DomNode::Element(data) if pred(data)))
            .map(|n| n.id())
    }

    /// `node` followed by all of its descendants in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .get(node)
            .map(|n| n.descendants().map(|d| d.id()).collect())
            .unwrap_or_default()
    }

    /// First attached element in document order that satisfies `pred`.
    pub fn find(&self, pred: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        self.tree
            .root()
            .descendants()
            .find(|n| matches!(n.value(), DomNode::Element(data) if pred(data)))
            .map(|n| n.id())
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.find(|el| el.id() == Some(id))
    }

    /// Absolute target of the element's `href`, resolved against the location.
    pub fn link_url(&self, node: NodeId) -> Option<Url> {
        let href = self.element(node)?.attr("href")?.trim();
        if href.is_empty() {
            return None;
        }
        self.location.join(href).ok()
    }

    /// Parses `html` as a fragment and appends its nodes to `parent`.
    pub fn append_html(
        &mut self,
        parent: NodeId,
        html: &str,
    ) -> Result<Vec<NodeId>, DocumentError> {
        self.require_element(parent)?;
        let existing = self.child_ids(parent).len();
        let fragment = Html::parse_fragment(html);
        for child in fragment.root_element().children() {
            import(&mut self.tree, parent, child);
        }
        self.record(parent, MutationKind::ChildList);
        Ok(self.child_ids(parent).into_iter().skip(existing).collect())
    }

    /// Detaches `node` from its parent. The id stays valid but unattached.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DocumentError> {
        if node == self.root() {
            return Err(DocumentError::RootNotRemovable);
        }
        let parent = self.parent(node);
        self.tree
            .get_mut(node)
            .ok_or(DocumentError::UnknownNode(node))?
            .detach();
        if let Some(parent) = parent {
            self.record(parent, MutationKind::ChildList);
        }
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DocumentError> {
        let mut target = self
            .tree
            .get_mut(node)
            .ok_or(DocumentError::UnknownNode(node))?;
        match target.value() {
            DomNode::Element(data) => data.set_attr(name, value),
            _ => return Err(DocumentError::NotAnElement(node)),
        }
        self.record(
            node,
            MutationKind::Attribute {
                name: name.to_ascii_lowercase(),
            },
        );
        Ok(())
    }

    /// Replaces the text of `node`.
    ///
    /// On an element this swaps all children for a single text node (a child
    /// list change); on a text node it rewrites the data in place.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        if self.is_text(node) {
            if let Some(mut target) = self.tree.get_mut(node) {
                *target.value() = DomNode::Text(text.to_string());
            }
            self.record(node, MutationKind::CharacterData);
            return Ok(());
        }

        self.require_element(node)?;
        for child in self.child_ids(node) {
            if let Some(mut child) = self.tree.get_mut(child) {
                child.detach();
            }
        }
        if !text.is_empty() {
            if let Some(mut target) = self.tree.get_mut(node) {
                target.append(DomNode::Text(text.to_string()));
            }
        }
        self.record(node, MutationKind::ChildList);
        Ok(())
    }

    /// Drains the queued mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.records.push(MutationRecord { target, kind });
    }

    fn require_element(&self, node: NodeId) -> Result<(), DocumentError> {
        match self.tree.get(node) {
            None => Err(DocumentError::UnknownNode(node)),
            Some(n) if matches!(n.value(), DomNode::Element(_)) => Ok(()),
            Some(_) => Err(DocumentError::NotAnElement(node)),
        }
    }

    fn child_ids(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .get(node)
            .map(|n| n.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }
}

fn import(tree: &mut Tree<DomNode>, parent: NodeId, source: NodeRef<'_, Node>) {
    let value = match source.value() {
        Node::Element(el) => DomNode::Element(ElementData {
            tag: el.name().to_ascii_lowercase(),
            namespace: Namespace::from_uri(&el.name.ns),
            attrs: el
                .attrs()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
                .collect(),
        }),
        Node::Text(text) => DomNode::Text((**text).to_owned()),
        Node::Comment(_) => DomNode::Comment,
        Node::Document | Node::Fragment => {
            for child in source.children() {
                import(tree, parent, child);
            }
            return;
        }
        // doctype, processing instructions
        _ => return,
    };

    let Some(mut parent_node) = tree.get_mut(parent) else {
        return;
    };
    let id = parent_node.append(value).id();
    for child in source.children() {
        import(tree, id, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Home</title></head>
        <body><div id="list"><a href="/watch?v=abc"><span id="video-title">Old</span></a></div></body></html>"#;

    fn doc() -> Document {
        Document::parse(PAGE, "https://www.youtube.com/").unwrap()
    }

    #[test]
    fn parse_keeps_text_and_attributes() {
        let doc = doc();
        let title = doc.find_by_id("video-title").unwrap();
        assert_eq!(doc.text_content(title), "Old");
        assert_eq!(doc.element(title).unwrap().tag(), "span");
        assert!(doc.find(|el| el.tag() == "title").is_some());
    }

    #[test]
    fn links_resolve_against_location() {
        let doc = doc();
        let title = doc.find_by_id("video-title").unwrap();
        let anchor = doc.closest(title, |el| el.tag() == "a").unwrap();
        assert_eq!(
            doc.link_url(anchor).unwrap().as_str(),
            "https://www.youtube.com/watch?v=abc"
        );
    }

    #[test]
    fn set_text_replaces_children_and_records_once() {
        let mut doc = doc();
        let title = doc.find_by_id("video-title").unwrap();
        doc.set_text(title, "New").unwrap();
        assert_eq!(doc.text_content(title), "New");
        assert_eq!(
            doc.take_records(),
            vec![MutationRecord {
                target: title,
                kind: MutationKind::ChildList
            }]
        );
        assert!(!doc.has_records());
    }

    #[test]
    fn removed_nodes_stay_addressable_but_detached() {
        let mut doc = doc();
        let list = doc.find_by_id("list").unwrap();
        let title = doc.find_by_id("video-title").unwrap();
        doc.remove(list).unwrap();
        assert!(!doc.is_attached(title));
        assert_eq!(doc.text_content(title), "Old");
        assert!(doc.find_by_id("video-title").is_none());
    }

    #[test]
    fn the_root_cannot_be_removed() {
        let mut doc = doc();
        let root = doc.root();
        assert_eq!(doc.remove(root), Err(DocumentError::RootNotRemovable));
        assert!(doc.is_attached(root));
        assert!(!doc.has_records());
    }

    #[test]
    fn elements_keep_their_namespace() {
        let html = r#"<html><head><title>Tab</title></head>
            <body><svg><title>Like</title></svg></body></html>"#;
        let doc = Document::parse(html, "https://www.youtube.com/").unwrap();
        let titles: Vec<Namespace> = doc
            .descendants(doc.root())
            .into_iter()
            .filter_map(|node| doc.element(node))
            .filter(|el| el.tag() == "title")
            .map(|el| el.namespace())
            .collect();
        assert_eq!(titles, vec![Namespace::Html, Namespace::Svg]);
    }

    #[test]
    fn append_html_returns_new_children() {
        let mut doc = doc();
        let list = doc.find_by_id("list").unwrap();
        let added = doc
            .append_html(list, r#"<a href="/watch?v=def"><span id="video-title">Two</span></a>"#)
            .unwrap();
        assert_eq!(added.len(), 1);
        assert!(doc.is_attached(added[0]));
        assert_eq!(doc.text_content(added[0]), "Two");
    }
}
