use std::collections::HashSet;

use ego_tree::NodeId;

use crate::{Document, MutationKind, MutationRecord};

#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Attribute names whose changes trigger a rescan outside `<head>`.
    /// `None` observes all.
    pub attribute_filter: Option<Vec<String>>,
    /// Same, for targets inside `<head>`.
    pub head_attribute_filter: Option<Vec<String>>,
    pub observe_character_data: bool,
    /// Upper bound on mutation batches processed back to back while settling.
    pub max_settle_rounds: usize,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            attribute_filter: Some(vec!["id".to_string()]),
            head_attribute_filter: None,
            observe_character_data: true,
            max_settle_rounds: 16,
        }
    }
}

/// Turns a batch of mutation records into the elements to reconcile.
#[derive(Debug, Clone, Default)]
pub struct MutationWatcher {
    settings: WatchSettings,
}

impl MutationWatcher {
    pub fn new(settings: WatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    pub fn observes(&self, document: &Document, record: &MutationRecord) -> bool {
        match &record.kind {
            MutationKind::ChildList => true,
            MutationKind::Attribute { name } => {
                let in_head = document
                    .closest(record.target, |el| el.is_html() && el.tag() == "head")
                    .is_some();
                let filter = if in_head {
                    &self.settings.head_attribute_filter
                } else {
                    &self.settings.attribute_filter
                };
                match filter {
                    Some(filter) => filter.iter().any(|attr| attr.eq_ignore_ascii_case(name)),
                    None => true,
                }
            }
            MutationKind::CharacterData => self.settings.observe_character_data,
        }
    }

    /// Every changed element plus all of its descendants, each once, in
    /// record order. Text node targets stand for their parent element and
    /// detached targets are skipped.
    pub fn expand(&self, document: &Document, records: &[MutationRecord]) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for record in records
            .iter()
            .filter(|record| self.observes(document, record))
        {
            let target = if document.is_text(record.target) {
                match document.parent(record.target) {
                    Some(parent) => parent,
                    None => continue,
                }
            } else {
                record.target
            };
            if !document.is_attached(target) {
                continue;
            }
            for node in document.descendants(target) {
                if document.element(node).is_some() && seen.insert(node) {
                    nodes.push(node);
                }
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Tab</title><meta name="x" content="1"></head>
        <body><div id="list"><a href="/watch?v=abc"><span id="video-title">Old</span></a></div>
        <div id="other"><p>Text</p></div></body></html>"#;

    fn doc() -> Document {
        Document::parse(PAGE, "https://www.youtube.com/").unwrap()
    }

    fn anchor(doc: &Document) -> NodeId {
        doc.find(|el| el.tag() == "a").unwrap()
    }

    #[test]
    fn default_filter_ignores_body_attributes_other_than_id() {
        let mut doc = doc();
        let watcher = MutationWatcher::default();
        let anchor = anchor(&doc);
        doc.set_attribute(anchor, "href", "/watch?v=def").unwrap();
        doc.set_attribute(anchor, "class", "hovered").unwrap();

        let records = doc.take_records();
        assert!(records.iter().all(|r| !watcher.observes(&doc, r)));
        assert!(watcher.expand(&doc, &records).is_empty());

        doc.set_attribute(anchor, "id", "row").unwrap();
        let records = doc.take_records();
        assert!(watcher.observes(&doc, &records[0]));
        assert_eq!(watcher.expand(&doc, &records).len(), 2);
    }

    #[test]
    fn head_attributes_are_all_observed_by_default() {
        let mut doc = doc();
        let watcher = MutationWatcher::default();
        let meta = doc.find(|el| el.tag() == "meta").unwrap();
        doc.set_attribute(meta, "content", "2").unwrap();

        let records = doc.take_records();
        assert!(watcher.observes(&doc, &records[0]));
        assert_eq!(watcher.expand(&doc, &records), vec![meta]);
    }

    #[test]
    fn character_data_maps_to_the_parent_element() {
        let mut doc = doc();
        let title = doc.find_by_id("video-title").unwrap();
        let text = doc.descendants(title)[1];
        assert!(doc.is_text(text));
        doc.set_text(text, "Edited").unwrap();

        let records = doc.take_records();
        assert_eq!(records[0].kind, MutationKind::CharacterData);
        assert_eq!(MutationWatcher::default().expand(&doc, &records), vec![title]);

        let quiet = MutationWatcher::new(WatchSettings {
            observe_character_data: false,
            ..WatchSettings::default()
        });
        assert!(!quiet.observes(&doc, &records[0]));
        assert!(quiet.expand(&doc, &records).is_empty());
    }

    #[test]
    fn detached_targets_are_skipped() {
        let mut doc = doc();
        let list = doc.find_by_id("list").unwrap();
        let title = doc.find_by_id("video-title").unwrap();
        doc.set_text(title, "Changed").unwrap();
        doc.remove(list).unwrap();

        let records = doc.take_records();
        assert_eq!(records.len(), 2);
        let nodes = MutationWatcher::default().expand(&doc, &records);
        assert!(!nodes.contains(&title));
        assert!(!nodes.contains(&list));
    }

    #[test]
    fn overlapping_targets_are_visited_once() {
        let mut doc = doc();
        let list = doc.find_by_id("list").unwrap();
        let title = doc.find_by_id("video-title").unwrap();
        doc.set_text(title, "One").unwrap();
        doc.set_attribute(list, "id", "list").unwrap();
        doc.set_text(title, "Two").unwrap();

        let records = doc.take_records();
        let nodes = MutationWatcher::default().expand(&doc, &records);
        assert_eq!(nodes, vec![title, list, anchor(&doc)]);
    }
}
