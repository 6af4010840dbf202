#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use retitle_engine::{Document, FailureKind, LookupError, NodeId, TitleLookup};
use tokio::sync::Semaphore;

pub const WATCH_LOCATION: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub const WATCH_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Nunca te vou desistir - YouTube</title></head>
<body>
  <div id="primary">
    <div id="title"><h1 class="style-scope ytd-watch-metadata">Nunca te vou desistir</h1></div>
  </div>
  <div id="related">
    <a href="/watch?v=dQw4w9WgXcQ&amp;pp=sAQA"><span id="video-title">Nunca te vou desistir</span></a>
    <a href="/watch?v=abc123"><span id="video-title">Some Video</span></a>
    <a href="/results?search_query=x"><span id="video-title">Search results</span></a>
  </div>
</body>
</html>"#;

pub fn watch_page() -> Document {
    Document::parse(WATCH_PAGE, WATCH_LOCATION).expect("fixture parses")
}

/// The `#video-title` element inside the link pointing at `href`.
pub fn list_title(document: &Document, href: &str) -> NodeId {
    let anchor = document
        .find(|el| el.tag() == "a" && el.attr("href") == Some(href))
        .expect("anchor present");
    document
        .descendants(anchor)
        .into_iter()
        .find(|&node| document.element(node).is_some_and(|el| el.id() == Some("video-title")))
        .expect("list title present")
}

pub fn heading(document: &Document) -> NodeId {
    document.find(|el| el.tag() == "h1").expect("heading present")
}

pub fn page_title(document: &Document) -> NodeId {
    document.find(|el| el.tag() == "title").expect("title present")
}

/// In-memory lookup keyed by watch URL; unknown URLs fail with a 404.
///
/// With a gate, every lookup waits for a permit before answering.
#[derive(Default)]
pub struct FakeLookup {
    titles: HashMap<String, String>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new(titles: &[(&str, &str)]) -> Self {
        Self {
            titles: titles
                .iter()
                .map(|(id, title)| (format!("https://youtube.com/watch?v={id}"), title.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, id: &str) -> usize {
        let url = format!("https://youtube.com/watch?v={id}");
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| **seen == url)
            .count()
    }
}

#[async_trait::async_trait]
impl TitleLookup for FakeLookup {
    async fn lookup(&self, watch_url: &str) -> Result<String, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(watch_url.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
        self.titles.get(watch_url).cloned().ok_or(LookupError {
            kind: FailureKind::HttpStatus(404),
            message: "Not Found".to_string(),
        })
    }
}
