use std::fmt;

use url::Url;

const WATCH_PATH: &str = "/watch";
const VIDEO_PARAM: &str = "v";
const WATCH_BASE: &str = "https://youtube.com/watch";

/// Stable key of a video, taken from the `v` query parameter of a watch URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the video id for an absolute watch URL, `None` for anything else.
///
/// Only `/watch?v=<id>` is recognized; search pages, channels, shorts and
/// relative or unparseable strings are not video URLs.
pub fn derive_identifier(url: &str) -> Option<VideoId> {
    let parsed = Url::parse(url).ok()?;
    derive_identifier_from(&parsed)
}

/// Same as [`derive_identifier`] for an address that is already parsed.
pub fn derive_identifier_from(url: &Url) -> Option<VideoId> {
    if url.path() != WATCH_PATH {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == VIDEO_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .map(VideoId)
}

/// Synthesizes the canonical watch URL used to drive the title lookup.
pub fn watch_url(identifier: &VideoId) -> String {
    let mut url = String::with_capacity(WATCH_BASE.len() + 3 + identifier.0.len());
    url.push_str(WATCH_BASE);
    url.push_str("?v=");
    url.extend(url::form_urlencoded::byte_serialize(identifier.0.as_bytes()));
    url
}
