use std::sync::OnceLock;

use regex::Regex;

use crate::models::RawEntry;

/// Plain-text fields pulled out of a raw entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

pub fn extract(entry: &RawEntry) -> Extracted {
    Extracted {
        title: strip_html(entry.title.as_deref().unwrap_or("")),
        content: best_content(entry),
        image_url: best_image(entry),
    }
}

/// Remove markup tags, then decode entities, then trim.
pub fn strip_html(html: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
    let text = tags.replace_all(html, "");
    html_escape::decode_html_entities(&text).trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    ws.replace_all(text, " ").trim().to_string()
}

/// First non-empty of content, summary, description, as collapsed plain text.
pub fn best_content(entry: &RawEntry) -> String {
    [&entry.content, &entry.summary, &entry.description]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map(|s| collapse_whitespace(&strip_html(s)))
        .unwrap_or_default()
}

fn is_image_type(media_type: Option<&str>) -> bool {
    media_type
        .map(|t| t.to_ascii_lowercase().contains("image"))
        .unwrap_or(false)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Image lookup order: image enclosure, media thumbnail or content,
/// `rel="enclosure"` image link, then the entry's own image field.
pub fn best_image(entry: &RawEntry) -> Option<String> {
    if let Some(url) = entry
        .enclosures
        .iter()
        .find(|e| is_image_type(e.media_type.as_deref()))
        .and_then(|e| non_empty(&e.url))
    {
        return Some(url);
    }

    for candidates in [&entry.media_thumbnails, &entry.media_contents] {
        if let Some(url) = candidates.first().and_then(|u| non_empty(u)) {
            return Some(url);
        }
    }

    if let Some(url) = entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
        .find(|l| is_image_type(l.media_type.as_deref()))
        .and_then(|l| non_empty(&l.href))
    {
        return Some(url);
    }

    entry.image.as_deref().and_then(non_empty)
}
