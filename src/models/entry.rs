use chrono::SecondsFormat;

/// Timestamp fields an entry may carry, in the order they are consulted.
///
/// Entries converted from feed-rs only ever carry `Published` and `Updated`:
/// feed-rs folds RSS `pubDate` and `dc:date` into `published` itself.
/// `PubDate` and `DcDate` are for entries built by other means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Published,
    Updated,
    /// RSS `pubDate` when the parser keeps it apart from `published`.
    PubDate,
    /// Dublin Core `dc:date`.
    DcDate,
}

impl DateField {
    pub const PRIORITY: [DateField; 4] = [
        DateField::Published,
        DateField::Updated,
        DateField::PubDate,
        DateField::DcDate,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLink {
    pub href: String,
    pub rel: Option<String>,
    pub media_type: Option<String>,
}

/// A feed entry flattened out of whatever format it was parsed from.
///
/// Everything is optional: the extractor and normalizer decide what an
/// unusable entry looks like.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub link: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub enclosures: Vec<Enclosure>,
    pub media_thumbnails: Vec<String>,
    pub media_contents: Vec<String>,
    pub links: Vec<EntryLink>,
    pub image: Option<String>,
    pub dates: Vec<(DateField, String)>,
}

impl RawEntry {
    /// Raw timestamp text for a field, if the entry has one.
    pub fn date(&self, field: DateField) -> Option<&str> {
        self.dates
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }
}

impl From<feed_rs::model::Entry> for RawEntry {
    fn from(entry: feed_rs::model::Entry) -> Self {
        let link = select_entry_link(&entry);

        let mut enclosures = Vec::new();
        let mut media_thumbnails = Vec::new();
        let mut media_contents = Vec::new();
        let mut description = None;

        for media in &entry.media {
            for content in &media.content {
                let Some(url) = content.url.as_ref().map(|u| u.to_string()) else {
                    continue;
                };
                // feed-rs reports RSS enclosures as typed media content too.
                if let Some(mime) = &content.content_type {
                    enclosures.push(Enclosure {
                        url: url.clone(),
                        media_type: Some(mime.to_string()),
                    });
                }
                media_contents.push(url);
            }
            media_thumbnails.extend(media.thumbnails.iter().map(|t| t.image.uri.clone()));
            if description.is_none() {
                description = media.description.as_ref().map(|d| d.content.clone());
            }
        }

        let links = entry
            .links
            .iter()
            .map(|l| EntryLink {
                href: l.href.clone(),
                rel: l.rel.clone(),
                media_type: l.media_type.clone(),
            })
            .collect();

        // feed-rs folds RSS pubDate and dc:date into `published`.
        let mut dates = Vec::new();
        if let Some(dt) = entry.published {
            dates.push((
                DateField::Published,
                dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        if let Some(dt) = entry.updated {
            dates.push((
                DateField::Updated,
                dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        RawEntry {
            link,
            title: entry.title.map(|t| t.content),
            content: entry.content.and_then(|c| c.body),
            summary: entry.summary.map(|s| s.content),
            description,
            enclosures,
            media_thumbnails,
            media_contents,
            links,
            image: None,
            dates,
        }
    }
}

fn select_entry_link(entry: &feed_rs::model::Entry) -> Option<String> {
    for link in &entry.links {
        let href = link.href.trim();
        if href.is_empty() {
            continue;
        }
        let rel = link.rel.as_deref().unwrap_or("");
        if rel.is_empty() || rel.eq_ignore_ascii_case("alternate") {
            return Some(href.to_string());
        }
    }
    let id = entry.id.trim();
    if id.starts_with("http://") || id.starts_with("https://") {
        return Some(id.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::extract::best_image;

    fn first_entry(xml: &str) -> RawEntry {
        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        RawEntry::from(feed.entries.into_iter().next().unwrap())
    }

    fn rss_item(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example</title>
    <link>https://x/</link>
    <item>
      <title>A</title>
      <link>https://x/1</link>
      {body}
    </item>
  </channel>
</rss>"#
        )
    }

    #[test]
    fn typed_media_content_is_kept_as_plain_media_too() {
        let entry = first_entry(&rss_item(
            r#"<media:content url="https://x/v.mp4" type="video/mp4"/>"#,
        ));
        assert_eq!(entry.media_contents, vec!["https://x/v.mp4".to_string()]);
        assert_eq!(
            entry.enclosures,
            vec![Enclosure {
                url: "https://x/v.mp4".into(),
                media_type: Some("video/mp4".into()),
            }]
        );
        // Not an image enclosure, so the untyped media fallback picks it up.
        assert_eq!(best_image(&entry).as_deref(), Some("https://x/v.mp4"));
    }

    #[test]
    fn rss_enclosure_image_outranks_thumbnail() {
        let entry = first_entry(&rss_item(
            r#"<enclosure url="https://x/1.jpg" type="image/jpeg" length="1"/>
      <media:thumbnail url="https://x/1-thumb.jpg"/>"#,
        ));
        assert_eq!(entry.media_thumbnails, vec!["https://x/1-thumb.jpg".to_string()]);
        assert_eq!(best_image(&entry).as_deref(), Some("https://x/1.jpg"));
    }

    #[test]
    fn link_falls_back_to_http_guid() {
        let xml = rss_item("").replace(
            "<link>https://x/1</link>",
            r#"<guid isPermaLink="true">https://x/guid</guid>"#,
        );
        assert_eq!(first_entry(&xml).link.as_deref(), Some("https://x/guid"));
    }
}
