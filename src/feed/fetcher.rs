use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::Result;
use crate::feed::dates::parse_to_utc;
use crate::feed::normalize::normalize;
use crate::models::{CandidateItem, FeedSource, RawEntry};

pub const DEFAULT_MAX_ITEMS_PER_FEED: usize = 200;

pub struct FeedFetcher {
    client: Client,
    max_items: usize,
}

impl FeedFetcher {
    pub fn new(timeout: Duration, max_items: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("news-relay/1.0")
            .build()?;

        Ok(Self { client, max_items })
    }

    /// Download and parse one feed, capped at `max_items` entries.
    pub async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let http_charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let bytes = response.bytes().await?;

        if let (Some(http), Some(declared)) = (http_charset, declared_encoding(&bytes)) {
            if !http.eq_ignore_ascii_case(&declared) {
                tracing::debug!(
                    "Ignored charset override for {}: declared {}, served as {}",
                    url,
                    declared,
                    http
                );
            }
        }

        parse_lenient(url, &bytes, self.max_items)
    }

    /// Fetch one feed and normalize its entries against `now`.
    pub async fn fetch(
        &self,
        source: &FeedSource,
        now: DateTime<Utc>,
    ) -> Result<Vec<CandidateItem>> {
        let entries = self.fetch_entries(&source.url).await?;
        Ok(entries
            .iter()
            .filter_map(|entry| normalize(entry, source, now))
            .collect())
    }

    /// Fetch every source concurrently. Results come back in source order;
    /// a failing feed is logged and contributes nothing.
    pub async fn fetch_all(
        &self,
        sources: &[FeedSource],
        now: DateTime<Utc>,
        concurrency: usize,
    ) -> Vec<CandidateItem> {
        let per_feed: Vec<Vec<CandidateItem>> = stream::iter(sources)
            .map(|source| async move {
                match self.fetch(source, now).await {
                    Ok(items) => {
                        if !items.is_empty() {
                            tracing::info!("Feed {} -> {} new item(s)", source.url, items.len());
                        }
                        items
                    }
                    Err(e) => {
                        tracing::error!("Failed processing {}: {}", source.url, e);
                        Vec::new()
                    }
                }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        per_feed.into_iter().flatten().collect()
    }
}

/// Parse a feed document into raw entries, keeping at most `max_items`.
pub fn parse_entries(bytes: &[u8], max_items: usize) -> Result<Vec<RawEntry>> {
    let feed = parser::Builder::new()
        .timestamp_parser(parse_to_utc)
        .build()
        .parse(bytes)?;

    Ok(feed
        .entries
        .into_iter()
        .take(max_items)
        .map(RawEntry::from)
        .collect())
}

/// Parse, falling back to a sanitized body and then to whatever complete
/// entries precede a truncation point. The feed fails only when all three do.
fn parse_lenient(url: &str, bytes: &[u8], max_items: usize) -> Result<Vec<RawEntry>> {
    let err = match parse_entries(bytes, max_items) {
        Ok(entries) => return Ok(entries),
        Err(e) => e,
    };
    tracing::warn!(
        "Feed parse warning for {}: {}; retrying on sanitized body",
        url,
        err
    );

    let clean = sanitize_xml(bytes);
    let err = match parse_entries(&clean, max_items) {
        Ok(entries) => return Ok(entries),
        Err(e) => e,
    };

    match salvage_complete_entries(&clean).map(|body| parse_entries(&body, max_items)) {
        Some(Ok(entries)) if !entries.is_empty() => {
            tracing::warn!(
                "Feed {} is malformed ({}); kept {} complete entries",
                url,
                err,
                entries.len()
            );
            Ok(entries)
        }
        _ => Err(err),
    }
}

/// Cut the document after its last complete item or entry and close the
/// root elements, so a feed broken off mid-entry still parses.
fn salvage_complete_entries(bytes: &[u8]) -> Option<Vec<u8>> {
    let text = String::from_utf8_lossy(bytes);

    let root = ["<rss", "<feed", "<rdf:RDF"]
        .into_iter()
        .filter_map(|marker| text.find(marker).map(|pos| (pos, marker)))
        .min()
        .map(|(_, marker)| marker)?;
    let (item_end, closing) = match root {
        "<feed" => ("</entry>", "</feed>"),
        "<rdf:RDF" => ("</item>", "</rdf:RDF>"),
        _ => ("</item>", "</channel></rss>"),
    };

    let cut = text.rfind(item_end)? + item_end.len();
    let mut body = text[..cut].to_string();
    body.push('\n');
    body.push_str(closing);
    Some(body.into_bytes())
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

fn declared_encoding(bytes: &[u8]) -> Option<String> {
    static ENCODING: OnceLock<Regex> = OnceLock::new();
    let re = ENCODING.get_or_init(|| {
        Regex::new(r#"<\?xml[^>]*encoding=["']([^"']+)["']"#).expect("valid encoding regex")
    });
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]);
    re.captures(&head)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Drop a BOM and anything before the XML root, plus characters XML forbids.
fn sanitize_xml(bytes: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{FEFF}');

    let start = ["<?xml", "<rss", "<feed", "<rdf:RDF"]
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .unwrap_or(0);

    text[start..]
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | '\u{000A}' | '\u{000D}' |
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect::<String>()
        .into_bytes()
}
