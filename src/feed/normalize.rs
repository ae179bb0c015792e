use chrono::{DateTime, TimeDelta, Utc};

use crate::feed::dates::parse_to_utc;
use crate::feed::extract::extract;
use crate::models::{CandidateItem, DateField, FeedSource, RawEntry};

pub const MAX_TITLE_CHARS: usize = 512;
pub const MAX_CONTENT_CHARS: usize = 4000;

/// How far back from `now` an entry may be published and still be delivered.
pub const RECENCY_WINDOW_SECS: i64 = 3600;

pub fn recency_window() -> TimeDelta {
    TimeDelta::seconds(RECENCY_WINDOW_SECS)
}

/// Turn a raw entry into a candidate item, or `None` if it must be skipped.
///
/// An entry is skipped when its link is missing or not a URL, when no date
/// field parses, or when the publish time falls outside
/// `[now - recency_window(), now]`.
pub fn normalize(
    entry: &RawEntry,
    source: &FeedSource,
    now: DateTime<Utc>,
) -> Option<CandidateItem> {
    let link = entry.link.as_deref().map(str::trim).unwrap_or("");
    if link.is_empty() || url::Url::parse(link).is_err() {
        return None;
    }

    let published = resolve_pub_date(entry)?;
    if published < now - recency_window() || published > now {
        return None;
    }

    let extracted = extract(entry);
    Some(CandidateItem {
        title: truncate_chars(&extracted.title, MAX_TITLE_CHARS),
        content: truncate_chars(&extracted.content, MAX_CONTENT_CHARS),
        image_url: extracted.image_url,
        category_id: source.category_id,
        agency_id: source.agency_id,
        pub_date: Some(published.timestamp()),
        link: link.to_string(),
    })
}

/// First date field, in priority order, that parses.
pub fn resolve_pub_date(entry: &RawEntry) -> Option<DateTime<Utc>> {
    DateField::PRIORITY
        .iter()
        .filter_map(|field| entry.date(*field))
        .find_map(parse_to_utc)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SecondsFormat, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn source() -> FeedSource {
        FeedSource {
            category_id: 4,
            agency_id: 9,
            url: "https://x/rss".into(),
            category: "Sport".into(),
            agency: "X".into(),
        }
    }

    fn stamp(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn entry_at(published: DateTime<Utc>) -> RawEntry {
        RawEntry {
            link: Some("https://x/1".into()),
            title: Some("<b>A</b>".into()),
            description: Some("hello world".into()),
            dates: vec![(DateField::Published, stamp(published))],
            ..Default::default()
        }
    }

    #[test]
    fn builds_candidate_from_fresh_entry() {
        let published = now() - TimeDelta::minutes(1);
        let item = normalize(&entry_at(published), &source(), now()).unwrap();
        assert_eq!(
            item,
            CandidateItem {
                title: "A".into(),
                content: "hello world".into(),
                image_url: None,
                category_id: 4,
                agency_id: 9,
                pub_date: Some(published.timestamp()),
                link: "https://x/1".into(),
            }
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(normalize(&entry_at(now()), &source(), now()).is_some());
        assert!(normalize(&entry_at(now() - recency_window()), &source(), now()).is_some());
        assert!(normalize(
            &entry_at(now() - recency_window() - TimeDelta::seconds(1)),
            &source(),
            now()
        )
        .is_none());
        assert!(normalize(&entry_at(now() + TimeDelta::seconds(1)), &source(), now()).is_none());
    }

    #[test]
    fn missing_or_garbage_dates_are_rejected() {
        let mut entry = entry_at(now());
        entry.dates.clear();
        assert!(normalize(&entry, &source(), now()).is_none());

        entry.dates = vec![(DateField::Published, "not a date".into())];
        assert!(normalize(&entry, &source(), now()).is_none());
    }

    #[test]
    fn later_date_fields_are_tried_when_earlier_ones_fail() {
        let mut entry = entry_at(now());
        entry.dates = vec![
            (DateField::Published, "garbage".into()),
            (DateField::DcDate, stamp(now() - TimeDelta::minutes(5))),
            (DateField::Updated, stamp(now() - TimeDelta::minutes(2))),
        ];
        let item = normalize(&entry, &source(), now()).unwrap();
        assert_eq!(item.pub_date, Some((now() - TimeDelta::minutes(2)).timestamp()));
    }

    #[test]
    fn naive_date_is_read_in_source_zone() {
        let mut entry = entry_at(now());
        // 15:00 Tehran is 11:30 UTC.
        entry.dates = vec![(DateField::PubDate, "2024-03-10 15:00:00".into())];
        let item = normalize(&entry, &source(), now()).unwrap();
        assert_eq!(
            item.pub_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 10, 11, 30, 0).unwrap().timestamp())
        );
    }

    #[test]
    fn bad_links_are_rejected() {
        for link in [None, Some(""), Some("   "), Some("not a url")] {
            let mut entry = entry_at(now());
            entry.link = link.map(String::from);
            assert!(normalize(&entry, &source(), now()).is_none(), "{link:?}");
        }

        let mut entry = entry_at(now());
        entry.link = Some("  https://x/2  ".into());
        assert_eq!(normalize(&entry, &source(), now()).unwrap().link, "https://x/2");
    }

    #[test]
    fn long_fields_are_truncated_by_characters() {
        let mut entry = entry_at(now());
        entry.title = Some("خ".repeat(600));
        entry.description = Some("a".repeat(5000));
        let item = normalize(&entry, &source(), now()).unwrap();
        assert_eq!(item.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(item.content.chars().count(), MAX_CONTENT_CHARS);
    }
}
