//! Server-side duplicate resolution.
//!
//! An incoming item matches a stored record by exact link first, then by
//! case-insensitive title within the same category. A match is never
//! overwritten: only its empty `image_url`, `pub_date` and `link` are
//! filled in from the incoming item. Callers run these functions inside a
//! transaction so that lookup and write see the same state.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{NewsCreate, NewsRecord};

const RECORD_COLUMNS: &str =
    "id, title, content, image_url, category_id, agency_id, pub_date, link";

/// Key used for title matching.
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn find_duplicate(
    conn: &Connection,
    link: Option<&str>,
    title: &str,
    category_id: i64,
) -> rusqlite::Result<Option<NewsRecord>> {
    if let Some(link) = non_empty(link) {
        let by_link = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM news WHERE link = ?1"),
                params![link],
                record_from_row,
            )
            .optional()?;
        if by_link.is_some() {
            return Ok(by_link);
        }
    }

    // Oldest record wins if earlier data already holds several matches.
    conn.query_row(
        &format!(
            "SELECT {RECORD_COLUMNS} FROM news
             WHERE title_key = ?1 AND category_id = ?2
             ORDER BY rowid ASC LIMIT 1"
        ),
        params![title_key(title), category_id],
        record_from_row,
    )
    .optional()
}

/// Fill empty fields of `existing` from `item`. Returns whether anything changed.
pub fn backfill(existing: &mut NewsRecord, item: &NewsCreate) -> bool {
    let mut changed = false;

    if non_empty(existing.image_url.as_deref()).is_none() {
        if let Some(image_url) = non_empty(item.image_url.as_deref()) {
            existing.image_url = Some(image_url.to_string());
            changed = true;
        }
    }
    if existing.pub_date.unwrap_or(0) == 0 {
        if let Some(pub_date) = item.pub_date.filter(|d| *d != 0) {
            existing.pub_date = Some(pub_date);
            changed = true;
        }
    }
    if non_empty(existing.link.as_deref()).is_none() {
        if let Some(link) = non_empty(item.link.as_deref()) {
            existing.link = Some(link.to_string());
            changed = true;
        }
    }

    changed
}

/// Merge `item` into its duplicate if one exists, otherwise insert it.
/// Returns the stored record and whether it was newly created.
pub fn resolve_or_create(
    conn: &Connection,
    item: &NewsCreate,
) -> rusqlite::Result<(NewsRecord, bool)> {
    let link = non_empty(item.link.as_deref());

    if let Some(mut existing) = find_duplicate(conn, link, &item.title, item.category_id)? {
        if backfill(&mut existing, item) {
            conn.execute(
                "UPDATE news SET image_url = ?1, pub_date = ?2, link = ?3 WHERE id = ?4",
                params![
                    existing.image_url,
                    existing.pub_date,
                    existing.link,
                    existing.id
                ],
            )?;
        }
        return Ok((existing, false));
    }

    let record = NewsRecord {
        id: Uuid::new_v4().to_string(),
        title: item.title.trim().to_string(),
        content: item.content.trim().to_string(),
        image_url: item.image_url.clone(),
        category_id: item.category_id,
        agency_id: item.agency_id,
        pub_date: item.pub_date,
        link: link.map(String::from),
    };
    conn.execute(
        "INSERT INTO news (id, title, title_key, content, image_url,
                           category_id, agency_id, pub_date, link)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id,
            record.title,
            title_key(&record.title),
            record.content,
            record.image_url,
            record.category_id,
            record.agency_id,
            record.pub_date,
            record.link,
        ],
    )?;
    Ok((record, true))
}

fn record_from_row(row: &Row) -> rusqlite::Result<NewsRecord> {
    Ok(NewsRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        category_id: row.get(4)?,
        agency_id: row.get(5)?,
        pub_date: row.get(6)?,
        link: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::SCHEMA;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO categories (id, name) VALUES (1, 'Politics'), (4, 'Sport');
             INSERT INTO agencies (id, name) VALUES (9, 'Varzesh');",
        )
        .unwrap();
        conn
    }

    fn item(link: Option<&str>, title: &str, category_id: i64) -> NewsCreate {
        NewsCreate {
            title: title.into(),
            content: " body ".into(),
            image_url: None,
            category_id,
            agency_id: 9,
            pub_date: Some(1_710_000_000),
            link: link.map(String::from),
        }
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM news", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn same_item_twice_creates_once() {
        let conn = conn();
        let it = item(Some("https://x/1"), "A", 4);

        let (first, created) = resolve_or_create(&conn, &it).unwrap();
        assert!(created);
        assert_eq!(first.content, "body");

        let (second, created) = resolve_or_create(&conn, &it).unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn link_match_ignores_title_and_category() {
        let conn = conn();
        let (first, _) = resolve_or_create(&conn, &item(Some("https://x/1"), "A", 4)).unwrap();
        let (second, created) =
            resolve_or_create(&conn, &item(Some("https://x/1"), "Different", 1)).unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.title, "A");
    }

    #[test]
    fn title_and_category_fallback_is_case_insensitive() {
        let conn = conn();
        let (first, _) =
            resolve_or_create(&conn, &item(Some("https://x/1"), "Breaking News", 4)).unwrap();

        let (same, created) =
            resolve_or_create(&conn, &item(Some("https://x/2"), "BREAKING news", 4)).unwrap();
        assert!(!created);
        assert_eq!(same.id, first.id);
        // Populated link is not overwritten.
        assert_eq!(same.link.as_deref(), Some("https://x/1"));

        let (other, created) =
            resolve_or_create(&conn, &item(Some("https://x/3"), "Breaking News", 1)).unwrap();
        assert!(created);
        assert_ne!(other.id, first.id);
        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn empty_fields_are_backfilled_but_populated_ones_kept() {
        let conn = conn();
        let mut bare = item(None, "A", 4);
        bare.pub_date = None;
        let (stored, created) = resolve_or_create(&conn, &bare).unwrap();
        assert!(created);
        assert_eq!(stored.link, None);
        assert_eq!(stored.image_url, None);

        let mut richer = item(Some("https://x/1"), "a", 4);
        richer.image_url = Some("https://x/1.jpg".into());
        let (merged, created) = resolve_or_create(&conn, &richer).unwrap();
        assert!(!created);
        assert_eq!(merged.image_url.as_deref(), Some("https://x/1.jpg"));
        assert_eq!(merged.pub_date, Some(1_710_000_000));
        assert_eq!(merged.link.as_deref(), Some("https://x/1"));

        let mut different = richer.clone();
        different.image_url = Some("https://x/other.jpg".into());
        let (kept, _) = resolve_or_create(&conn, &different).unwrap();
        assert_eq!(kept.image_url.as_deref(), Some("https://x/1.jpg"));

        let reread = find_duplicate(&conn, Some("https://x/1"), "", 0)
            .unwrap()
            .unwrap();
        assert_eq!(reread.image_url.as_deref(), Some("https://x/1.jpg"));
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn empty_link_is_stored_as_null() {
        let conn = conn();
        let (a, _) = resolve_or_create(&conn, &item(Some(""), "A", 4)).unwrap();
        let (b, created) = resolve_or_create(&conn, &item(Some("  "), "B", 4)).unwrap();
        assert!(created);
        assert_eq!(a.link, None);
        assert_eq!(b.link, None);
    }
}
