use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, TransactionBehavior};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Agency, Category, NewsCreate, NewsFilter, NewsView};

use super::resolver::resolve_or_create;
use super::schema::SCHEMA;

const VIEW_SELECT: &str = r#"SELECT n.id, n.title, n.content, n.image_url, n.pub_date, n.link,
                                   c.id, c.name, a.id, a.name, a.website, a.image_url
                            FROM news n
                            JOIN categories c ON n.category_id = c.id
                            JOIN agencies a ON n.agency_id = a.id"#;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Reference data

    pub async fn upsert_category(&self, category: Category) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO categories (id, name) VALUES (?1, ?2)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                    params![category.id, category.name],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn upsert_agency(&self, agency: Agency) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO agencies (id, name, website, image_url) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                         name = excluded.name,
                         website = COALESCE(excluded.website, agencies.website),
                         image_url = COALESCE(excluded.image_url, agencies.image_url)",
                    params![agency.id, agency.name, agency.website, agency.image_url],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
                let categories = stmt
                    .query_map([], |row| {
                        Ok(Category {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(categories)
            })
            .await?;
        Ok(categories)
    }

    pub async fn list_agencies(&self) -> Result<Vec<Agency>> {
        let agencies = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, website, image_url FROM agencies ORDER BY name ASC",
                )?;
                let agencies = stmt
                    .query_map([], |row| {
                        Ok(Agency {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            website: row.get(2)?,
                            image_url: row.get(3)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(agencies)
            })
            .await?;
        Ok(agencies)
    }

    // News ingestion

    /// Resolve one item against stored news in its own transaction.
    pub async fn ingest(&self, item: NewsCreate) -> Result<(NewsView, bool)> {
        let result = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let (record, created) = resolve_or_create(&tx, &item)?;
                let view = load_view(&tx, &record.id)?;
                tx.commit()?;
                Ok((view, created))
            })
            .await?;
        Ok(result)
    }

    /// Resolve a batch in one transaction; any failure rolls back the whole batch.
    pub async fn ingest_bulk(&self, items: Vec<NewsCreate>) -> Result<Vec<NewsView>> {
        let views = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let mut views = Vec::with_capacity(items.len());
                for item in &items {
                    let (record, _) = resolve_or_create(&tx, item)?;
                    views.push(load_view(&tx, &record.id)?);
                }
                tx.commit()?;
                Ok(views)
            })
            .await?;
        Ok(views)
    }

    // News queries

    pub async fn get_news(&self, id: String) -> Result<Option<NewsView>> {
        let view = self
            .conn
            .call(move |conn| {
                let view = conn
                    .query_row(
                        &format!("{VIEW_SELECT} WHERE n.id = ?1"),
                        params![id],
                        view_from_row,
                    )
                    .optional()?;
                Ok(view)
            })
            .await?;
        Ok(view)
    }

    /// Filtered page of news, newest first, plus the total match count.
    pub async fn list_news(&self, filter: NewsFilter) -> Result<(i64, Vec<NewsView>)> {
        let result = self
            .conn
            .call(move |conn| {
                let (where_sql, mut args) = filter_clause(&filter);

                let total: i64 = conn.query_row(
                    &format!(
                        "SELECT COUNT(*) FROM news n
                         JOIN categories c ON n.category_id = c.id
                         JOIN agencies a ON n.agency_id = a.id{where_sql}"
                    ),
                    params_from_iter(args.iter()),
                    |row| row.get(0),
                )?;

                args.push(Value::Integer(filter.limit));
                args.push(Value::Integer(filter.offset));
                let mut stmt = conn.prepare(&format!(
                    "{VIEW_SELECT}{where_sql}
                     ORDER BY n.pub_date DESC NULLS LAST, n.rowid DESC
                     LIMIT ? OFFSET ?"
                ))?;
                let rows = stmt
                    .query_map(params_from_iter(args.iter()), view_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((total, rows))
            })
            .await?;
        Ok(result)
    }
}

fn filter_clause(filter: &NewsFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(id) = filter.category_id {
        clauses.push("n.category_id = ?");
        args.push(Value::Integer(id));
    }
    if let Some(id) = filter.agency_id {
        clauses.push("n.agency_id = ?");
        args.push(Value::Integer(id));
    }
    if let Some(name) = filter.category.as_deref().filter(|s| !s.is_empty()) {
        clauses.push("lower(c.name) = ?");
        args.push(Value::Text(name.to_lowercase()));
    }
    if let Some(name) = filter.agency.as_deref().filter(|s| !s.is_empty()) {
        clauses.push("lower(a.name) = ?");
        args.push(Value::Text(name.to_lowercase()));
    }
    if let Some(q) = filter.q.as_deref().filter(|s| !s.is_empty()) {
        clauses.push("(lower(n.title) LIKE ? OR lower(n.content) LIKE ?)");
        let like = format!("%{}%", q.to_lowercase());
        args.push(Value::Text(like.clone()));
        args.push(Value::Text(like));
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }
}

fn load_view(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<NewsView> {
    conn.query_row(
        &format!("{VIEW_SELECT} WHERE n.id = ?1"),
        params![id],
        view_from_row,
    )
}

fn view_from_row(row: &Row) -> rusqlite::Result<NewsView> {
    Ok(NewsView {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        pub_date: row.get(4)?,
        link: row.get(5)?,
        category: Category {
            id: row.get(6)?,
            name: row.get(7)?,
        },
        agency: Agency {
            id: row.get(8)?,
            name: row.get(9)?,
            website: row.get(10)?,
            image_url: row.get(11)?,
        },
    })
}
