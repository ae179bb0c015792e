pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- categories table
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- agencies table
CREATE TABLE IF NOT EXISTS agencies (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    website TEXT,
    image_url TEXT
);

-- news table; title_key is the lowercased title used for duplicate matching
CREATE TABLE IF NOT EXISTS news (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    title_key TEXT NOT NULL,
    content TEXT NOT NULL,
    image_url TEXT,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    agency_id INTEGER NOT NULL REFERENCES agencies(id),
    pub_date INTEGER,
    link TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_news_link ON news(link) WHERE link IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_news_title_category ON news(category_id, title_key);
CREATE INDEX IF NOT EXISTS idx_news_pub_date ON news(pub_date DESC);
CREATE INDEX IF NOT EXISTS idx_news_agency_id ON news(agency_id);
"#;
