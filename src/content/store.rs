//! Comment and share-count storage on SQLite

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author TEXT NOT NULL,
    content TEXT NOT NULL,
    page_num INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_page
    ON comments(page_num, created_at DESC);

CREATE TABLE IF NOT EXISTS share_counts (
    url TEXT NOT NULL,
    platform TEXT NOT NULL,
    count INTEGER NOT NULL,
    last_updated TEXT NOT NULL,
    PRIMARY KEY (url, platform)
) WITHOUT ROWID;
"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub page_num: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareCount {
    pub platform: String,
    pub count: i64,
}

pub struct ContentStore {
    db_path: String,
}

impl ContentStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to create content tables")?;

        Ok(Self {
            db_path: db_path.to_string(),
        })
    }

    pub fn add_comment(&self, author: &str, content: &str, page_num: i64) -> Result<Comment> {
        let created_at = Utc::now().to_rfc3339();
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO comments (author, content, page_num, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![author, content, page_num, created_at],
        )
        .context("Failed to insert comment")?;

        Ok(Comment {
            id: conn.last_insert_rowid(),
            author: author.to_string(),
            content: content.to_string(),
            page_num,
            created_at,
        })
    }

    /// Newest first; id breaks ties within the same timestamp
    pub fn comments_for_page(&self, page_num: i64) -> Result<Vec<Comment>> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT id, author, content, page_num, created_at FROM comments
             WHERE page_num = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let comments = stmt
            .query_map(params![page_num], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    author: row.get(1)?,
                    content: row.get(2)?,
                    page_num: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    /// Bump the counter for (article, platform) and return the new value
    pub fn increment_share(&self, article_id: &str, platform: &str) -> Result<i64> {
        let conn = Connection::open(&self.db_path)?;
        let count = conn
            .query_row(
                "INSERT INTO share_counts (url, platform, count, last_updated)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(url, platform)
                 DO UPDATE SET count = count + 1, last_updated = excluded.last_updated
                 RETURNING count",
                params![article_id, platform, Utc::now().to_rfc3339()],
                |row| row.get(0),
            )
            .context("Failed to update share count")?;

        Ok(count)
    }

    pub fn share_counts(&self, article_id: &str) -> Result<Vec<ShareCount>> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT platform, count FROM share_counts WHERE url = ?1 ORDER BY platform",
        )?;

        let counts = stmt
            .query_map(params![article_id], |row| {
                Ok(ShareCount {
                    platform: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}
