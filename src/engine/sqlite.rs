//! SQLite FTS5 [`SearchEngine`].
//!
//! Stored fields live in `search_documents` (keyed by identity hash, with a
//! b-tree index on `time`); the searchable text lives in the `search_fts`
//! virtual table. Both are updated in the same transaction.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;

use super::SearchEngine;
use crate::db;
use crate::error::EngineError;
use crate::migrate;
use crate::models::SearchDocument;

#[derive(Clone)]
pub struct SqliteEngine {
    pool: SqlitePool,
}

impl SqliteEngine {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect_path(path).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SearchEngine for SqliteEngine {
    async fn write_batch(&self, docs: &[SearchDocument]) -> Result<usize, EngineError> {
        let mut tx = self.pool.begin().await?;

        for doc in docs {
            // A path holds at most one document: a retitled or re-dated item
            // arrives under a new key and must evict its old one.
            sqlx::query(
                r#"
                DELETE FROM search_fts
                WHERE key = ?
                   OR key IN (SELECT key FROM search_documents WHERE path = ?)
                "#,
            )
            .bind(&doc.key)
            .bind(&doc.path)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM search_documents WHERE key = ? OR path = ?")
                .bind(&doc.key)
                .bind(&doc.path)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO search_documents (key, path, title, original_content, content, time)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&doc.key)
            .bind(&doc.path)
            .bind(&doc.title)
            .bind(&doc.original_content)
            .bind(&doc.content)
            .bind(doc.time)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO search_fts (key, title, path, original_content, content) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&doc.key)
            .bind(&doc.title)
            .bind(&doc.path)
            .bind(&doc.original_content)
            .bind(&doc.content)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping the transaction on any early return above rolls it back
        tx.commit().await?;
        Ok(docs.len())
    }

    async fn query(&self, query: &str, limit: usize) -> Result<Vec<String>, EngineError> {
        let match_expr = match_expression(query).ok_or_else(|| {
            EngineError::Query(format!("query '{}' contains no searchable terms", query))
        })?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT path
            FROM search_fts
            WHERE search_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) => EngineError::Query(db.message().to_string()),
            other => EngineError::Sql(other),
        })?;

        Ok(rows)
    }

    async fn count(&self) -> Result<usize, EngineError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}

/// FTS5 MATCH expression for a plain user query.
///
/// Every whitespace-separated term becomes a quoted phrase, so punctuation
/// such as `spring-boot` or `c++` is tokenized instead of parsed as query
/// syntax. Terms are ANDed. `None` when no term has a letter or digit.
fn match_expression(query: &str) -> Option<String> {
    let phrases: Vec<String> = query
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();
    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(key: &str, path: &str, title: &str, body: &str) -> SearchDocument {
        SearchDocument {
            key: key.to_string(),
            path: path.to_string(),
            title: title.to_string(),
            original_content: body.to_string(),
            content: body.to_string(),
            time: 1_600_000_000_000,
        }
    }

    async fn engine(dir: &TempDir) -> SqliteEngine {
        SqliteEngine::open(&dir.path().join("index.sqlite"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_key() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir).await;

        engine
            .write_batch(&[doc("K1", "/a.html", "First", "alpha words")])
            .await
            .unwrap();
        engine
            .write_batch(&[doc("K1", "/b.html", "First", "beta words")])
            .await
            .unwrap();

        assert_eq!(engine.count().await.unwrap(), 1);
        assert!(engine.query("alpha", 10).await.unwrap().is_empty());
        assert_eq!(engine.query("beta", 10).await.unwrap(), vec!["/b.html"]);
    }

    #[tokio::test]
    async fn test_duplicate_keys_in_one_batch_keep_last() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir).await;

        engine
            .write_batch(&[
                doc("K1", "/a.html", "A", "shared"),
                doc("K1", "/b.html", "A", "shared"),
            ])
            .await
            .unwrap();

        assert_eq!(engine.count().await.unwrap(), 1);
        assert_eq!(engine.query("shared", 10).await.unwrap(), vec!["/b.html"]);
    }

    #[tokio::test]
    async fn test_query_respects_limit() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir).await;

        let docs: Vec<_> = (0..5)
            .map(|i| doc(&format!("K{i}"), &format!("/{i}.html"), "T", "common term"))
            .collect();
        engine.write_batch(&docs).await.unwrap();

        assert_eq!(engine.query("common", 3).await.unwrap().len(), 3);
        assert_eq!(engine.query("common", 50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_query_without_terms_is_query_error() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir).await;
        engine
            .write_batch(&[doc("K1", "/a.html", "A", "text")])
            .await
            .unwrap();

        let err = engine.query("?! --", 10).await.unwrap_err();
        assert!(matches!(err, EngineError::Query(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_punctuated_terms_are_searchable() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir).await;
        engine
            .write_batch(&[
                doc("K1", "/boot.html", "Boot", "getting started with spring-boot"),
                doc("K2", "/cpp.html", "Cpp", "templates in c++ and \"quotes\""),
            ])
            .await
            .unwrap();

        assert_eq!(engine.query("spring-boot", 10).await.unwrap(), vec!["/boot.html"]);
        assert_eq!(engine.query("c++ templates", 10).await.unwrap(), vec!["/cpp.html"]);
        assert_eq!(engine.query("\"unterminated", 10).await.unwrap(), Vec::<String>::new());
        assert_eq!(engine.query("\"quotes", 10).await.unwrap(), vec!["/cpp.html"]);
    }

    #[test]
    fn test_match_expression_quotes_terms() {
        assert_eq!(match_expression("spring-boot c++").unwrap(), r#""spring-boot" "c++""#);
        assert_eq!(match_expression(r#"say "hi""#).unwrap(), r#""say" """hi""""#);
        assert!(match_expression("?! --").is_none());
    }

    #[tokio::test]
    async fn test_new_key_for_same_path_evicts_old_document() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir).await;

        engine
            .write_batch(&[
                doc("OldTitle2021-01-01", "/a.html", "Old Title", "kubernetes"),
                doc("Other2021-01-01", "/b.html", "Other", "kubernetes"),
            ])
            .await
            .unwrap();
        engine
            .write_batch(&[
                doc("NewTitle2021-01-01", "/a.html", "New Title", "kubernetes"),
                doc("Other2021-01-01", "/b.html", "Other", "kubernetes"),
            ])
            .await
            .unwrap();

        assert_eq!(engine.count().await.unwrap(), 2);
        let mut paths = engine.query("kubernetes", 10).await.unwrap();
        paths.sort();
        assert_eq!(paths, vec!["/a.html", "/b.html"]);
        assert!(engine.query("old", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir).await;

        engine
            .write_batch(&[doc("K1", "/a.html", "Old", "original text")])
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TRIGGER reject_poison BEFORE INSERT ON search_documents
            WHEN NEW.title = 'poison'
            BEGIN SELECT RAISE(ABORT, 'poisoned'); END
            "#,
        )
        .execute(engine.pool())
        .await
        .unwrap();

        let result = engine
            .write_batch(&[
                doc("K1", "/a.html", "Old", "replacement text"),
                doc("K2", "/b.html", "New", "fresh text"),
                doc("K3", "/c.html", "poison", "bad"),
            ])
            .await;
        assert!(result.is_err());

        assert_eq!(engine.count().await.unwrap(), 1);
        assert_eq!(engine.query("original", 10).await.unwrap(), vec!["/a.html"]);
        assert!(engine.query("fresh", 10).await.unwrap().is_empty());
    }
}
