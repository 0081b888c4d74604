use sqlx::{Pool, Sqlite};

use crate::models::quotes::Quote;

/// Persistence layer for quotes. Every statement is parameterized and scoped
/// by the server id; no state is held outside the pool.
#[derive(Clone)]
pub struct QuoteStore {
    db: Pool<Sqlite>,
}

impl QuoteStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Insert a quote and return its assigned id.
    pub async fn insert(
        &self,
        server_id: &str,
        channel_id: &str,
        quote: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
                INSERT INTO
                    quotes (server_id, channel_id, quote)
                VALUES
                    ($1, $2, $3)
                RETURNING quoteID;
            "#,
        )
        .bind(server_id)
        .bind(channel_id)
        .bind(quote)
        .fetch_one(&self.db)
        .await
    }

    /// Whether an identical quote is already stored for this server and channel.
    pub async fn exists(
        &self,
        server_id: &str,
        channel_id: &str,
        quote: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
                SELECT EXISTS (
                    SELECT 1 FROM quotes
                    WHERE server_id = $1 AND channel_id = $2 AND quote = $3
                );
            "#,
        )
        .bind(server_id)
        .bind(channel_id)
        .bind(quote)
        .fetch_one(&self.db)
        .await
    }

    /// Insert only if no identical quote exists for this server and channel,
    /// as a single statement so concurrent imports cannot race a duplicate in.
    /// Returns whether a row was inserted.
    pub async fn add_if_missing(
        &self,
        server_id: &str,
        channel_id: &str,
        quote: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
                INSERT INTO
                    quotes (server_id, channel_id, quote)
                SELECT
                    $1, $2, $3
                WHERE NOT EXISTS (
                    SELECT 1 FROM quotes
                    WHERE server_id = $1 AND channel_id = $2 AND quote = $3
                );
            "#,
        )
        .bind(server_id)
        .bind(channel_id)
        .bind(quote)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// All quotes for a server, in insertion order.
    pub async fn list_all(&self, server_id: &str) -> Result<Vec<Quote>, sqlx::Error> {
        sqlx::query_as(
            r#"
                SELECT
                    quoteID AS id, server_id, channel_id, quote
                FROM quotes
                WHERE server_id = $1
                ORDER BY quoteID;
            "#,
        )
        .bind(server_id)
        .fetch_all(&self.db)
        .await
    }

    /// Delete every quote for a server. Returns the number of rows deleted.
    pub async fn delete_all(&self, server_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
                DELETE FROM quotes
                WHERE server_id = $1;
            "#,
        )
        .bind(server_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete quotes matching the exact text for a server. Returns the number
    /// of rows deleted.
    pub async fn delete_matching(&self, server_id: &str, quote: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
                DELETE FROM quotes
                WHERE server_id = $1 AND quote = $2;
            "#,
        )
        .bind(server_id)
        .bind(quote)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn test_store() -> QuoteStore {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .expect("failed to run migrations");

        QuoteStore::new(db)
    }

    #[tokio::test]
    async fn insert_then_list_round_trips() {
        let store = test_store().await;

        let id = store.insert("42", "100", "Hello world").await.unwrap();
        let quotes = store.list_all("42").await.unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].id, id);
        assert_eq!(quotes[0].server_id, "42");
        assert_eq!(quotes[0].channel_id, "100");
        assert_eq!(quotes[0].quote, "Hello world");
    }

    #[tokio::test]
    async fn ids_are_assigned_monotonically() {
        let store = test_store().await;

        let first = store.insert("42", "100", "one").await.unwrap();
        let second = store.insert("42", "100", "two").await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn list_is_scoped_by_server() {
        let store = test_store().await;

        store.insert("42", "100", "mine").await.unwrap();
        store.insert("7", "200", "theirs").await.unwrap();

        let quotes = store.list_all("42").await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].quote, "mine");

        assert!(store.list_all("9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = test_store().await;

        for text in ["a", "b", "c", "d", "e"] {
            store.insert("9", "100", text).await.unwrap();
        }

        let quotes = store.list_all("9").await.unwrap();
        let texts: Vec<&str> = quotes.iter().map(|q| q.quote.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn duplicate_inserts_are_allowed() {
        let store = test_store().await;

        store.insert("42", "100", "again").await.unwrap();
        store.insert("42", "100", "again").await.unwrap();

        assert_eq!(store.list_all("42").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exists_matches_on_server_channel_and_text() {
        let store = test_store().await;

        store.insert("42", "100", "\"first\"").await.unwrap();

        assert!(store.exists("42", "100", "\"first\"").await.unwrap());
        assert!(!store.exists("42", "100", "\"second\"").await.unwrap());
        assert!(!store.exists("42", "200", "\"first\"").await.unwrap());
        assert!(!store.exists("7", "100", "\"first\"").await.unwrap());
    }

    #[tokio::test]
    async fn add_if_missing_is_idempotent() {
        let store = test_store().await;

        // First import pass adds both quote-like messages.
        assert!(store.add_if_missing("42", "100", "\"first\"").await.unwrap());
        assert!(store.add_if_missing("42", "100", "\"second\"").await.unwrap());

        // Second pass over the same history adds nothing.
        assert!(!store.add_if_missing("42", "100", "\"first\"").await.unwrap());
        assert!(!store.add_if_missing("42", "100", "\"second\"").await.unwrap());

        assert_eq!(store.list_all("42").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_all_leaves_other_scopes_intact() {
        let store = test_store().await;

        store.insert("42", "100", "one").await.unwrap();
        store.insert("42", "100", "two").await.unwrap();
        store.insert("7", "200", "kept").await.unwrap();

        assert_eq!(store.delete_all("42").await.unwrap(), 2);
        assert!(store.list_all("42").await.unwrap().is_empty());
        assert_eq!(store.list_all("7").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_matching_removes_exact_text_only() {
        let store = test_store().await;

        store.insert("42", "100", "target").await.unwrap();
        store.insert("42", "200", "target").await.unwrap();
        store.insert("42", "100", "target!").await.unwrap();
        store.insert("7", "100", "target").await.unwrap();

        // Both copies on server 42 go, regardless of channel.
        assert_eq!(store.delete_matching("42", "target").await.unwrap(), 2);

        let remaining = store.list_all("42").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].quote, "target!");

        assert_eq!(store.list_all("7").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_matching_on_absent_text_deletes_nothing() {
        let store = test_store().await;

        store.insert("42", "100", "here").await.unwrap();

        assert_eq!(store.delete_matching("42", "missing").await.unwrap(), 0);
        assert_eq!(store.list_all("42").await.unwrap().len(), 1);
    }
}
