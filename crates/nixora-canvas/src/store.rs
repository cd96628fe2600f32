//! Document Store
//!
//! Persistence of page documents. The protocol core only ever touches the
//! `components` field, which is exactly a [`Schema`].

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schema::{Schema, StoredComponent};

/// A saved page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDocument {
    /// Document ID
    pub id: Uuid,
    /// Owner
    pub user_id: String,
    /// Page title
    pub title: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Component tree
    pub components: Schema,
    /// Whether the page is publicly reachable
    pub is_published: bool,
    /// Last publish time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Public URL of the last publish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_url: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    /// Page title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Initial components
    #[serde(default)]
    pub components: Schema,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement component tree
    #[serde(default)]
    pub components: Option<Schema>,
}

impl DocumentPatch {
    /// Patch that only replaces the components
    #[must_use]
    pub fn components(schema: Schema) -> Self {
        Self {
            components: Some(schema),
            ..Self::default()
        }
    }
}

/// Persistence contract for page documents. Every call is scoped to the
/// owning user; documents of other users behave as missing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document
    async fn create(&self, user_id: &str, document: NewDocument) -> Result<CanvasDocument>;

    /// Read one document
    async fn read(&self, id: Uuid, user_id: &str) -> Result<CanvasDocument>;

    /// Read a published document regardless of owner
    async fn read_published(&self, id: Uuid) -> Result<CanvasDocument>;

    /// All documents of a user, most recently updated first
    async fn list(&self, user_id: &str) -> Result<Vec<CanvasDocument>>;

    /// Apply a partial update
    async fn update(&self, id: Uuid, user_id: &str, patch: DocumentPatch)
        -> Result<CanvasDocument>;

    /// Delete a document
    async fn delete(&self, id: Uuid, user_id: &str) -> Result<()>;

    /// Publish or unpublish
    async fn set_published(&self, id: Uuid, user_id: &str, published: bool)
        -> Result<CanvasDocument>;
}

/// SQLite-backed document store
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    publish_base_url: String,
}

impl SqliteDocumentStore {
    /// Create a store over `pool`
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            publish_base_url: "http://localhost:8080".to_string(),
        }
    }

    /// Base URL used to build `publish_url`
    #[must_use]
    pub fn with_publish_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.publish_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Initialize the database schema
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS canvas_documents (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                components_json TEXT NOT NULL DEFAULT '[]',
                is_published INTEGER NOT NULL DEFAULT 0,
                published_at TEXT,
                publish_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_user_id ON canvas_documents(user_id);
            CREATE INDEX IF NOT EXISTS idx_documents_updated_at ON canvas_documents(updated_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, doc: &CanvasDocument) -> Result<()> {
        let components_json = serde_json::to_string(&doc.components.to_stored())?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO canvas_documents
            (id, user_id, title, description, components_json, is_published,
             published_at, publish_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(doc.id.to_string())
        .bind(&doc.user_id)
        .bind(&doc.title)
        .bind(&doc.description)
        .bind(&components_json)
        .bind(doc.is_published)
        .bind(doc.published_at.map(format_time))
        .bind(&doc.publish_url)
        .bind(format_time(doc.created_at))
        .bind(format_time(doc.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch(&self, id: Uuid, user_id: Option<&str>) -> Result<CanvasDocument> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, description, components_json, is_published,
                   published_at, publish_url, created_at, updated_at
            FROM canvas_documents
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let doc = match row {
            Some(row) => document_from_row(&row)?,
            None => return Err(Error::DocumentNotFound(id)),
        };
        match user_id {
            Some(owner) if doc.user_id != owner => Err(Error::DocumentNotFound(id)),
            _ => Ok(doc),
        }
    }
}

// Fixed width so `ORDER BY updated_at` sorts chronologically
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("invalid timestamp {value:?}: {e}")))
}

fn document_from_row(row: &SqliteRow) -> Result<CanvasDocument> {
    let id: String = row.get("id");
    let components_json: String = row.get("components_json");
    let published_at: Option<String> = row.get("published_at");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    let stored: Vec<StoredComponent> = serde_json::from_str(&components_json)?;

    Ok(CanvasDocument {
        id: Uuid::parse_str(&id).map_err(|e| Error::database(e.to_string()))?,
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        components: Schema::from_stored(stored),
        is_published: row.get("is_published"),
        published_at: published_at.as_deref().map(parse_time).transpose()?,
        publish_url: row.get("publish_url"),
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, user_id: &str, document: NewDocument) -> Result<CanvasDocument> {
        let now = Utc::now();
        let doc = CanvasDocument {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: document.title,
            description: document.description,
            components: document.components,
            is_published: false,
            published_at: None,
            publish_url: None,
            created_at: now,
            updated_at: now,
        };
        self.save(&doc).await?;
        info!(document_id = %doc.id, user_id = %user_id, "Document created");
        Ok(doc)
    }

    async fn read(&self, id: Uuid, user_id: &str) -> Result<CanvasDocument> {
        self.fetch(id, Some(user_id)).await
    }

    async fn read_published(&self, id: Uuid) -> Result<CanvasDocument> {
        let doc = self.fetch(id, None).await?;
        if !doc.is_published {
            return Err(Error::DocumentNotFound(id));
        }
        Ok(doc)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<CanvasDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, description, components_json, is_published,
                   published_at, publish_url, created_at, updated_at
            FROM canvas_documents
            WHERE user_id = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document_from_row).collect()
    }

    async fn update(
        &self,
        id: Uuid,
        user_id: &str,
        patch: DocumentPatch,
    ) -> Result<CanvasDocument> {
        let mut doc = self.fetch(id, Some(user_id)).await?;
        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(description) = patch.description {
            doc.description = Some(description);
        }
        if let Some(components) = patch.components {
            doc.components = components;
        }
        doc.updated_at = Utc::now();
        self.save(&doc).await?;
        debug!(document_id = %id, components = doc.components.len(), "Document updated");
        Ok(doc)
    }

    async fn delete(&self, id: Uuid, user_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM canvas_documents WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id.to_string())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::DocumentNotFound(id));
        }
        info!(document_id = %id, "Document deleted");
        Ok(())
    }

    async fn set_published(
        &self,
        id: Uuid,
        user_id: &str,
        published: bool,
    ) -> Result<CanvasDocument> {
        let mut doc = self.fetch(id, Some(user_id)).await?;
        let now = Utc::now();
        doc.is_published = published;
        if published {
            doc.published_at = Some(now);
            doc.publish_url = Some(format!("{}/p/{}", self.publish_base_url, id));
        }
        doc.updated_at = now;
        self.save(&doc).await?;
        info!(document_id = %id, published, "Publish state changed");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ComponentInstance;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqliteDocumentStore {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let store = SqliteDocumentStore::new(pool).with_publish_base_url("https://pages.test/");
        store.init().await.unwrap();
        store
    }

    fn new_doc(title: &str) -> NewDocument {
        NewDocument {
            title: title.into(),
            description: None,
            components: Schema::from_instances([
                ComponentInstance::new("a", "hero"),
                ComponentInstance::new("b", "cta"),
            ]),
        }
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Landing")).await.unwrap();

        let loaded = store.read(created.id, "user1").await.unwrap();
        assert_eq!(loaded.title, "Landing");
        assert_eq!(loaded.components.ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(!loaded.is_published);
    }

    #[tokio::test]
    async fn test_read_scoped_to_owner() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Private")).await.unwrap();

        let err = store.read(created.id, "user2").await.unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
        assert!(store.delete(created.id, "user2").await.is_err());
    }

    #[tokio::test]
    async fn test_update_components_keeps_order() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Page")).await.unwrap();

        let reordered = Schema::from_instances([
            ComponentInstance::new("b", "cta"),
            ComponentInstance::new("a", "hero"),
        ]);
        let updated = store
            .update(created.id, "user1", DocumentPatch::components(reordered))
            .await
            .unwrap();
        assert_eq!(updated.title, "Page");

        let loaded = store.read(created.id, "user1").await.unwrap();
        assert_eq!(loaded.components.ids(), vec!["b".to_string(), "a".to_string()]);
        assert!(loaded.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_list_user_documents() {
        let store = setup_test_db().await;
        store.create("user1", new_doc("One")).await.unwrap();
        store.create("user1", new_doc("Two")).await.unwrap();
        store.create("user2", new_doc("Other")).await.unwrap();

        assert_eq!(store.list("user1").await.unwrap().len(), 2);
        assert_eq!(store.list("user2").await.unwrap().len(), 1);
        assert!(store.list("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_most_recently_updated_first() {
        let store = setup_test_db().await;
        let first = store.create("user1", new_doc("First")).await.unwrap();
        store.create("user1", new_doc("Second")).await.unwrap();
        store
            .update(
                first.id,
                "user1",
                DocumentPatch {
                    title: Some("First, edited".into()),
                    ..DocumentPatch::default()
                },
            )
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list("user1")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["First, edited".to_string(), "Second".to_string()]);
    }

    #[tokio::test]
    async fn test_patch_body_with_duplicate_ids_matches_stored() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Page")).await.unwrap();

        let patch: DocumentPatch = serde_json::from_str(
            r#"{"components":[{"id":"a","type":"hero"},{"id":"b","type":"cta"},{"id":"a","type":"cta"}]}"#,
        )
        .unwrap();
        let updated = store.update(created.id, "user1", patch).await.unwrap();
        let loaded = store.read(created.id, "user1").await.unwrap();

        assert_eq!(updated.components.ids(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(updated.components, loaded.components);
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_is_an_error() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Page")).await.unwrap();

        sqlx::query("UPDATE canvas_documents SET updated_at = 'yesterday' WHERE id = ?")
            .bind(created.id.to_string())
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.read(created.id, "user1").await.unwrap_err();
        assert_eq!(err.code(), "database_error");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Gone")).await.unwrap();
        tokio_test::assert_ok!(store.delete(created.id, "user1").await);
        tokio_test::assert_err!(store.read(created.id, "user1").await);
        tokio_test::assert_err!(store.delete(created.id, "user1").await);
    }

    #[tokio::test]
    async fn test_publish_and_unpublish() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Launch")).await.unwrap();
        assert!(store.read_published(created.id).await.is_err());

        let published = store.set_published(created.id, "user1", true).await.unwrap();
        assert!(published.is_published);
        assert!(published.published_at.is_some());
        assert_eq!(
            published.publish_url.as_deref(),
            Some(format!("https://pages.test/p/{}", created.id).as_str())
        );
        assert!(store.read_published(created.id).await.is_ok());

        let unpublished = store.set_published(created.id, "user1", false).await.unwrap();
        assert!(!unpublished.is_published);
        assert!(unpublished.publish_url.is_some());
        assert!(store.read_published(created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_stored_components_carry_order() {
        let store = setup_test_db().await;
        let created = store.create("user1", new_doc("Page")).await.unwrap();

        let row = sqlx::query("SELECT components_json FROM canvas_documents WHERE id = ?")
            .bind(created.id.to_string())
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let json: String = row.get("components_json");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[1]["order"], 1);
        assert_eq!(value[1]["id"], "b");
    }
}
