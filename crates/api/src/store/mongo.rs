//! MongoDB-backed [`Store`] and its startup connector.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::ClientOptions, Client, Collection, Database};
use tracing::info;

use super::{
    ChatMessage, ConnectionError, Session, Store, StoreConnector, StoreError, User,
};

/// Database used when the connection string does not name one.
const DEFAULT_DATABASE: &str = "interview_platform";
const APP_NAME: &str = "interview-api";

/// Opens a MongoDB client and verifies it with a `ping` before returning.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    timeout: Duration,
}

impl MongoConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl MongoConnector {
    async fn open(&self, store_url: &str) -> Result<MongoStore, ConnectionError> {
        // `mongodb+srv://` URLs resolve DNS records here.
        let mut options = ClientOptions::parse(store_url)
            .await
            .map_err(ConnectionError::InvalidUrl)?;
        options.server_selection_timeout = Some(self.timeout);
        options.connect_timeout = Some(self.timeout);
        options.app_name.get_or_insert_with(|| APP_NAME.into());

        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.into());
        let host = options
            .hosts
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::Unreachable(e.into()))?;
        let store = MongoStore::new(client.database(&database));

        // The driver connects lazily; force a round trip so failure surfaces here.
        store.ping().await.map_err(ConnectionError::Unreachable)?;

        info!(host = %host, database = %database, "connected to store");
        Ok(store)
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(&self, store_url: &str) -> Result<Arc<dyn Store>, ConnectionError> {
        let store = tokio::time::timeout(self.timeout, self.open(store_url))
            .await
            .map_err(|_| ConnectionError::Timeout(self.timeout))??;
        Ok(Arc::new(store))
    }
}

/// Collection handles over one shared driver pool.
///
/// `mongodb::Client` leases pooled connections internally, so the store is
/// shared across request tasks without application-level locking.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
    users: Collection<User>,
    sessions: Collection<Session>,
    messages: Collection<ChatMessage>,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self {
            users: db.collection("users"),
            sessions: db.collection("sessions"),
            messages: db.collection("messages"),
            db,
        }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn upsert_user(&self, user: User) -> Result<(), StoreError> {
        self.users
            .replace_one(doc! { "clerk_id": &user.clerk_id }, &user)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<bool, StoreError> {
        let res = self.users.delete_one(doc! { "clerk_id": clerk_id }).await?;
        Ok(res.deleted_count > 0)
    }

    async fn find_user(&self, clerk_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "clerk_id": clerk_id }).await?)
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.sessions.insert_one(&session).await?;
        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.find_one(doc! { "_id": id }).await?)
    }

    async fn active_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let cursor = self
            .sessions
            .find(doc! { "status": "active" })
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn complete_session(&self, id: &str) -> Result<bool, StoreError> {
        let res = self
            .sessions
            .update_one(
                doc! { "_id": id, "status": "active" },
                doc! { "$set": { "status": "completed" } },
            )
            .await?;
        Ok(res.matched_count > 0)
    }

    async fn insert_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        self.messages.insert_one(&message).await?;
        Ok(())
    }
}
