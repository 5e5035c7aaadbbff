//! Background job functions and the registry the bus delivers into.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use super::{
    event::DispatchedEvent,
    manifest::{FunctionConfig, Manifest},
};
use crate::store::{Store, StoreError, User};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// The event payload cannot be processed; retrying will not help.
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JobError {
    /// Whether the bus should schedule another attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(self, JobError::Store(_))
    }
}

/// A background function executed when the bus delivers a matching event.
#[async_trait]
pub trait JobFunction: Send + Sync {
    /// Stable identifier, unique within the app.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    /// Event name that triggers this function.
    fn trigger(&self) -> &'static str;

    async fn run(&self, event: &DispatchedEvent, store: &dyn Store) -> Result<Value, JobError>;
}

/// Functions served by this process, bound to the shared store.
pub struct FunctionRegistry {
    app_id: String,
    store: Arc<dyn Store>,
    functions: Vec<Arc<dyn JobFunction>>,
}

impl FunctionRegistry {
    pub fn new(app_id: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self {
            app_id: app_id.into(),
            store,
            functions: Vec::new(),
        }
    }

    /// Registry with the platform's built-in user sync functions.
    pub fn with_default_functions(app_id: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self::new(app_id, store)
            .register(SyncUser)
            .register(DeleteUser)
    }

    pub fn register(mut self, function: impl JobFunction + 'static) -> Self {
        self.functions.push(Arc::new(function));
        self
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Bus-wide function id: `<app_id>-<function id>`.
    pub fn slug(&self, function: &dyn JobFunction) -> String {
        format!("{}-{}", self.app_id, function.id())
    }

    /// Functions whose trigger matches `event_name`.
    pub fn triggered_by<'a>(
        &'a self,
        event_name: &'a str,
    ) -> impl Iterator<Item = &'a Arc<dyn JobFunction>> + 'a {
        self.functions
            .iter()
            .filter(move |f| f.trigger() == event_name)
    }

    /// Run the function named `fn_id` (slug or bare id) against `event`.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::UnknownFunction`] for an unregistered id, otherwise
    /// whatever the function itself reports.
    pub async fn deliver(&self, fn_id: &str, event: &DispatchedEvent) -> Result<Value, JobError> {
        let function = self
            .functions
            .iter()
            .find(|f| f.id() == fn_id || self.slug(f.as_ref()) == fn_id)
            .ok_or_else(|| JobError::UnknownFunction(fn_id.to_owned()))?;

        info!(function = function.id(), event = %event.name, "running job function");
        function.run(event, self.store.as_ref()).await
    }

    /// Registration document describing every function and its invoke URL.
    pub fn manifest(&self, serve_url: &str) -> Manifest {
        let functions = self
            .functions
            .iter()
            .map(|f| {
                FunctionConfig::http(
                    self.slug(f.as_ref()),
                    f.name(),
                    f.trigger(),
                    serve_url,
                )
            })
            .collect();
        Manifest::new(&self.app_id, serve_url, functions)
    }
}

// ---------------------------------------------------------------------------
// Built-in functions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ClerkEmail {
    email_address: String,
}

/// Subset of the identity provider's user webhook payload.
#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    #[serde(default)]
    email_addresses: Vec<ClerkEmail>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<ClerkUser> for User {
    fn from(u: ClerkUser) -> Self {
        let name = [u.first_name, u.last_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        User {
            clerk_id: u.id,
            email: u
                .email_addresses
                .into_iter()
                .next()
                .map(|e| e.email_address)
                .unwrap_or_default(),
            name,
            profile_image: u.image_url.unwrap_or_default(),
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(event: &DispatchedEvent) -> Result<T, JobError> {
    serde_json::from_value(event.data.clone()).map_err(|e| JobError::InvalidPayload(e.to_string()))
}

/// Mirrors a newly created identity provider user into the store.
pub struct SyncUser;

#[async_trait]
impl JobFunction for SyncUser {
    fn id(&self) -> &'static str {
        "sync-user"
    }

    fn name(&self) -> &'static str {
        "Sync user"
    }

    fn trigger(&self) -> &'static str {
        "clerk/user.created"
    }

    async fn run(&self, event: &DispatchedEvent, store: &dyn Store) -> Result<Value, JobError> {
        let user: User = parse_payload::<ClerkUser>(event)?.into();
        let clerk_id = user.clerk_id.clone();
        store.upsert_user(user).await?;
        Ok(json!({ "synced": clerk_id }))
    }
}

#[derive(Debug, Deserialize)]
struct DeletedUser {
    id: String,
}

/// Removes a deleted identity provider user from the store.
pub struct DeleteUser;

#[async_trait]
impl JobFunction for DeleteUser {
    fn id(&self) -> &'static str {
        "delete-user-from-db"
    }

    fn name(&self) -> &'static str {
        "Delete user from DB"
    }

    fn trigger(&self) -> &'static str {
        "clerk/user.deleted"
    }

    async fn run(&self, event: &DispatchedEvent, store: &dyn Store) -> Result<Value, JobError> {
        let DeletedUser { id } = parse_payload(event)?;
        let deleted = store.delete_user(&id).await?;
        Ok(json!({ "deleted": deleted }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn registry(store: &InMemoryStore) -> FunctionRegistry {
        FunctionRegistry::with_default_functions("interview-platform", Arc::new(store.clone()))
    }

    fn user_created() -> DispatchedEvent {
        DispatchedEvent::new(
            "clerk/user.created",
            json!({
                "id": "user_2abc",
                "email_addresses": [{"email_address": "ada@example.com"}],
                "first_name": "Ada",
                "last_name": "Lovelace",
                "image_url": "https://img.example/ada.png"
            }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sync_user_upserts_document() {
        let store = InMemoryStore::new();
        let out = registry(&store)
            .deliver("sync-user", &user_created())
            .await
            .unwrap();
        assert_eq!(out["synced"], "user_2abc");
        let user = store.find_user("user_2abc").await.unwrap().unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn deliver_accepts_slug() {
        let store = InMemoryStore::new();
        let res = registry(&store)
            .deliver("interview-platform-sync-user", &user_created())
            .await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn delete_user_removes_document() {
        let store = InMemoryStore::new();
        let reg = registry(&store);
        reg.deliver("sync-user", &user_created()).await.unwrap();
        let event = DispatchedEvent::new("clerk/user.deleted", json!({"id": "user_2abc"})).unwrap();
        let out = reg.deliver("delete-user-from-db", &event).await.unwrap();
        assert_eq!(out["deleted"], true);
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_function_is_reported() {
        let store = InMemoryStore::new();
        let err = registry(&store)
            .deliver("nope", &user_created())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::UnknownFunction(_)));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn malformed_payload_is_not_retriable() {
        let store = InMemoryStore::new();
        let event = DispatchedEvent::new("clerk/user.created", json!({"no_id": true})).unwrap();
        let err = registry(&store).deliver("sync-user", &event).await.unwrap_err();
        assert!(matches!(err, JobError::InvalidPayload(_)));
        assert!(!err.is_retriable());
    }

    #[test]
    fn triggered_by_matches_event_name() {
        let store = InMemoryStore::new();
        let reg = registry(&store);
        let ids: Vec<_> = reg.triggered_by("clerk/user.deleted").map(|f| f.id()).collect();
        assert_eq!(ids, vec!["delete-user-from-db"]);
        assert_eq!(reg.triggered_by("chat/message.sent").count(), 0);
    }
}
