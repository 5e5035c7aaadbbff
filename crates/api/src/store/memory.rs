//! In-memory [`Store`] used by handler, webhook, and lifecycle tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    ChatMessage, ConnectionError, Session, SessionStatus, Store, StoreConnector, StoreError, User,
};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.inner.read().await.messages.clone()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_user(&self, user: User) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .users
            .insert(user.clerk_id.clone(), user);
        Ok(())
    }

    async fn delete_user(&self, clerk_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.users.remove(clerk_id).is_some())
    }

    async fn find_user(&self, clerk_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(clerk_id).cloned())
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.read().await.sessions.get(id).cloned())
    }

    async fn active_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let mut active: Vec<Session> = self
            .inner
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn complete_session(&self, id: &str) -> Result<bool, StoreError> {
        let mut lock = self.inner.write().await;
        match lock.sessions.get_mut(id) {
            Some(s) if s.status == SessionStatus::Active => {
                s.status = SessionStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        self.inner.write().await.messages.push(message);
        Ok(())
    }
}

/// Connector that always hands out the same in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    pub store: InMemoryStore,
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self, _store_url: &str) -> Result<Arc<dyn Store>, ConnectionError> {
        self.store.ping().await.map_err(ConnectionError::Unreachable)?;
        Ok(Arc::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Difficulty;

    #[tokio::test]
    async fn upsert_replaces_existing_user() {
        let store = InMemoryStore::new();
        let mut user = User {
            clerk_id: "user_1".into(),
            email: "a@example.com".into(),
            name: "A".into(),
            profile_image: String::new(),
        };
        store.upsert_user(user.clone()).await.unwrap();
        user.name = "B".into();
        store.upsert_user(user).await.unwrap();
        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.find_user("user_1").await.unwrap().unwrap().name, "B");
    }

    #[tokio::test]
    async fn complete_session_only_once() {
        let store = InMemoryStore::new();
        let s = Session::new("p".into(), Difficulty::Medium, "host".into());
        let id = s.id.clone();
        store.insert_session(s).await.unwrap();
        assert!(store.complete_session(&id).await.unwrap());
        assert!(!store.complete_session(&id).await.unwrap());
        assert!(store.active_sessions().await.unwrap().is_empty());
    }
}
