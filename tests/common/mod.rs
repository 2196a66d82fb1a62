//! Common test utilities for E2E tests
//!
//! [`FakeBackend`] keeps documents, accounts and files in memory and
//! expands relationships the way the platform does at default depth.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reactgram::backend::{Backend, CURRENT_SESSION, Query};
use reactgram::config::{self, MediaConfig};
use reactgram::data::{
    Account, DocumentList, MediaFile, NewUser, QueryKey, Session, SignInCredentials, StoredFile,
};
use reactgram::error::AppError;
use reactgram::{ClientState, data::QueryClient};
use serde_json::{Map, Value, json};
use tempfile::TempDir;
use tokio::sync::broadcast;
use url::Url;

pub const USERS: &str = "users";
pub const POSTS: &str = "posts";
pub const SAVES: &str = "saves";
pub const BUCKET: &str = "media";

#[derive(Debug, Clone)]
struct FakeAccount {
    id: String,
    name: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct Store {
    collections: HashMap<String, Vec<Map<String, Value>>>,
    accounts: Vec<FakeAccount>,
    /// Account id of the active session
    session: Option<String>,
    files: HashMap<String, StoredFile>,
    clock: i64,
}

impl Store {
    /// Strictly increasing timestamps so ordering is deterministic
    fn tick(&mut self) -> String {
        self.clock += 1;
        let base: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        (base + chrono::Duration::seconds(self.clock))
            .format("%Y-%m-%dT%H:%M:%S%.3f+00:00")
            .to_string()
    }

    fn raw(&self, collection: &str, id: &str) -> Option<&Map<String, Value>> {
        self.collections
            .get(collection)?
            .iter()
            .find(|doc| doc["$id"] == id)
    }

    fn expand(&self, collection: &str, doc: &Map<String, Value>) -> Value {
        let mut out = doc.clone();
        match collection {
            POSTS => {
                if let Some(Value::String(creator)) = doc.get("creator") {
                    out.insert(
                        "creator".to_string(),
                        self.raw(USERS, creator)
                            .map(|user| Value::Object(user.clone()))
                            .unwrap_or(Value::Null),
                    );
                }
            }
            SAVES => {
                if let Some(Value::String(post)) = doc.get("post") {
                    out.insert(
                        "post".to_string(),
                        self.raw(POSTS, post)
                            .map(|post| Value::Object(post.clone()))
                            .unwrap_or(Value::Null),
                    );
                }
            }
            USERS => {
                let id = &doc["$id"];
                let saves: Vec<Value> = self
                    .collections
                    .get(SAVES)
                    .into_iter()
                    .flatten()
                    .filter(|save| save.get("user") == Some(id))
                    .map(|save| Value::Object(save.clone()))
                    .collect();
                let liked: Vec<Value> = self
                    .collections
                    .get(POSTS)
                    .into_iter()
                    .flatten()
                    .filter(|post| {
                        post.get("likes")
                            .and_then(Value::as_array)
                            .is_some_and(|likes| likes.contains(id))
                    })
                    .map(|post| post["$id"].clone())
                    .collect();
                out.insert("save".to_string(), Value::Array(saves));
                out.insert("liked".to_string(), Value::Array(liked));
            }
            _ => {}
        }
        Value::Object(out)
    }
}

/// In-memory platform
#[derive(Default)]
pub struct FakeBackend {
    store: Mutex<Store>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
    latency: Mutex<Option<Duration>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later call to `operation` fail
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    /// Delay every call, so concurrent reads overlap
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    pub fn documents(&self, collection: &str) -> Vec<Value> {
        let store = self.store.lock().unwrap();
        store
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .map(|doc| Value::Object(doc.clone()))
            .collect()
    }

    pub fn file_ids(&self) -> Vec<String> {
        self.store.lock().unwrap().files.keys().cloned().collect()
    }

    pub fn has_session(&self) -> bool {
        self.store.lock().unwrap().session.is_some()
    }

    /// Insert a document directly, bypassing the client
    pub fn seed(&self, collection: &str, id: &str, data: Value) {
        let mut store = self.store.lock().unwrap();
        let now = store.tick();
        let mut doc = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        doc.insert("$id".to_string(), json!(id));
        doc.insert("$createdAt".to_string(), json!(now));
        doc.insert("$updatedAt".to_string(), json!(now));
        store
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    async fn enter(&self, operation: &'static str) -> Result<(), AppError> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.lock().unwrap().contains(operation) {
            return Err(AppError::Backend {
                status: 500,
                message: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }
}

fn matches(doc: &Map<String, Value>, query: &Query) -> bool {
    match query {
        Query::Equal(attribute, Value::Array(values)) => {
            doc.get(attribute).is_some_and(|v| values.contains(v))
        }
        Query::Equal(attribute, value) => doc.get(attribute) == Some(value),
        Query::Search(attribute, term) => doc
            .get(attribute)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&term.to_lowercase())),
        _ => true,
    }
}

fn sort_key(doc: &Map<String, Value>, attribute: &str) -> String {
    match doc.get(attribute) {
        Some(Value::String(value)) => value.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, AppError> {
        self.enter("create_document").await?;
        if self.store.lock().unwrap().raw(collection_id, document_id).is_some() {
            return Err(AppError::Conflict(format!("document {} exists", document_id)));
        }
        self.seed(collection_id, document_id, data);

        let store = self.store.lock().unwrap();
        let doc = store.raw(collection_id, document_id).ok_or(AppError::NotFound)?;
        Ok(store.expand(collection_id, doc))
    }

    async fn get_document(&self, collection_id: &str, document_id: &str) -> Result<Value, AppError> {
        self.enter("get_document").await?;
        let store = self.store.lock().unwrap();
        let doc = store.raw(collection_id, document_id).ok_or(AppError::NotFound)?;
        Ok(store.expand(collection_id, doc))
    }

    async fn update_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, AppError> {
        self.enter("update_document").await?;
        let mut store = self.store.lock().unwrap();
        let now = store.tick();
        let doc = store
            .collections
            .get_mut(collection_id)
            .and_then(|docs| docs.iter_mut().find(|doc| doc["$id"] == document_id))
            .ok_or(AppError::NotFound)?;
        if let Value::Object(changes) = data {
            doc.extend(changes);
        }
        doc.insert("$updatedAt".to_string(), json!(now));
        let doc = doc.clone();
        Ok(store.expand(collection_id, &doc))
    }

    async fn delete_document(&self, collection_id: &str, document_id: &str) -> Result<(), AppError> {
        self.enter("delete_document").await?;
        let mut store = self.store.lock().unwrap();
        let docs = store
            .collections
            .get_mut(collection_id)
            .ok_or(AppError::NotFound)?;
        let before = docs.len();
        docs.retain(|doc| doc["$id"] != document_id);
        if docs.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList<Value>, AppError> {
        self.enter("list_documents").await?;
        let store = self.store.lock().unwrap();
        let mut docs: Vec<&Map<String, Value>> = store
            .collections
            .get(collection_id)
            .into_iter()
            .flatten()
            .filter(|doc| queries.iter().all(|query| matches(doc, query)))
            .collect();

        for query in queries {
            match query {
                Query::OrderAsc(attribute) => {
                    docs.sort_by_key(|doc| sort_key(doc, attribute));
                }
                Query::OrderDesc(attribute) => {
                    docs.sort_by_key(|doc| std::cmp::Reverse(sort_key(doc, attribute)));
                }
                _ => {}
            }
        }
        let total = docs.len() as u64;

        for query in queries {
            if let Query::CursorAfter(cursor) = query {
                let position = docs
                    .iter()
                    .position(|doc| doc["$id"] == cursor.as_str())
                    .ok_or_else(|| AppError::Backend {
                        status: 400,
                        message: format!("cursor {} not found", cursor),
                    })?;
                docs.drain(..=position);
            }
        }
        for query in queries {
            if let Query::Limit(limit) = query {
                docs.truncate(*limit);
            }
        }

        Ok(DocumentList {
            total,
            documents: docs
                .into_iter()
                .map(|doc| store.expand(collection_id, doc))
                .collect(),
        })
    }

    async fn create_account(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, AppError> {
        self.enter("create_account").await?;
        let mut store = self.store.lock().unwrap();
        if store.accounts.iter().any(|account| account.email == email) {
            return Err(AppError::Conflict(format!("account {} exists", email)));
        }
        store.accounts.push(FakeAccount {
            id: account_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        Ok(Account {
            id: account_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        self.enter("create_email_password_session").await?;
        let mut store = self.store.lock().unwrap();
        let account_id = store
            .accounts
            .iter()
            .find(|account| account.email == email && account.password == password)
            .map(|account| account.id.clone())
            .ok_or(AppError::Unauthorized)?;
        store.session = Some(account_id.clone());
        Ok(Session {
            id: format!("session-{}", account_id),
            user_id: account_id,
            expire: None,
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.enter("delete_session").await?;
        assert_eq!(session_id, CURRENT_SESSION);
        let mut store = self.store.lock().unwrap();
        store.session.take().map(|_| ()).ok_or(AppError::Unauthorized)
    }

    async fn get_account(&self) -> Result<Account, AppError> {
        self.enter("get_account").await?;
        let store = self.store.lock().unwrap();
        let account_id = store.session.as_ref().ok_or(AppError::Unauthorized)?;
        store
            .accounts
            .iter()
            .find(|account| &account.id == account_id)
            .map(|account| Account {
                id: account.id.clone(),
                name: account.name.clone(),
                email: account.email.clone(),
            })
            .ok_or(AppError::Unauthorized)
    }

    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: MediaFile,
    ) -> Result<StoredFile, AppError> {
        self.enter("create_file").await?;
        assert_eq!(bucket_id, BUCKET);
        let stored = StoredFile {
            id: file_id.to_string(),
            name: file.name,
            size: file.bytes.len() as u64,
        };
        self.store
            .lock()
            .unwrap()
            .files
            .insert(file_id.to_string(), stored.clone());
        Ok(stored)
    }

    fn file_preview_url(
        &self,
        bucket_id: &str,
        file_id: &str,
        preview: &MediaConfig,
    ) -> Result<Url, AppError> {
        Url::parse(&format!(
            "https://fake.test/v1/storage/buckets/{}/files/{}/preview?width={}&height={}",
            bucket_id, file_id, preview.preview_width, preview.preview_height
        ))
        .map_err(|e| AppError::Internal(e.into()))
    }

    async fn delete_file(&self, _bucket_id: &str, file_id: &str) -> Result<(), AppError> {
        self.enter("delete_file").await?;
        self.store
            .lock()
            .unwrap()
            .files
            .remove(file_id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }

    fn initials_avatar_url(&self, name: &str) -> Result<Url, AppError> {
        let mut url = Url::parse("https://fake.test/v1/avatars/initials")
            .map_err(|e| AppError::Internal(e.into()))?;
        url.query_pairs_mut().append_pair("name", name);
        Ok(url)
    }
}

/// Client wired to a [`FakeBackend`]
pub struct TestClient {
    pub state: ClientState,
    pub backend: Arc<FakeBackend>,
    pub _temp_dir: TempDir,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_stale_time(Duration::ZERO)
    }

    pub fn with_stale_time(stale_time: Duration) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let backend = FakeBackend::new();
        let config = test_config(&temp_dir, stale_time);
        let state = ClientState::with_backend(config, backend.clone());

        Self {
            state,
            backend,
            _temp_dir: temp_dir,
        }
    }

    pub fn client(&self) -> &QueryClient {
        self.state.queries.client()
    }

    /// Register an account and sign it in, returning the user document id
    pub async fn signed_up(&self, user: NewUser) -> String {
        self.state.sign_up(user).await.unwrap();
        self.state.session.user().unwrap().id.clone()
    }
}

pub fn test_config(temp_dir: &TempDir, stale_time: Duration) -> config::AppConfig {
    config::AppConfig {
        backend: config::BackendConfig {
            endpoint: "https://fake.test/v1".to_string(),
            project_id: "project".to_string(),
            database_id: "db".to_string(),
            user_collection_id: USERS.to_string(),
            post_collection_id: POSTS.to_string(),
            saves_collection_id: SAVES.to_string(),
            storage_id: BUCKET.to_string(),
            request_timeout_secs: 30,
        },
        cache: config::CacheConfig {
            stale_time_ms: stale_time.as_millis() as u64,
            recent_posts_limit: 20,
            page_size: 2,
            users_limit: 10,
            search_debounce_ms: 500,
        },
        media: MediaConfig::default(),
        session: config::SessionConfig {
            fallback_path: temp_dir.path().join("cookie-fallback"),
        },
        logging: config::LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn ann() -> NewUser {
    NewUser {
        name: "Ann".to_string(),
        username: "ann1".to_string(),
        email: "ann@x.com".to_string(),
        password: "password1".to_string(),
    }
}

pub fn bob() -> NewUser {
    NewUser {
        name: "Bob".to_string(),
        username: "bob2".to_string(),
        email: "bob@x.com".to_string(),
        password: "password2".to_string(),
    }
}

pub fn credentials(user: &NewUser) -> SignInCredentials {
    SignInCredentials {
        email: user.email.clone(),
        password: user.password.clone(),
    }
}

pub fn photo() -> MediaFile {
    MediaFile {
        name: "sky.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xff, 0xd8, 0xff, 0xe0],
    }
}

/// Wait until `key` is settled or invalidated after `events` was created
pub async fn changed(events: &mut broadcast::Receiver<QueryKey>, key: &QueryKey) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(changed) if &changed == key => return,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("cache closed"),
            }
        }
    })
    .await
    .expect("cache key never changed");
}
