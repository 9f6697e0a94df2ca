pub mod models;

use models::{ChatSession, Document, Message, Settings};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// All application state lives in memory for the lifetime of the process.
/// There is a single session; nothing is persisted across restarts.
pub struct Store {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    documents: Vec<Document>,
    session: ChatSession,
    settings: Settings,
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                documents: Vec::new(),
                session: ChatSession {
                    id: "default".to_string(),
                    title: "New Investigation".to_string(),
                    messages: Vec::new(),
                    document_ids: Vec::new(),
                },
                settings: Settings::default(),
            }),
        }
    }

    // ── Documents ──

    /// Append a document to the collection and bring it into the active
    /// session's scope.
    pub fn add_document(&self, doc: Document) {
        let mut inner = self.inner.lock().unwrap();
        inner.session.document_ids.push(doc.id.clone());
        inner.documents.push(doc);
    }

    /// Remove a document and cascade-prune its id from the session scope.
    pub fn remove_document(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.documents.retain(|d| d.id != id);
        inner.session.document_ids.retain(|d| d != id);
    }

    pub fn list_documents(&self) -> Vec<Document> {
        self.inner.lock().unwrap().documents.clone()
    }

    pub fn get_document(&self, id: &str) -> Option<Document> {
        let inner = self.inner.lock().unwrap();
        inner.documents.iter().find(|d| d.id == id).cloned()
    }

    /// Documents in the active session's scope, filtered against the live
    /// collection so a dangling id can never surface, in collection order.
    pub fn session_documents(&self) -> Vec<Document> {
        let inner = self.inner.lock().unwrap();
        inner
            .documents
            .iter()
            .filter(|d| inner.session.document_ids.contains(&d.id))
            .cloned()
            .collect()
    }

    // ── Session ──

    pub fn session(&self) -> ChatSession {
        self.inner.lock().unwrap().session.clone()
    }

    pub fn session_id(&self) -> String {
        self.inner.lock().unwrap().session.id.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().unwrap().session.messages.clone()
    }

    /// Append a message to the session. Messages are append-only.
    pub fn push_message(&self, role: &str, content: &str, sources: Vec<String>) -> Message {
        let msg = Message {
            id: uuid::Uuid::new_v4().to_string(),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: now_millis(),
            sources,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.session.messages.push(msg.clone());
        msg
    }

    // ── Settings ──

    pub fn settings(&self) -> Settings {
        self.inner.lock().unwrap().settings.clone()
    }

    /// Replace the settings. Returns true when the backend URL changed, so
    /// the caller can restart the health monitor.
    pub fn update_settings(&self, settings: Settings) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let url_changed = inner.settings.backend_url != settings.backend_url;
        inner.settings = settings;
        url_changed
    }
}
