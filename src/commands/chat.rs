use crate::backend;
use crate::llm::gemini::{self, GeminiConfig};
use crate::llm::{ChatMessage, LlmError};
use crate::store::models::{ChatSession, Document, Message};
use crate::store::Store;
use tauri::{AppHandle, Emitter, State};
use tracing::{error, warn};

/// Hard cap on the fallback context; this is full-text stuffing, not
/// retrieval, so the outbound request must be bounded somewhere.
pub(crate) const MAX_CONTEXT_CHARS: usize = 400_000;
/// Only the most recent turns go back out, to limit token usage.
pub(crate) const HISTORY_WINDOW: usize = 4;

fn build_context(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| format!("--- DOCUMENT: {} ---\n{}", d.name, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

fn history_window(messages: &[Message]) -> Vec<ChatMessage> {
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    messages[start..]
        .iter()
        .map(|m| ChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        })
        .collect()
}

/// Answer from locally held documents: every document in the session's scope
/// is concatenated as a labeled block and handed to the generator verbatim.
/// Sources are simply the names of all in-scope documents.
async fn direct_answer(store: &Store, question: &str) -> Result<(String, Vec<String>), LlmError> {
    let config = GeminiConfig::from_env()?;
    let docs = store.session_documents();
    let context = truncate_chars(build_context(&docs), MAX_CONTEXT_CHARS);
    let history = history_window(&store.messages());
    let answer = gemini::generate(&config, question, &context, &history).await?;
    Ok((answer, docs.into_iter().map(|d| d.name).collect()))
}

/// The query-resolution protocol. The user message is appended before any
/// network call; the backend attempt falls back to direct generation on any
/// failure; a fallback failure stays inside the conversation as an error
/// notice. Exactly one assistant message is appended per user message.
pub(crate) async fn run_query(
    store: &Store,
    text: &str,
    on_message: impl Fn(&Message),
) -> Option<Message> {
    if text.trim().is_empty() {
        return None;
    }
    let user_msg = store.push_message("user", text, Vec::new());
    on_message(&user_msg);

    let settings = store.settings();
    let session_id = store.session_id();
    let (answer, sources) = match backend::query(&settings.backend_url, text, &session_id).await {
        Ok(resp) => (resp.answer, resp.sources),
        Err(err) => {
            warn!("backend query failed, falling back to direct generation: {err}");
            match direct_answer(store, text).await {
                Ok(result) => result,
                Err(err) => {
                    error!("direct generation failed: {err}");
                    (format!("### ⚠️ System Error\n\n{err}"), Vec::new())
                }
            }
        }
    };

    let assistant_msg = store.push_message("assistant", &answer, sources);
    on_message(&assistant_msg);
    Some(assistant_msg)
}

#[tauri::command]
pub async fn send_message(
    app: AppHandle,
    store: State<'_, Store>,
    text: String,
) -> Result<Option<Message>, String> {
    let assistant = run_query(&store, &text, |msg| {
        let _ = app.emit("chat-message", msg);
    })
    .await;
    Ok(assistant)
}

#[tauri::command]
pub fn get_session(store: State<'_, Store>) -> Result<ChatSession, String> {
    Ok(store.session())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::DocStatus;
    use crate::store::now_millis;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::Mutex;

    fn doc(name: &str, content: &str) -> Document {
        Document {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            media_type: "text/plain".to_string(),
            size: content.len() as u64,
            content: content.to_string(),
            upload_date: now_millis(),
            status: DocStatus::Indexed,
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    // Tests that touch the process environment must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    async fn dead_backend() -> String {
        // Bind then drop, so the port is allocated but nothing listens.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn point_store_at(store: &Store, base_url: String) {
        let mut settings = store.settings();
        settings.backend_url = base_url;
        store.update_settings(settings);
    }

    #[test]
    fn context_blocks_are_labeled_with_document_names() {
        let docs = vec![doc("a.txt", "alpha"), doc("b.txt", "beta")];
        let context = build_context(&docs);
        assert_eq!(
            context,
            "--- DOCUMENT: a.txt ---\nalpha\n\n--- DOCUMENT: b.txt ---\nbeta"
        );
    }

    #[test]
    fn context_never_exceeds_the_hard_cap() {
        let docs = vec![doc("big.txt", &"x".repeat(MAX_CONTEXT_CHARS + 50_000))];
        let context = truncate_chars(build_context(&docs), MAX_CONTEXT_CHARS);
        assert_eq!(context.chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(10);
        assert_eq!(truncate_chars(text, 4), "éééé");
    }

    #[test]
    fn history_is_capped_at_four_messages() {
        let store = Store::new();
        for i in 0..6 {
            store.push_message("user", &format!("m{i}"), Vec::new());
        }
        let history = history_window(&store.messages());
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history[0].content, "m2");
        assert_eq!(history[3].content, "m5");
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let store = Store::new();
        let result = run_query(&store, "   ", |_| {}).await;
        assert!(result.is_none());
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn backend_answer_is_used_verbatim() {
        let app = Router::new().route(
            "/query",
            post(|| async {
                Json(json!({"answer": "Grid losses are 4%.", "sources": ["grid.pdf"]}))
            }),
        );
        let store = Store::new();
        point_store_at(&store, serve(app).await);

        let assistant = run_query(&store, "What are the grid losses?", |_| {})
            .await
            .unwrap();
        assert_eq!(assistant.content, "Grid losses are 4%.");
        assert_eq!(assistant.sources, vec!["grid.pdf"]);

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }

    #[tokio::test]
    async fn backend_failure_still_appends_exactly_one_assistant_reply() {
        // Unreachable backend and no generator credential: the fallback's
        // own failure must surface as an in-conversation error notice.
        let _env = ENV_LOCK.lock().unwrap();
        std::env::remove_var("GEMINI_API_KEY");
        let store = Store::new();
        point_store_at(&store, dead_backend().await);
        store.add_document(doc("report.pdf", "LCOE is 38 USD/MWh"));

        let assistant = run_query(&store, "What is the LCOE mentioned?", |_| {})
            .await
            .unwrap();
        assert!(assistant.content.contains("System Error"));
        assert!(assistant.content.contains("API key is missing"));

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages.iter().filter(|m| m.role == "assistant").count(),
            1
        );
    }

    #[tokio::test]
    async fn zero_documents_still_produces_exactly_one_reply() {
        let _env = ENV_LOCK.lock().unwrap();
        std::env::remove_var("GEMINI_API_KEY");
        let store = Store::new();
        point_store_at(&store, dead_backend().await);

        let assistant = run_query(&store, "anything", |_| {}).await.unwrap();
        assert_eq!(assistant.role, "assistant");
        assert_eq!(store.messages().len(), 2);
    }

    #[tokio::test]
    async fn user_message_is_visible_before_resolution() {
        let _env = ENV_LOCK.lock().unwrap();
        let seen = Mutex::new(Vec::new());
        let store = Store::new();
        point_store_at(&store, dead_backend().await);
        std::env::remove_var("GEMINI_API_KEY");

        run_query(&store, "q", |msg| {
            seen.lock().unwrap().push(msg.role.clone());
        })
        .await;
        assert_eq!(*seen.lock().unwrap(), vec!["user", "assistant"]);
    }

    #[tokio::test]
    async fn offline_upload_then_query_answers_from_local_documents() {
        let _env = ENV_LOCK.lock().unwrap();
        // A stand-in generator endpoint, reached via the env override.
        let generator = Router::new().route(
            "/models/*call",
            post(|| async {
                Json(json!({
                    "candidates": [
                        {"content": {"parts": [{"text": "The LCOE mentioned is 38 USD/MWh."}]}}
                    ]
                }))
            }),
        );
        std::env::set_var("GEMINI_API_KEY", "test-key");
        std::env::set_var("GEMINI_BASE_URL", serve(generator).await);

        let store = Store::new();
        point_store_at(&store, dead_backend().await);
        store.add_document(doc("report.pdf", "LCOE is 38 USD/MWh"));

        let assistant = run_query(&store, "What is the LCOE mentioned?", |_| {})
            .await
            .unwrap();
        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("GEMINI_BASE_URL");

        assert_eq!(assistant.content, "The LCOE mentioned is 38 USD/MWh.");
        assert_eq!(assistant.sources, vec!["report.pdf"]);
        assert_eq!(store.messages().len(), 2);
    }
}
